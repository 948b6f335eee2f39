use std::process::ExitCode;

use crate::commands::base_commands::Commands;
use crate::services::trace_plot::{TimeSpan, plot_results_from_json_file};

pub async fn plot_command(cmd: Commands) -> ExitCode {
    if let Commands::Plot {
        input,
        output,
        device,
        start,
        end,
    } = cmd
    {
        let span = TimeSpan::new(start, end);
        match plot_results_from_json_file(&input, &output, &device, span).await {
            Ok(()) => {
                println!("Trace plot written to {output}");
                return ExitCode::SUCCESS;
            }
            Err(e) => eprintln!("Failed to plot traces: {e}"),
        }
    }
    ExitCode::FAILURE
}
