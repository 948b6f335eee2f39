use std::process::ExitCode;

use crate::commands::base_commands::Commands;
use crate::commands::report_format::format_lifetime_report;
use crate::services::results_json::load_results_from_json_file;

pub async fn summary_command(cmd: Commands) -> ExitCode {
    if let Commands::Summary { input } = cmd {
        match load_results_from_json_file(&input).await {
            Ok(document) => {
                println!("{}", format_lifetime_report(&document));
                return ExitCode::SUCCESS;
            }
            Err(e) => eprintln!("Failed to load results: {e}"),
        }
    }
    ExitCode::FAILURE
}
