mod commands;
mod domain;
mod services;
#[cfg(test)]
mod test_support;

use std::process::ExitCode;

use clap::{CommandFactory, Parser};

use crate::commands::base_commands::{CliArgs, Commands};
use crate::commands::plot_cmd::plot_command;
use crate::commands::simulate_cmd::simulate_command;
use crate::commands::summary_cmd::summary_command;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so reports and completion scripts stay clean on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    match args.command {
        cmd @ Commands::Simulate { .. } => simulate_command(cmd).await,
        cmd @ Commands::Plot { .. } => plot_command(cmd).await,
        cmd @ Commands::Summary { .. } => summary_command(cmd).await,
        Commands::Completions { shell } => {
            let mut command = CliArgs::command();
            let name = command.get_name().to_string();
            clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
            ExitCode::SUCCESS
        }
    }
}
