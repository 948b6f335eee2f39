use std::process::ExitCode;

use tracing::{info, warn};

use crate::commands::base_commands::Commands;
use crate::commands::report_format::format_lifetime_report;
use crate::services::device_yaml::{load_device_catalog_from_yaml_file, select_devices};
use crate::services::lifetime_pipeline::{PipelineOptions, analyze_catalog};
use crate::services::load_profile_yaml::load_profile_from_yaml_file;
use crate::services::rainflow::RainflowOptions;
use crate::services::results_json::{build_results_document, write_results_to_json_file};
use crate::services::thermal_simulation::{CancelFlag, SimulationOptions};
use crate::services::trace_plot::{TimeSpan, write_results_png};

pub async fn simulate_command(cmd: Commands) -> ExitCode {
    let Commands::Simulate {
        devices,
        profile,
        output,
        ambient,
        device,
        max_step,
        min_cycle_range,
        plot,
    } = cmd
    else {
        return ExitCode::FAILURE;
    };

    let catalog = match load_device_catalog_from_yaml_file(&devices)
        .and_then(|catalog| select_devices(catalog, &device))
    {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Failed to load device catalog: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mission = match load_profile_from_yaml_file(&profile) {
        Ok(mission) => mission,
        Err(e) => {
            eprintln!("Failed to load mission profile: {e}");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling running simulations");
            on_interrupt.cancel();
        }
    });

    let options = PipelineOptions {
        ambient_temperature: ambient,
        initial_state: None,
        simulation: SimulationOptions {
            max_step,
            cancel: Some(cancel),
            ..SimulationOptions::default()
        },
        rainflow: RainflowOptions {
            min_range: min_cycle_range,
        },
    };

    info!(
        devices = catalog.len(),
        mission = %mission.name,
        ambient,
        "running lifetime analysis"
    );
    let (mission, runs) = match tokio::task::spawn_blocking(move || {
        let runs = analyze_catalog(&catalog, &mission, &options);
        (mission, runs)
    })
    .await
    {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Lifetime analysis did not finish: {e}");
            return ExitCode::FAILURE;
        }
    };

    let document = build_results_document(&mission, ambient, &runs);
    if let Err(e) = write_results_to_json_file(&output, &document).await {
        eprintln!("Failed to write results: {e}");
        return ExitCode::FAILURE;
    }

    println!("{}", format_lifetime_report(&document));
    println!();
    println!("Results written to {output}");

    if plot {
        let plot_path = format!("{output}.png");
        match write_results_png(&document, &plot_path, &[], TimeSpan::default()).await {
            Ok(()) => println!("Trace plot written to {plot_path}"),
            Err(e) => eprintln!("Failed to plot traces: {e}"),
        }
    }
    ExitCode::SUCCESS
}
