use rayon::prelude::*;
use tracing::{error, info};

use crate::domain::damage::DamageReport;
use crate::domain::device::DeviceParameters;
use crate::domain::load_profile::LoadProfile;
use crate::domain::thermal_cycle::ThermalCycle;
use crate::domain::thermal_state::{SimulationTrace, ThermalState};
use crate::services::damage_accumulator::accumulate;
use crate::services::lifetime_error::LifetimeError;
use crate::services::rainflow::{RainflowOptions, extract};
use crate::services::thermal_simulation::{SimulationOptions, simulate};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub ambient_temperature: f64,
    pub initial_state: Option<ThermalState>,
    pub simulation: SimulationOptions,
    pub rainflow: RainflowOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            ambient_temperature: 50.0,
            initial_state: None,
            simulation: SimulationOptions::default(),
            rainflow: RainflowOptions::default(),
        }
    }
}

/// Everything one device run produced, from trajectory to lifetime.
#[derive(Debug, Clone)]
pub struct LifetimeRun {
    pub device_name: String,
    pub trace: SimulationTrace,
    pub cycles: Vec<ThermalCycle>,
    pub report: DamageReport,
}

/// Simulates `device` under `profile`, counts junction-temperature cycles
/// and accumulates their damage.
pub fn analyze(
    device: &DeviceParameters,
    profile: &LoadProfile,
    options: &PipelineOptions,
) -> Result<LifetimeRun, LifetimeError> {
    let trace = simulate(
        profile,
        device,
        options.ambient_temperature,
        options.initial_state.as_ref(),
        &options.simulation,
    )?;
    let cycles = extract(&trace.junction_temperatures(), &options.rainflow)?;
    let report = accumulate(&cycles, device, profile.duration())?;

    info!(
        device = %device.name,
        cycles = cycles.len(),
        damage_fraction = report.damage_fraction,
        years_to_failure = report.years_to_failure(),
        "lifetime analysis finished"
    );
    Ok(LifetimeRun {
        device_name: device.name.clone(),
        trace,
        cycles,
        report,
    })
}

/// Runs every device of the catalog against the same profile in parallel.
///
/// Results come back in catalog order. A failing device does not stop the
/// others.
pub fn analyze_catalog(
    devices: &[DeviceParameters],
    profile: &LoadProfile,
    options: &PipelineOptions,
) -> Vec<(String, Result<LifetimeRun, LifetimeError>)> {
    devices
        .par_iter()
        .map(|device| {
            let result = analyze(device, profile, options);
            if let Err(e) = &result {
                error!(device = %device.name, kind = e.kind(), "lifetime analysis failed: {e}");
            }
            (device.name.clone(), result)
        })
        .collect()
}
