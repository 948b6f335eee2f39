use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::domain::device::DeviceParameters;
use crate::domain::load_profile::{LoadProfile, LoadSample, SwitchState};
use crate::domain::thermal_state::{
    SimulationTrace, TemperatureExcursion, ThermalState, TracePoint,
};
use crate::services::device_validation::validate_device;
use crate::services::integrator::{OdeSystem, Rk4};
use crate::services::lifetime_error::{InstabilityReport, LifetimeError, Stage};
use crate::services::power_loss_model::compute_losses;

const ABSOLUTE_ZERO: f64 = -273.15;
/// Margin below the coldest starting temperature that device coefficients
/// must still be valid for.
const VALIDATION_MARGIN: f64 = 50.0;
const LONG_RUN_SUBSTEPS: f64 = 1e7;

/// Cooperative cancellation shared between a caller and a running simulation.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct SimulationOptions {
    /// Upper bound on an integration sub-step (s).
    pub max_step: Option<f64>,
    /// Fraction of the smallest node time constant used as sub-step limit.
    pub stability_factor: f64,
    /// Junction temperatures above `divergence_factor * max_temperature`
    /// are treated as divergence.
    pub divergence_factor: f64,
    pub cancel: Option<CancelFlag>,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            max_step: None,
            stability_factor: 1.0,
            divergence_factor: 10.0,
            cancel: None,
        }
    }
}

enum StepError {
    Loss(LifetimeError),
    NonPhysical { reason: String, value: f64 },
}

impl From<LifetimeError> for StepError {
    fn from(error: LifetimeError) -> Self {
        StepError::Loss(error)
    }
}

/// Loss model and RC network composed into one derivative function, so
/// losses and thermal coefficients follow the state at every RK4 stage.
struct ThermalNetwork<'a> {
    device: &'a DeviceParameters,
    profile: &'a LoadProfile,
    ambient: f64,
    interval: usize,
}

impl OdeSystem for ThermalNetwork<'_> {
    type Error = StepError;

    fn derivatives(&self, t: f64, y: &[f64], dydt: &mut [f64]) -> Result<(), StepError> {
        if let Some(bad) = y.iter().find(|value| !value.is_finite()) {
            return Err(StepError::NonPhysical {
                reason: "non-finite stage temperature".to_string(),
                value: *bad,
            });
        }
        let on_resistance = self.device.on_resistance.at(y[0]);
        if !(on_resistance > 0.0) {
            return Err(StepError::NonPhysical {
                reason: "on-resistance is not positive at the junction temperature".to_string(),
                value: y[0],
            });
        }
        let point = self.profile.operating_point(self.interval, t);
        let losses = compute_losses(
            point.voltage,
            point.current,
            point.state,
            point.switching_frequency,
            y[0],
            self.device,
        )?;
        network_derivatives(self.device, losses.total(), self.ambient, y, dydt)
    }
}

fn network_derivatives(
    device: &DeviceParameters,
    power: f64,
    ambient: f64,
    y: &[f64],
    dydt: &mut [f64],
) -> Result<(), StepError> {
    let last = y.len() - 1;
    let mut inflow = power;
    for (i, stage) in device.thermal_stages.iter().enumerate() {
        let resistance = stage.resistance_at(y[i]);
        let capacitance = stage.capacitance_at(y[i]);
        if !(resistance > 0.0 && capacitance > 0.0) {
            return Err(StepError::NonPhysical {
                reason: format!("stage {i} thermal resistance or capacitance is not positive"),
                value: y[i],
            });
        }
        let downstream = if i == last { ambient } else { y[i + 1] };
        let passed_on = (y[i] - downstream) / resistance;
        let mut outflow = passed_on;
        if i == last {
            outflow += device.cooling_conductance() * (y[i] - ambient);
        }
        dydt[i] = (inflow - outflow) / capacitance;
        inflow = passed_on;
    }
    Ok(())
}

/// Largest sub-step the explicit scheme may take from state `y`: the
/// smallest `C_i / G_i` over all nodes, `G_i` being the node's total
/// conductance to its neighbours.
fn stable_step(device: &DeviceParameters, y: &[f64]) -> f64 {
    let stages = &device.thermal_stages;
    let last = stages.len() - 1;
    let mut limit = f64::INFINITY;
    for (i, stage) in stages.iter().enumerate() {
        let mut conductance = 1.0 / stage.resistance_at(y[i]);
        if i > 0 {
            conductance += 1.0 / stages[i - 1].resistance_at(y[i - 1]);
        }
        if i == last {
            conductance += device.cooling_conductance();
        }
        limit = limit.min(stage.capacitance_at(y[i]) / conductance);
    }
    limit
}

/// Sub-step count for the whole profile at the step limit of `initial`.
fn estimated_substeps(
    profile: &LoadProfile,
    device: &DeviceParameters,
    initial: &ThermalState,
    options: &SimulationOptions,
) -> f64 {
    let mut h = options.stability_factor * stable_step(device, &initial.stages);
    if let Some(max_step) = options.max_step {
        h = h.min(max_step);
    }
    (profile.duration() / h).ceil()
}

/// Integrates the device's thermal network over the whole load profile.
///
/// Returns one trace point per profile sample. All stages start at
/// `ambient_temperature` unless `initial_state` is given.
pub fn simulate(
    profile: &LoadProfile,
    device: &DeviceParameters,
    ambient_temperature: f64,
    initial_state: Option<&ThermalState>,
    options: &SimulationOptions,
) -> Result<SimulationTrace, LifetimeError> {
    validate_load_profile(profile)?;
    if !ambient_temperature.is_finite() || ambient_temperature <= ABSOLUTE_ZERO {
        return Err(LifetimeError::invalid_input(
            Stage::ThermalSimulation,
            "ambient_temperature",
            ambient_temperature,
            "must be finite and above absolute zero",
        ));
    }
    validate_options(options)?;

    let stage_count = device.thermal_stages.len();
    let initial = match initial_state {
        Some(state) => {
            validate_initial_state(state, stage_count)?;
            state.clone()
        }
        None => ThermalState::uniform(ambient_temperature, stage_count.max(1)),
    };
    let coldest = initial.stages.iter().copied().fold(ambient_temperature, f64::min);
    let divergence_limit = options.divergence_factor * device.max_temperature;
    validate_device(
        device,
        ((coldest - VALIDATION_MARGIN).max(ABSOLUTE_ZERO), divergence_limit),
    )?;

    let substeps = estimated_substeps(profile, device, &initial, options);
    info!(
        device = %device.name,
        profile = %profile.name,
        samples = profile.samples.len(),
        stages = stage_count,
        junction_to_ambient = device.steady_state_resistance(ambient_temperature),
        estimated_substeps = substeps,
        "starting thermal simulation"
    );
    if substeps > LONG_RUN_SUBSTEPS {
        warn!(
            device = %device.name,
            estimated_substeps = substeps,
            "smallest thermal time constant forces a very long integration"
        );
    }

    let mut run = Run {
        device,
        options,
        trace: SimulationTrace::default(),
        divergence_limit,
    };

    run.record(0, &profile.samples[0], initial.clone())?;

    let mut y = initial.stages;
    let mut stepper = Rk4::new(stage_count);
    for interval in 0..profile.samples.len() - 1 {
        let start = profile.samples[interval].time;
        let end = profile.samples[interval + 1].time;
        let network = ThermalNetwork {
            device,
            profile,
            ambient: ambient_temperature,
            interval,
        };

        // Absolute time is `start + elapsed`.
        let span = end - start;
        let mut elapsed = 0.0;
        while elapsed < span {
            let t = start + elapsed;
            if let Some(cancel) = &options.cancel {
                if cancel.is_cancelled() {
                    return Err(LifetimeError::Cancelled {
                        sample_index: interval,
                        timestamp: t,
                    });
                }
            }

            let remaining = span - elapsed;
            let mut h = options.stability_factor * stable_step(device, &y);
            if let Some(max_step) = options.max_step {
                h = h.min(max_step);
            }
            let reaches_end = h >= remaining;
            let h = if reaches_end { remaining } else { h };
            let Some(next) = advance(elapsed, h, span) else {
                return Err(run.instability(
                    interval + 1,
                    t,
                    h,
                    "integration step below time resolution".to_string(),
                    y.clone(),
                ));
            };

            let before = y.clone();
            if let Err(error) = stepper.step(&network, t, &mut y, h) {
                return Err(match error {
                    StepError::Loss(loss) => loss,
                    StepError::NonPhysical { reason, value } => {
                        run.instability(interval + 1, t, value, reason, before)
                    }
                });
            }
            elapsed = next;
            run.trace.substeps += 1;

            let t = start + elapsed;
            if let Some((value, reason)) = run.divergence(&y) {
                return Err(run.instability(interval + 1, t, value, reason, before));
            }
            run.note_peak(interval + 1, t, y[0]);
        }

        run.record(
            interval + 1,
            &profile.samples[interval + 1],
            ThermalState { stages: y.clone() },
        )?;
    }

    debug!(
        device = %device.name,
        substeps = run.trace.substeps,
        "thermal simulation finished"
    );
    Ok(run.trace)
}

/// Elapsed time after a sub-step of length `h`, or `None` when the step
/// is too short to move `elapsed` at all.
fn advance(elapsed: f64, h: f64, span: f64) -> Option<f64> {
    if h >= span - elapsed {
        return Some(span);
    }
    let next = elapsed + h;
    (next > elapsed).then_some(next)
}

struct Run<'a> {
    device: &'a DeviceParameters,
    options: &'a SimulationOptions,
    trace: SimulationTrace,
    divergence_limit: f64,
}

impl Run<'_> {
    fn record(
        &mut self,
        sample_index: usize,
        sample: &LoadSample,
        thermal: ThermalState,
    ) -> Result<(), LifetimeError> {
        let time = sample.time;
        let losses = compute_losses(
            sample.voltage,
            sample.current,
            sample.state,
            sample.frequency(),
            thermal.junction(),
            self.device,
        )
        .map_err(|error| locate(error, sample_index, time))?;
        let junction = thermal.junction();
        self.note_peak(sample_index, time, junction);
        if junction > self.device.max_temperature {
            if let Some(excursion) = self.trace.excursion.as_mut() {
                excursion.samples_above += 1;
            }
        }
        self.trace.points.push(TracePoint {
            sample_index,
            time,
            voltage: sample.voltage,
            current: sample.current,
            state: thermal,
            losses,
        });
        Ok(())
    }

    fn note_peak(&mut self, sample_index: usize, time: f64, junction: f64) {
        if junction <= self.device.max_temperature {
            return;
        }
        match self.trace.excursion.as_mut() {
            Some(excursion) => {
                excursion.peak_temperature = excursion.peak_temperature.max(junction);
            }
            None => {
                warn!(
                    device = %self.device.name,
                    time,
                    junction,
                    max_temperature = self.device.max_temperature,
                    "junction temperature exceeds absolute maximum rating"
                );
                self.trace.excursion = Some(TemperatureExcursion {
                    first_sample: sample_index,
                    first_timestamp: time,
                    peak_temperature: junction,
                    samples_above: 0,
                });
            }
        }
    }

    fn divergence(&self, y: &[f64]) -> Option<(f64, String)> {
        if let Some(bad) = y.iter().find(|value| !value.is_finite()) {
            return Some((*bad, "non-finite stage temperature".to_string()));
        }
        if y[0] > self.divergence_limit {
            return Some((
                y[0],
                format!(
                    "junction temperature exceeds {} x rated maximum ({} °C)",
                    self.options.divergence_factor, self.divergence_limit
                ),
            ));
        }
        y.iter()
            .find(|value| **value < ABSOLUTE_ZERO)
            .map(|value| (*value, "stage temperature below absolute zero".to_string()))
    }

    fn instability(
        &mut self,
        sample_index: usize,
        timestamp: f64,
        value: f64,
        reason: String,
        last_valid: Vec<f64>,
    ) -> LifetimeError {
        LifetimeError::NumericalInstability(Box::new(InstabilityReport {
            sample_index,
            timestamp,
            value,
            reason,
            last_valid_state: ThermalState { stages: last_valid },
            partial_trace: std::mem::take(&mut self.trace),
        }))
    }
}

fn locate(error: LifetimeError, sample_index: usize, time: f64) -> LifetimeError {
    match error {
        LifetimeError::InvalidInput {
            stage,
            field,
            value,
            reason,
            ..
        } => LifetimeError::InvalidInput {
            stage,
            field,
            sample_index: Some(sample_index),
            timestamp: Some(time),
            value,
            reason,
        },
        other => other,
    }
}

/// Rejects malformed profiles before any integration step runs, naming the
/// first offending sample.
pub fn validate_load_profile(profile: &LoadProfile) -> Result<(), LifetimeError> {
    if profile.samples.is_empty() {
        return Err(LifetimeError::invalid_input(
            Stage::ThermalSimulation,
            "samples",
            0.0,
            "load profile has no samples",
        ));
    }

    let mut previous: Option<f64> = None;
    for (index, sample) in profile.samples.iter().enumerate() {
        let invalid = |field: &str, value: f64, reason: &str| {
            LifetimeError::invalid_sample(
                Stage::ThermalSimulation,
                field,
                index,
                sample.time,
                value,
                reason,
            )
        };
        for (field, value) in [
            ("time", sample.time),
            ("voltage", sample.voltage),
            ("current", sample.current),
        ] {
            if !value.is_finite() {
                return Err(invalid(field, value, "must be finite"));
            }
        }
        if let Some(prev) = previous {
            if sample.time <= prev {
                return Err(invalid(
                    "time",
                    sample.time,
                    "timestamps must be strictly increasing",
                ));
            }
        }
        if let Some(frequency) = sample.switching_frequency {
            if !frequency.is_finite() || frequency < 0.0 {
                return Err(invalid(
                    "switching_frequency",
                    frequency,
                    "must be finite and not negative",
                ));
            }
        }
        if sample.state == SwitchState::Transition && !(sample.frequency() > 0.0) {
            return Err(invalid(
                "switching_frequency",
                sample.frequency(),
                "transition samples need a positive switching frequency",
            ));
        }
        previous = Some(sample.time);
    }
    Ok(())
}

fn validate_initial_state(state: &ThermalState, stage_count: usize) -> Result<(), LifetimeError> {
    if state.stages.len() != stage_count {
        return Err(LifetimeError::invalid_input(
            Stage::ThermalSimulation,
            "initial_state.stages",
            state.stages.len() as f64,
            &format!("expected {stage_count} stage temperatures"),
        ));
    }
    if let Some(bad) = state
        .stages
        .iter()
        .find(|t| !t.is_finite() || **t <= ABSOLUTE_ZERO)
    {
        return Err(LifetimeError::invalid_input(
            Stage::ThermalSimulation,
            "initial_state.stages",
            *bad,
            "must be finite and above absolute zero",
        ));
    }
    Ok(())
}

fn validate_options(options: &SimulationOptions) -> Result<(), LifetimeError> {
    if !(options.stability_factor > 0.0 && options.stability_factor.is_finite()) {
        return Err(LifetimeError::invalid_input(
            Stage::ThermalSimulation,
            "stability_factor",
            options.stability_factor,
            "must be positive",
        ));
    }
    if let Some(max_step) = options.max_step {
        if !(max_step > 0.0 && max_step.is_finite()) {
            return Err(LifetimeError::invalid_input(
                Stage::ThermalSimulation,
                "max_step",
                max_step,
                "must be positive",
            ));
        }
    }
    if !(options.divergence_factor > 1.0 && options.divergence_factor.is_finite()) {
        return Err(LifetimeError::invalid_input(
            Stage::ThermalSimulation,
            "divergence_factor",
            options.divergence_factor,
            "must be greater than one",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::ThermalStage;
    use crate::test_support::{constant_current_profile, single_stage_device};

    fn three_stage_device() -> DeviceParameters {
        let mut device = single_stage_device(0.5, 0.01, 0.2);
        device.thermal_stages = vec![
            ThermalStage::new(0.5, 0.01),
            ThermalStage::new(1.0, 0.1),
            ThermalStage::new(1.5, 1.0),
        ];
        device
    }

    #[test]
    fn constant_load_converges_to_analytical_steady_state() {
        let device = three_stage_device();
        let profile = constant_current_profile(5.0, 100.0, 101);

        let trace = simulate(&profile, &device, 25.0, None, &SimulationOptions::default()).unwrap();

        // P = 5^2 * 0.2 = 5 W, R_total = 3 K/W
        let expected = 25.0 + 5.0 * device.steady_state_resistance(25.0);
        let last = trace.points.last().unwrap();
        assert!((last.state.junction() - 40.0).abs() < 1e-4);
        assert!((last.state.junction() - expected).abs() < 1e-4);
        assert_eq!(trace.points.len(), 101);
        assert!(trace.excursion.is_none());
    }

    #[test]
    fn cooling_path_lowers_steady_state_as_parallel_resistance() {
        let mut device = three_stage_device();
        device.surface_area = 0.01;
        device.cooling_coefficient = 50.0;
        let profile = constant_current_profile(5.0, 100.0, 11);

        let trace = simulate(&profile, &device, 25.0, None, &SimulationOptions::default()).unwrap();

        let expected = 25.0 + 5.0 * device.steady_state_resistance(25.0);
        let junction = trace.points.last().unwrap().state.junction();
        assert!((junction - expected).abs() < 1e-4);
    }

    #[test]
    fn temperature_dependent_on_resistance_reaches_coupled_fixed_point() {
        let mut device = single_stage_device(2.0, 0.5, 0.1);
        device.on_resistance.temp_coefficients = vec![0.004];
        let profile = constant_current_profile(5.0, 50.0, 51);

        let trace = simulate(&profile, &device, 25.0, None, &SimulationOptions::default()).unwrap();

        // T = Ta + k (1 + a (T - 25)), k = I^2 R25 Rth = 5
        let k = 5.0;
        let a = 0.004;
        let expected = (25.0 + k - 25.0 * k * a) / (1.0 - k * a);
        let junction = trace.points.last().unwrap().state.junction();
        assert!((junction - expected).abs() < 1e-4);
    }

    #[test]
    fn starts_from_ambient_unless_initial_state_given() {
        let device = three_stage_device();
        let profile = constant_current_profile(0.0, 1.0, 2);

        let trace = simulate(&profile, &device, 30.0, None, &SimulationOptions::default()).unwrap();
        assert_eq!(trace.points[0].state.stages, vec![30.0, 30.0, 30.0]);

        let initial = ThermalState {
            stages: vec![60.0, 50.0, 40.0],
        };
        let trace =
            simulate(&profile, &device, 30.0, Some(&initial), &SimulationOptions::default())
                .unwrap();
        assert_eq!(trace.points[0].state, initial);
        assert!(trace.points[1].state.junction() < 60.0);
    }

    #[test]
    fn rejects_initial_state_with_wrong_stage_count() {
        let device = three_stage_device();
        let profile = constant_current_profile(1.0, 1.0, 2);
        let initial = ThermalState::uniform(25.0, 2);

        let err = simulate(&profile, &device, 25.0, Some(&initial), &SimulationOptions::default())
            .unwrap_err();
        assert!(matches!(err, LifetimeError::InvalidInput { ref field, .. } if field == "initial_state.stages"));
    }

    #[test]
    fn non_increasing_timestamp_is_rejected_before_integration() {
        let device = single_stage_device(1.0, 1.0, 0.1);
        let mut profile = constant_current_profile(1.0, 2.0, 3);
        profile.samples.push(LoadSample::new(1.5, 48.0, 1.0, SwitchState::On));
        let cancel = CancelFlag::new();
        let options = SimulationOptions {
            cancel: Some(cancel.clone()),
            ..SimulationOptions::default()
        };
        cancel.cancel();

        // A cancelled run would fail with Cancelled if any step were attempted.
        let err = simulate(&profile, &device, 25.0, None, &options).unwrap_err();
        assert!(matches!(
            err,
            LifetimeError::InvalidInput {
                stage: Stage::ThermalSimulation,
                ref field,
                sample_index: Some(3),
                ..
            } if field == "time"
        ));
    }

    #[test]
    fn transition_sample_without_frequency_is_rejected() {
        let profile = LoadProfile::new(
            "bad",
            vec![
                LoadSample::new(0.0, 400.0, 10.0, SwitchState::On),
                LoadSample::new(1.0, 400.0, 10.0, SwitchState::Transition),
            ],
        );

        let err = validate_load_profile(&profile).unwrap_err();
        assert!(matches!(
            err,
            LifetimeError::InvalidInput { sample_index: Some(1), ref field, .. } if field == "switching_frequency"
        ));
    }

    #[test]
    fn excursion_is_flagged_without_clamping() {
        let mut device = single_stage_device(1.0, 0.1, 0.1);
        device.max_temperature = 30.0;
        // P = 10 W, steady state 35 °C
        let profile = constant_current_profile(10.0, 5.0, 6);

        let trace = simulate(&profile, &device, 25.0, None, &SimulationOptions::default()).unwrap();

        let excursion = trace.excursion.clone().unwrap();
        let last = trace.points.last().unwrap().state.junction();
        assert!((last - 35.0).abs() < 1e-3);
        assert!(excursion.peak_temperature > 34.9);
        assert!(excursion.samples_above >= 1);
        assert_eq!(trace.points.len(), 6);
    }

    #[test]
    fn thermal_runaway_stops_with_partial_trace() {
        let mut device = single_stage_device(10.0, 0.01, 0.1);
        // I^2 * R25 * Rth = 100 K, times 0.015 / K gives loop gain 1.5
        device.on_resistance.temp_coefficients = vec![0.015];
        let profile = constant_current_profile(10.0, 10.0, 101);

        let err = simulate(&profile, &device, 25.0, None, &SimulationOptions::default()).unwrap_err();

        match err {
            LifetimeError::NumericalInstability(report) => {
                assert!(report.sample_index > 0);
                assert!(report.timestamp > 0.0);
                assert!(report.value > 1750.0 || !report.value.is_finite());
                assert!(report.last_valid_state.junction() <= 1750.0);
                assert!(!report.partial_trace.points.is_empty());
                assert!(report.partial_trace.excursion.is_some());
            }
            other => panic!("expected numerical instability, got {other:?}"),
        }
    }

    #[test]
    fn cancelled_run_reports_position() {
        let device = single_stage_device(1.0, 1.0, 0.1);
        let profile = constant_current_profile(1.0, 1.0, 3);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let options = SimulationOptions {
            cancel: Some(cancel),
            ..SimulationOptions::default()
        };

        let err = simulate(&profile, &device, 25.0, None, &options).unwrap_err();
        assert_eq!(
            err,
            LifetimeError::Cancelled {
                sample_index: 0,
                timestamp: 0.0
            }
        );
    }

    #[test]
    fn short_time_constants_integrate_at_large_timestamps() {
        let device = single_stage_device(1.0, 1e-8, 0.1);
        let profile = LoadProfile::new(
            "late",
            vec![
                LoadSample::new(1e9, 48.0, 1.0, SwitchState::On),
                LoadSample::new(1e9 + 1e-6, 48.0, 1.0, SwitchState::On),
            ],
        );
        let cancel = CancelFlag::new();
        let watchdog = cancel.clone();
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_secs(10));
            watchdog.cancel();
        });
        let options = SimulationOptions {
            cancel: Some(cancel),
            ..SimulationOptions::default()
        };

        let trace = simulate(&profile, &device, 25.0, None, &options).unwrap();

        // ~95 time constants at P = 0.1 W, R = 1 K/W
        assert_eq!(trace.points.len(), 2);
        assert!((trace.points[1].state.junction() - 25.1).abs() < 1e-6);
        assert!(trace.substeps >= 90);
    }

    #[test]
    fn advance_stops_at_span_and_rejects_unresolvable_steps() {
        assert_eq!(advance(0.0, 1e-8, 1.0), Some(1e-8));
        assert_eq!(advance(0.5, 0.6, 1.0), Some(1.0));
        assert_eq!(advance(1e9, 1e-8, 2e9), None);
        assert_eq!(advance(0.25, 0.0, 1.0), None);
    }

    #[test]
    fn negative_on_resistance_during_integration_is_non_physical() {
        let mut device = single_stage_device(1.0, 1.0, 0.1);
        // 1 - 0.02 * 75 < 0 at 100 °C
        device.on_resistance.temp_coefficients = vec![-0.02];
        let profile = constant_current_profile(1.0, 1.0, 2);
        let network = ThermalNetwork {
            device: &device,
            profile: &profile,
            ambient: 25.0,
            interval: 0,
        };
        let mut dydt = [0.0];

        assert!(network.derivatives(0.0, &[25.0], &mut dydt).is_ok());
        let err = network.derivatives(0.0, &[100.0], &mut dydt);
        assert!(matches!(err, Err(StepError::NonPhysical { value, .. }) if value == 100.0));
    }

    #[test]
    fn substep_estimate_follows_step_limit_and_max_step() {
        let device = three_stage_device();
        let profile = constant_current_profile(1.0, 100.0, 11);
        let initial = ThermalState::uniform(25.0, 3);

        let options = SimulationOptions::default();
        assert_eq!(estimated_substeps(&profile, &device, &initial, &options), 20_000.0);

        let options = SimulationOptions {
            max_step: Some(0.001),
            ..SimulationOptions::default()
        };
        assert_eq!(estimated_substeps(&profile, &device, &initial, &options), 100_000.0);
    }

    #[test]
    fn step_limit_tracks_smallest_node_time_constant() {
        let device = three_stage_device();
        let y = [25.0, 25.0, 25.0];
        // node 0: C = 0.01, G = 1 / 0.5 = 2
        assert!((stable_step(&device, &y) - 0.005).abs() < 1e-12);
    }
}
