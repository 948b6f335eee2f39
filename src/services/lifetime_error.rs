use std::fmt;

use thiserror::Error;

use crate::domain::thermal_state::{SimulationTrace, ThermalState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PowerLoss,
    ThermalSimulation,
    Rainflow,
    DamageAccumulation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::PowerLoss => "power loss model",
            Stage::ThermalSimulation => "thermal simulator",
            Stage::Rainflow => "rainflow extractor",
            Stage::DamageAccumulation => "damage accumulator",
        };
        f.write_str(name)
    }
}

/// Where and why an integration run stopped, with everything computed
/// before the failure.
#[derive(Debug, Clone, PartialEq)]
pub struct InstabilityReport {
    pub sample_index: usize,
    pub timestamp: f64,
    pub value: f64,
    pub reason: String,
    pub last_valid_state: ThermalState,
    pub partial_trace: SimulationTrace,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifetimeError {
    #[error("invalid input in {stage}: {field} = {value} {}: {reason}", position(.sample_index, .timestamp))]
    InvalidInput {
        stage: Stage,
        field: String,
        sample_index: Option<usize>,
        timestamp: Option<f64>,
        value: f64,
        reason: String,
    },
    #[error(
        "numerical instability at sample {} (t = {} s): {} (value {})",
        .0.sample_index, .0.timestamp, .0.reason, .0.value
    )]
    NumericalInstability(Box<InstabilityReport>),
    #[error("invalid configuration for device {device}: {field} = {value}: {reason}")]
    Configuration {
        device: String,
        field: String,
        value: f64,
        reason: String,
    },
    #[error("simulation cancelled at sample {sample_index} (t = {timestamp} s)")]
    Cancelled { sample_index: usize, timestamp: f64 },
}

impl LifetimeError {
    pub fn invalid_input(stage: Stage, field: &str, value: f64, reason: &str) -> Self {
        LifetimeError::InvalidInput {
            stage,
            field: field.to_string(),
            sample_index: None,
            timestamp: None,
            value,
            reason: reason.to_string(),
        }
    }

    pub fn invalid_sample(
        stage: Stage,
        field: &str,
        sample_index: usize,
        timestamp: f64,
        value: f64,
        reason: &str,
    ) -> Self {
        LifetimeError::InvalidInput {
            stage,
            field: field.to_string(),
            sample_index: Some(sample_index),
            timestamp: Some(timestamp),
            value,
            reason: reason.to_string(),
        }
    }

    pub fn configuration(device: &str, field: &str, value: f64, reason: &str) -> Self {
        LifetimeError::Configuration {
            device: device.to_string(),
            field: field.to_string(),
            value,
            reason: reason.to_string(),
        }
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            LifetimeError::InvalidInput { .. } => "invalid_input",
            LifetimeError::NumericalInstability(_) => "numerical_instability",
            LifetimeError::Configuration { .. } => "configuration_error",
            LifetimeError::Cancelled { .. } => "cancelled",
        }
    }

    pub fn partial_trace(&self) -> Option<&SimulationTrace> {
        match self {
            LifetimeError::NumericalInstability(report) => Some(&report.partial_trace),
            _ => None,
        }
    }
}

fn position(sample_index: &Option<usize>, timestamp: &Option<f64>) -> String {
    match (*sample_index, *timestamp) {
        (Some(index), Some(time)) => format!("at sample {index} (t = {time} s)"),
        (Some(index), None) => format!("at sample {index}"),
        _ => String::new(),
    }
}
