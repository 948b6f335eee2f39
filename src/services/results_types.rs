use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted outcome of one mission run over a device catalog.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResultsDocument {
    pub generated_at: DateTime<Utc>,
    pub mission: String,
    pub ambient_temperature: f64,
    pub mission_duration: f64,
    pub devices: Vec<DeviceResult>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DeviceResult {
    pub name: String,
    pub status: RunStatus,
    pub series: TraceSeries,
    pub excursion: Option<ExcursionRecord>,
    pub lifetime: Option<LifetimeRecord>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed {
        kind: String,
        message: String,
        failure: Option<FailurePoint>,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FailurePoint {
    pub sample_index: Option<usize>,
    pub timestamp: Option<f64>,
    pub value: Option<f64>,
}

/// Column-oriented time series, one entry per recorded sample.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct TraceSeries {
    pub time: Vec<f64>,
    pub junction_temperature: Vec<f64>,
    pub voltage: Vec<f64>,
    pub current: Vec<f64>,
    pub conduction_loss: Vec<f64>,
    pub turn_on_loss: Vec<f64>,
    pub turn_off_loss: Vec<f64>,
    pub capacitive_loss: Vec<f64>,
    pub reverse_recovery_loss: Vec<f64>,
    pub total_loss: Vec<f64>,
    /// `stage_temperatures[i]` is the temperature series of stage `i`.
    pub stage_temperatures: Vec<Vec<f64>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExcursionRecord {
    pub first_sample: usize,
    pub first_timestamp: f64,
    pub peak_temperature: f64,
    pub samples_above: usize,
}

/// Lifetime figures; the `*_to_failure` fields are `None` when the mission
/// causes no appreciable damage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LifetimeRecord {
    pub damage_fraction: f64,
    pub missions_to_failure: Option<f64>,
    pub seconds_to_failure: Option<f64>,
    pub years_to_failure: Option<f64>,
    pub weighted_cycle_count: f64,
    pub sum_cycles_to_failure: Option<f64>,
    pub cycles: Vec<CycleRecord>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CycleRecord {
    pub range: f64,
    pub mean: f64,
    pub weight: f64,
    pub from_index: usize,
    pub to_index: usize,
    pub cycles_to_failure: Option<f64>,
    pub damage: f64,
}
