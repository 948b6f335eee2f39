//! Read-only projections over a [`ResultsDocument`] for rendering and
//! reporting. Nothing here recomputes or mutates simulation results.

use std::cmp::Ordering;

use serde::Serialize;
use thiserror::Error;

use crate::services::results_types::{DeviceResult, ResultsDocument, RunStatus, TraceSeries};

#[derive(Error, Debug, PartialEq)]
pub enum TraceQueryError {
    #[error("no results for device {0}")]
    UnknownDevice(String),
    #[error("device {device} has no thermal stage {stage}")]
    UnknownStage { device: String, stage: usize },
    #[error("invalid time window [{start}, {end}]")]
    InvalidWindow { start: f64, end: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    JunctionTemperature,
    Voltage,
    Current,
    ConductionLoss,
    TurnOnLoss,
    TurnOffLoss,
    CapacitiveLoss,
    ReverseRecoveryLoss,
    TotalLoss,
    Stage(usize),
}

impl Channel {
    pub fn label(&self) -> String {
        match self {
            Channel::JunctionTemperature => "Junction temperature (°C)".to_string(),
            Channel::Voltage => "Drain-source voltage (V)".to_string(),
            Channel::Current => "Drain current (A)".to_string(),
            Channel::ConductionLoss => "Conduction loss (W)".to_string(),
            Channel::TurnOnLoss => "Turn-on loss (W)".to_string(),
            Channel::TurnOffLoss => "Turn-off loss (W)".to_string(),
            Channel::CapacitiveLoss => "Capacitive loss (W)".to_string(),
            Channel::ReverseRecoveryLoss => "Reverse recovery loss (W)".to_string(),
            Channel::TotalLoss => "Total loss (W)".to_string(),
            Channel::Stage(index) => format!("Stage {index} temperature (°C)"),
        }
    }

    fn column<'a>(&self, series: &'a TraceSeries) -> Option<&'a [f64]> {
        let column = match self {
            Channel::JunctionTemperature => &series.junction_temperature,
            Channel::Voltage => &series.voltage,
            Channel::Current => &series.current,
            Channel::ConductionLoss => &series.conduction_loss,
            Channel::TurnOnLoss => &series.turn_on_loss,
            Channel::TurnOffLoss => &series.turn_off_loss,
            Channel::CapacitiveLoss => &series.capacitive_loss,
            Channel::ReverseRecoveryLoss => &series.reverse_recovery_loss,
            Channel::TotalLoss => &series.total_loss,
            Channel::Stage(index) => series.stage_temperatures.get(*index)?,
        };
        Some(column.as_slice())
    }
}

/// Peak and time-averaged value of one loss column (W).
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct LossStatistics {
    pub peak: Option<f64>,
    pub average: Option<f64>,
}

impl LossStatistics {
    fn of(time: &[f64], values: &[f64]) -> Self {
        Self {
            peak: max(values),
            average: time_average(time, values),
        }
    }
}

/// Per-mechanism loss statistics. Switching is turn-on plus turn-off.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct LossSummary {
    pub conduction: LossStatistics,
    pub switching: LossStatistics,
    pub capacitive: LossStatistics,
    pub reverse_recovery: LossStatistics,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DeviceSummary {
    pub name: String,
    pub completed: bool,
    pub peak_power: Option<f64>,
    pub average_power: Option<f64>,
    pub losses: LossSummary,
    pub peak_junction_temperature: Option<f64>,
    pub final_junction_temperature: Option<f64>,
    pub exceeded_max_temperature: bool,
    pub damage_fraction: Option<f64>,
    /// `None` for a completed run means no appreciable damage.
    pub years_to_failure: Option<f64>,
    pub full_cycles: usize,
    pub half_cycles: usize,
}

pub fn find_device<'a>(
    document: &'a ResultsDocument,
    device: &str,
) -> Result<&'a DeviceResult, TraceQueryError> {
    document
        .devices
        .iter()
        .find(|result| result.name == device)
        .ok_or_else(|| TraceQueryError::UnknownDevice(device.to_string()))
}

/// `(time, value)` points of one channel of one device.
pub fn series(
    document: &ResultsDocument,
    device: &str,
    channel: Channel,
) -> Result<Vec<(f64, f64)>, TraceQueryError> {
    let result = find_device(document, device)?;
    let column = channel.column(&result.series).ok_or_else(|| match channel {
        Channel::Stage(stage) => TraceQueryError::UnknownStage {
            device: device.to_string(),
            stage,
        },
        _ => TraceQueryError::UnknownDevice(device.to_string()),
    })?;
    Ok(result
        .series
        .time
        .iter()
        .copied()
        .zip(column.iter().copied())
        .collect())
}

/// Points with `start <= time <= end`. `points` must be sorted by time.
pub fn window(points: &[(f64, f64)], start: f64, end: f64) -> Result<&[(f64, f64)], TraceQueryError> {
    if !(start <= end) {
        return Err(TraceQueryError::InvalidWindow { start, end });
    }
    let first = points.partition_point(|(time, _)| *time < start);
    let last = points.partition_point(|(time, _)| *time <= end);
    Ok(&points[first..last.max(first)])
}

pub fn device_summaries(document: &ResultsDocument) -> Vec<DeviceSummary> {
    document.devices.iter().map(summarize).collect()
}

fn summarize(result: &DeviceResult) -> DeviceSummary {
    let series = &result.series;
    let lifetime = result.lifetime.as_ref();
    let (full_cycles, half_cycles) = lifetime
        .map(|l| {
            let full = l.cycles.iter().filter(|c| c.weight >= 1.0).count();
            (full, l.cycles.len() - full)
        })
        .unwrap_or((0, 0));
    DeviceSummary {
        name: result.name.clone(),
        completed: result.status == RunStatus::Completed,
        peak_power: max(&series.total_loss),
        average_power: time_average(&series.time, &series.total_loss),
        losses: loss_summary(series),
        peak_junction_temperature: max(&series.junction_temperature),
        final_junction_temperature: series.junction_temperature.last().copied(),
        exceeded_max_temperature: result.excursion.is_some(),
        damage_fraction: lifetime.map(|l| l.damage_fraction),
        years_to_failure: lifetime.and_then(|l| l.years_to_failure),
        full_cycles,
        half_cycles,
    }
}

fn loss_summary(series: &TraceSeries) -> LossSummary {
    let switching: Vec<f64> = series
        .turn_on_loss
        .iter()
        .zip(&series.turn_off_loss)
        .map(|(on, off)| on + off)
        .collect();
    LossSummary {
        conduction: LossStatistics::of(&series.time, &series.conduction_loss),
        switching: LossStatistics::of(&series.time, &switching),
        capacitive: LossStatistics::of(&series.time, &series.capacitive_loss),
        reverse_recovery: LossStatistics::of(&series.time, &series.reverse_recovery_loss),
    }
}

/// Longest-lived first. Runs without appreciable damage lead, failed runs
/// trail.
pub fn rank_by_lifetime(summaries: &[DeviceSummary]) -> Vec<&DeviceSummary> {
    let mut ranked: Vec<&DeviceSummary> = summaries.iter().collect();
    ranked.sort_by(|a, b| lifetime_key(b).partial_cmp(&lifetime_key(a)).unwrap_or(Ordering::Equal));
    ranked
}

fn lifetime_key(summary: &DeviceSummary) -> f64 {
    match (summary.completed, summary.years_to_failure) {
        (false, _) => f64::NEG_INFINITY,
        (true, Some(years)) => years,
        (true, None) => f64::INFINITY,
    }
}

fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

// Trapezoidal time average; a single sample is its own average.
fn time_average(time: &[f64], values: &[f64]) -> Option<f64> {
    match values.len() {
        0 => None,
        1 => Some(values[0]),
        _ => {
            let span = time[time.len() - 1] - time[0];
            let area: f64 = time
                .windows(2)
                .zip(values.windows(2))
                .map(|(t, v)| 0.5 * (v[0] + v[1]) * (t[1] - t[0]))
                .sum();
            Some(area / span)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::results_types::{CycleRecord, LifetimeRecord};
    use chrono::Utc;

    fn device(name: &str, years: Option<f64>, status: RunStatus) -> DeviceResult {
        let completed = status == RunStatus::Completed;
        DeviceResult {
            name: name.to_string(),
            status,
            series: TraceSeries {
                time: vec![0.0, 1.0, 2.0],
                junction_temperature: vec![50.0, 70.0, 60.0],
                voltage: vec![400.0, 400.0, 0.0],
                current: vec![10.0, 10.0, 0.0],
                conduction_loss: vec![0.0, 6.0, 0.0],
                turn_on_loss: vec![0.0, 1.0, 0.0],
                turn_off_loss: vec![0.0, 2.0, 0.0],
                capacitive_loss: vec![0.0, 0.5, 0.0],
                reverse_recovery_loss: vec![0.0, 0.5, 0.0],
                total_loss: vec![0.0, 10.0, 0.0],
                stage_temperatures: vec![vec![50.0, 70.0, 60.0]],
            },
            excursion: None,
            lifetime: completed.then(|| LifetimeRecord {
                damage_fraction: 1e-6,
                missions_to_failure: years.map(|_| 1e6),
                seconds_to_failure: years.map(|y| y * 3.15e7),
                years_to_failure: years,
                weighted_cycle_count: 1.5,
                sum_cycles_to_failure: Some(2e6),
                cycles: vec![
                    CycleRecord {
                        range: 20.0,
                        mean: 60.0,
                        weight: 1.0,
                        from_index: 0,
                        to_index: 1,
                        cycles_to_failure: Some(1e6),
                        damage: 1e-6,
                    },
                    CycleRecord {
                        range: 10.0,
                        mean: 65.0,
                        weight: 0.5,
                        from_index: 1,
                        to_index: 2,
                        cycles_to_failure: Some(1e6),
                        damage: 5e-7,
                    },
                ],
            }),
        }
    }

    fn document() -> ResultsDocument {
        ResultsDocument {
            generated_at: Utc::now(),
            mission: "bench".to_string(),
            ambient_temperature: 50.0,
            mission_duration: 2.0,
            devices: vec![
                device("short", Some(2.0), RunStatus::Completed),
                device(
                    "broken",
                    None,
                    RunStatus::Failed {
                        kind: "configuration_error".to_string(),
                        message: "bad".to_string(),
                        failure: None,
                    },
                ),
                device("long", Some(20.0), RunStatus::Completed),
                device("idle", None, RunStatus::Completed),
            ],
        }
    }

    #[test]
    fn series_pairs_time_with_channel() {
        let document = document();

        let points = series(&document, "long", Channel::JunctionTemperature).unwrap();
        assert_eq!(points, vec![(0.0, 50.0), (1.0, 70.0), (2.0, 60.0)]);

        let stage = series(&document, "long", Channel::Stage(0)).unwrap();
        assert_eq!(stage, points);
    }

    #[test]
    fn unknown_device_and_stage_are_reported() {
        let document = document();

        assert_eq!(
            series(&document, "IRF540", Channel::Voltage).unwrap_err(),
            TraceQueryError::UnknownDevice("IRF540".to_string())
        );
        assert_eq!(
            series(&document, "long", Channel::Stage(3)).unwrap_err(),
            TraceQueryError::UnknownStage {
                device: "long".to_string(),
                stage: 3
            }
        );
    }

    #[test]
    fn window_is_inclusive_and_rejects_reversed_bounds() {
        let points = vec![(0.0, 1.0), (0.5, 2.0), (1.0, 3.0), (1.5, 4.0)];

        assert_eq!(window(&points, 0.5, 1.0).unwrap(), &points[1..3]);
        assert!(window(&points, 2.0, 3.0).unwrap().is_empty());
        assert!(window(&points, 1.0, 0.5).is_err());
    }

    #[test]
    fn summaries_aggregate_power_temperature_and_cycles() {
        let summaries = device_summaries(&document());

        let long = &summaries[2];
        assert_eq!(long.peak_power, Some(10.0));
        assert_eq!(long.average_power, Some(5.0));
        assert_eq!(long.peak_junction_temperature, Some(70.0));
        assert_eq!(long.final_junction_temperature, Some(60.0));
        assert_eq!((long.full_cycles, long.half_cycles), (1, 1));
        assert!(!summaries[1].completed);
        assert_eq!(
            long.losses.conduction,
            LossStatistics {
                peak: Some(6.0),
                average: Some(3.0)
            }
        );
        assert_eq!(long.losses.switching.peak, Some(3.0));
        assert_eq!(long.losses.switching.average, Some(1.5));
        assert_eq!(long.losses.capacitive.average, Some(0.25));
        assert_eq!(long.losses.reverse_recovery.peak, Some(0.5));
        assert_eq!(summaries[1].damage_fraction, None);
    }

    #[test]
    fn ranking_puts_undamaged_first_and_failed_last() {
        let summaries = device_summaries(&document());

        let names: Vec<&str> = rank_by_lifetime(&summaries)
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["idle", "long", "short", "broken"]);
    }
}
