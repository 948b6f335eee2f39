use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;

use crate::domain::damage::DamageReport;
use crate::domain::load_profile::LoadProfile;
use crate::domain::thermal_state::SimulationTrace;
use crate::services::lifetime_error::LifetimeError;
use crate::services::lifetime_pipeline::LifetimeRun;
use crate::services::results_types::{
    CycleRecord, DeviceResult, ExcursionRecord, FailurePoint, LifetimeRecord, ResultsDocument,
    RunStatus, TraceSeries,
};

#[derive(Error, Debug)]
pub enum ResultsJsonError {
    #[error("failed to read results file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write results file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to parse results json: {0}")]
    Parse(#[from] serde_json::Error),
}

pub fn build_results_document(
    profile: &LoadProfile,
    ambient_temperature: f64,
    runs: &[(String, Result<LifetimeRun, LifetimeError>)],
) -> ResultsDocument {
    ResultsDocument {
        generated_at: Utc::now(),
        mission: profile.name.clone(),
        ambient_temperature,
        mission_duration: profile.duration(),
        devices: runs
            .iter()
            .map(|(name, result)| device_result(name, result))
            .collect(),
    }
}

fn device_result(name: &str, result: &Result<LifetimeRun, LifetimeError>) -> DeviceResult {
    match result {
        Ok(run) => DeviceResult {
            name: name.to_string(),
            status: RunStatus::Completed,
            series: series_from_trace(&run.trace),
            excursion: excursion_record(&run.trace),
            lifetime: Some(lifetime_record(&run.report)),
        },
        Err(error) => {
            let trace = error.partial_trace();
            DeviceResult {
                name: name.to_string(),
                status: RunStatus::Failed {
                    kind: error.kind().to_string(),
                    message: error.to_string(),
                    failure: failure_point(error),
                },
                series: trace.map(series_from_trace).unwrap_or_default(),
                excursion: trace.and_then(excursion_record),
                lifetime: None,
            }
        }
    }
}

pub fn series_from_trace(trace: &SimulationTrace) -> TraceSeries {
    let stage_count = trace.points.first().map(|p| p.state.stages.len()).unwrap_or(0);
    let mut series = TraceSeries {
        stage_temperatures: vec![Vec::with_capacity(trace.points.len()); stage_count],
        ..TraceSeries::default()
    };
    for point in &trace.points {
        series.time.push(point.time);
        series.junction_temperature.push(point.state.junction());
        series.voltage.push(point.voltage);
        series.current.push(point.current);
        series.conduction_loss.push(point.losses.conduction);
        series.turn_on_loss.push(point.losses.turn_on);
        series.turn_off_loss.push(point.losses.turn_off);
        series.capacitive_loss.push(point.losses.capacitive);
        series.reverse_recovery_loss.push(point.losses.reverse_recovery);
        series.total_loss.push(point.losses.total());
        for (column, temperature) in series.stage_temperatures.iter_mut().zip(&point.state.stages) {
            column.push(*temperature);
        }
    }
    series
}

fn excursion_record(trace: &SimulationTrace) -> Option<ExcursionRecord> {
    trace.excursion.as_ref().map(|e| ExcursionRecord {
        first_sample: e.first_sample,
        first_timestamp: e.first_timestamp,
        peak_temperature: e.peak_temperature,
        samples_above: e.samples_above,
    })
}

fn lifetime_record(report: &DamageReport) -> LifetimeRecord {
    LifetimeRecord {
        damage_fraction: report.damage_fraction,
        missions_to_failure: finite(report.missions_to_failure()),
        seconds_to_failure: finite(report.seconds_to_failure()),
        years_to_failure: finite(report.years_to_failure()),
        weighted_cycle_count: report.total_cycle_weight(),
        sum_cycles_to_failure: finite(report.sum_cycles_to_failure()),
        cycles: report
            .cycles
            .iter()
            .map(|c| CycleRecord {
                range: c.cycle.range,
                mean: c.cycle.mean,
                weight: c.cycle.weight,
                from_index: c.cycle.from_index,
                to_index: c.cycle.to_index,
                cycles_to_failure: finite(c.cycles_to_failure),
                damage: c.damage,
            })
            .collect(),
    }
}

fn failure_point(error: &LifetimeError) -> Option<FailurePoint> {
    match error {
        LifetimeError::InvalidInput {
            sample_index,
            timestamp,
            value,
            ..
        } => Some(FailurePoint {
            sample_index: *sample_index,
            timestamp: *timestamp,
            value: finite(*value),
        }),
        LifetimeError::NumericalInstability(report) => Some(FailurePoint {
            sample_index: Some(report.sample_index),
            timestamp: Some(report.timestamp),
            value: finite(report.value),
        }),
        LifetimeError::Cancelled {
            sample_index,
            timestamp,
        } => Some(FailurePoint {
            sample_index: Some(*sample_index),
            timestamp: Some(*timestamp),
            value: None,
        }),
        LifetimeError::Configuration { .. } => None,
    }
}

// JSON has no representation for infinities or NaN.
fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

pub fn serialize_results_to_json<W: Write>(
    writer: &mut W,
    document: &ResultsDocument,
) -> Result<(), ResultsJsonError> {
    serde_json::to_writer_pretty(writer, document)?;
    Ok(())
}

pub fn deserialize_results_from_json_str(input: &str) -> Result<ResultsDocument, ResultsJsonError> {
    Ok(serde_json::from_str(input)?)
}

pub async fn write_results_to_json_file<P: AsRef<Path>>(
    path: P,
    document: &ResultsDocument,
) -> Result<(), ResultsJsonError> {
    let path = path.as_ref();
    let mut buffer = Vec::new();
    serialize_results_to_json(&mut buffer, document)?;
    tokio::fs::write(path, buffer)
        .await
        .map_err(|source| ResultsJsonError::Write {
            path: path.to_path_buf(),
            source,
        })
}

pub async fn load_results_from_json_file<P: AsRef<Path>>(
    path: P,
) -> Result<ResultsDocument, ResultsJsonError> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ResultsJsonError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    deserialize_results_from_json_str(&contents)
}
