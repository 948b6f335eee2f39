use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::load_profile::{Interpolation, LoadProfile, LoadSample, SwitchState};

#[derive(Error, Debug)]
pub enum LoadProfileYamlError {
    #[error("failed to read mission profile {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse mission profile: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("mission profile must define exactly one of samples, waveform or square_wave")]
    LoadDefinition,
    #[error("invalid switch state: {0} (expected on, off or transition)")]
    InvalidState(String),
    #[error("invalid interpolation: {0} (expected linear or hold)")]
    InvalidInterpolation(String),
    #[error("waveform channel {0} has no points")]
    EmptyWaveform(&'static str),
    #[error("waveform channel {channel} is not sorted by time at t = {time}")]
    UnsortedWaveform { channel: &'static str, time: f64 },
    #[error("repeat must be at least 1")]
    InvalidRepeat,
}

#[derive(Debug, Deserialize)]
struct MissionRecord {
    name: Option<String>,
    interpolation: Option<String>,
    repeat: Option<usize>,
    samples: Option<Vec<SampleRecord>>,
    waveform: Option<WaveformRecord>,
    square_wave: Option<SquareWaveRecord>,
}

#[derive(Debug, Deserialize)]
struct SampleRecord {
    time: f64,
    voltage: f64,
    current: f64,
    state: Option<String>,
    switching_frequency: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WaveformRecord {
    voltage: Vec<(f64, f64)>,
    current: Vec<(f64, f64)>,
    state: Option<String>,
    switching_frequency: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SquareWaveRecord {
    on_current: f64,
    voltage: f64,
    period: f64,
    periods: usize,
    switching_frequency: Option<f64>,
}

pub fn load_profile_from_yaml_file<P: AsRef<Path>>(
    path: P,
) -> Result<LoadProfile, LoadProfileYamlError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| LoadProfileYamlError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    deserialize_profile_from_yaml_str(&contents)
}

/// Builds a [`LoadProfile`] from one of three load definitions:
///
/// - `samples`: explicit samples, used as written;
/// - `waveform`: separate voltage and current `[time, value]` point lists,
///   merged on the union of their time points;
/// - `square_wave`: a generated on/off current load.
///
/// Timestamps are checked by the simulator, not here.
pub fn deserialize_profile_from_yaml_str(input: &str) -> Result<LoadProfile, LoadProfileYamlError> {
    let record: MissionRecord = serde_yaml::from_str(input)?;
    let defined = [
        record.samples.is_some(),
        record.waveform.is_some(),
        record.square_wave.is_some(),
    ];
    if defined.iter().filter(|d| **d).count() != 1 {
        return Err(LoadProfileYamlError::LoadDefinition);
    }

    let mut profile = if let Some(samples) = record.samples {
        let samples = samples
            .into_iter()
            .map(sample_from_record)
            .collect::<Result<Vec<_>, _>>()?;
        LoadProfile::new("mission", samples)
    } else if let Some(waveform) = record.waveform {
        profile_from_waveform(waveform)?
    } else if let Some(square) = record.square_wave {
        let mut profile =
            LoadProfile::square_wave(square.on_current, square.voltage, square.period, square.periods);
        for sample in &mut profile.samples {
            sample.switching_frequency = square.switching_frequency;
        }
        profile
    } else {
        return Err(LoadProfileYamlError::LoadDefinition);
    };

    if let Some(name) = record.name {
        profile.name = name;
    }
    if let Some(interpolation) = record.interpolation {
        profile.interpolation = parse_interpolation(&interpolation)?;
    }
    match record.repeat {
        Some(0) => Err(LoadProfileYamlError::InvalidRepeat),
        Some(count) => Ok(profile.repeated(count)),
        None => Ok(profile),
    }
}

fn sample_from_record(record: SampleRecord) -> Result<LoadSample, LoadProfileYamlError> {
    let state = match record.state {
        Some(state) => parse_state(&state)?,
        None => SwitchState::On,
    };
    Ok(LoadSample {
        time: record.time,
        voltage: record.voltage,
        current: record.current,
        state,
        switching_frequency: record.switching_frequency,
    })
}

fn profile_from_waveform(record: WaveformRecord) -> Result<LoadProfile, LoadProfileYamlError> {
    check_channel("voltage", &record.voltage)?;
    check_channel("current", &record.current)?;
    let state = match record.state {
        Some(state) => parse_state(&state)?,
        None => SwitchState::On,
    };

    let mut times: Vec<f64> = record
        .voltage
        .iter()
        .chain(record.current.iter())
        .map(|(time, _)| *time)
        .collect();
    times.sort_by(f64::total_cmp);
    times.dedup();

    let samples = times
        .into_iter()
        .map(|time| LoadSample {
            time,
            voltage: interpolate(&record.voltage, time),
            current: interpolate(&record.current, time),
            state,
            switching_frequency: record.switching_frequency,
        })
        .collect();
    Ok(LoadProfile::new("mission", samples))
}

fn check_channel(channel: &'static str, points: &[(f64, f64)]) -> Result<(), LoadProfileYamlError> {
    if points.is_empty() {
        return Err(LoadProfileYamlError::EmptyWaveform(channel));
    }
    if let Some(pair) = points.windows(2).find(|pair| pair[1].0 <= pair[0].0) {
        return Err(LoadProfileYamlError::UnsortedWaveform {
            channel,
            time: pair[1].0,
        });
    }
    Ok(())
}

/// Piecewise-linear value of `points` at `time`, extended linearly beyond
/// the first and last segment.
fn interpolate(points: &[(f64, f64)], time: f64) -> f64 {
    if points.len() == 1 {
        return points[0].1;
    }
    let segment = points
        .windows(2)
        .position(|pair| time <= pair[1].0)
        .unwrap_or(points.len() - 2);
    let (t0, y0) = points[segment];
    let (t1, y1) = points[segment + 1];
    y0 + (time - t0) * (y1 - y0) / (t1 - t0)
}

fn parse_state(value: &str) -> Result<SwitchState, LoadProfileYamlError> {
    match value.to_ascii_lowercase().as_str() {
        "on" => Ok(SwitchState::On),
        "off" => Ok(SwitchState::Off),
        "transition" => Ok(SwitchState::Transition),
        _ => Err(LoadProfileYamlError::InvalidState(value.to_string())),
    }
}

fn parse_interpolation(value: &str) -> Result<Interpolation, LoadProfileYamlError> {
    match value.to_ascii_lowercase().as_str() {
        "linear" => Ok(Interpolation::Linear),
        "hold" => Ok(Interpolation::Hold),
        _ => Err(LoadProfileYamlError::InvalidInterpolation(value.to_string())),
    }
}
