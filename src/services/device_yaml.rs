use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::device::{
    DeviceParameters, LifetimeModel, OnResistance, OutputEnergy, ReverseRecovery,
    SwitchingEnergy, ThermalStage,
};

#[derive(Error, Debug)]
pub enum DeviceYamlError {
    #[error("failed to read device catalog {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse device catalog: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("device catalog contains no devices")]
    EmptyCatalog,
    #[error("device catalog contains {0} more than once")]
    DuplicateName(String),
    #[error("unknown device: {0}")]
    UnknownDevice(String),
}

#[derive(Debug, Deserialize)]
struct CatalogRecord {
    devices: Vec<DeviceRecord>,
}

#[derive(Debug, Deserialize)]
struct DeviceRecord {
    name: String,
    on_resistance: OnResistanceRecord,
    switching: SwitchingRecord,
    #[serde(default)]
    output_capacitance: f64,
    output_energy: Option<CoefficientRecord>,
    reverse_recovery: Option<ReverseRecoveryRecord>,
    thermal_stages: Vec<ThermalStageRecord>,
    #[serde(default)]
    surface_area: f64,
    #[serde(default)]
    cooling_coefficient: f64,
    max_temperature: f64,
    lifetime: LifetimeRecord,
}

#[derive(Debug, Deserialize)]
struct OnResistanceRecord {
    nominal: f64,
    #[serde(default)]
    temp_coefficients: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct SwitchingRecord {
    turn_on_energy: f64,
    turn_off_energy: f64,
    test_voltage: f64,
    test_current: f64,
    #[serde(default)]
    temp_coefficient: f64,
}

#[derive(Debug, Deserialize)]
struct CoefficientRecord {
    nominal: f64,
    #[serde(default)]
    temp_coefficient: f64,
}

#[derive(Debug, Deserialize)]
struct ReverseRecoveryRecord {
    charge: f64,
    #[serde(default)]
    temp_coefficient: f64,
}

#[derive(Debug, Deserialize)]
struct ThermalStageRecord {
    resistance: f64,
    capacitance: f64,
    #[serde(default)]
    resistance_temp_coefficient: f64,
    #[serde(default)]
    capacitance_temp_coefficient: f64,
}

#[derive(Debug, Deserialize)]
struct LifetimeRecord {
    prefactor: f64,
    exponent: f64,
    activation_energy: f64,
}

pub fn load_device_catalog_from_yaml_file<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<DeviceParameters>, DeviceYamlError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| DeviceYamlError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    deserialize_device_catalog_from_yaml_str(&contents)
}

/// Parses a `devices:` catalog. Numeric invariants are checked when a
/// device is simulated; this only rejects structural problems.
pub fn deserialize_device_catalog_from_yaml_str(
    input: &str,
) -> Result<Vec<DeviceParameters>, DeviceYamlError> {
    let record: CatalogRecord = serde_yaml::from_str(input)?;
    if record.devices.is_empty() {
        return Err(DeviceYamlError::EmptyCatalog);
    }

    let mut devices: Vec<DeviceParameters> = Vec::with_capacity(record.devices.len());
    for device in record.devices {
        if devices.iter().any(|d| d.name == device.name) {
            return Err(DeviceYamlError::DuplicateName(device.name));
        }
        devices.push(device_from_record(device));
    }
    Ok(devices)
}

/// Keeps the devices named in `names`, in catalog order. An empty
/// selection keeps the whole catalog.
pub fn select_devices(
    catalog: Vec<DeviceParameters>,
    names: &[String],
) -> Result<Vec<DeviceParameters>, DeviceYamlError> {
    if names.is_empty() {
        return Ok(catalog);
    }
    if let Some(missing) = names
        .iter()
        .find(|name| !catalog.iter().any(|device| &device.name == *name))
    {
        return Err(DeviceYamlError::UnknownDevice(missing.clone()));
    }
    Ok(catalog
        .into_iter()
        .filter(|device| names.contains(&device.name))
        .collect())
}

fn device_from_record(record: DeviceRecord) -> DeviceParameters {
    DeviceParameters {
        name: record.name,
        on_resistance: OnResistance {
            nominal: record.on_resistance.nominal,
            temp_coefficients: record.on_resistance.temp_coefficients,
        },
        switching: SwitchingEnergy {
            turn_on_energy: record.switching.turn_on_energy,
            turn_off_energy: record.switching.turn_off_energy,
            test_voltage: record.switching.test_voltage,
            test_current: record.switching.test_current,
            temp_coefficient: record.switching.temp_coefficient,
        },
        output_capacitance: record.output_capacitance,
        output_energy: record.output_energy.map(|energy| OutputEnergy {
            nominal: energy.nominal,
            temp_coefficient: energy.temp_coefficient,
        }),
        reverse_recovery: record
            .reverse_recovery
            .map(|rr| ReverseRecovery {
                charge: rr.charge,
                temp_coefficient: rr.temp_coefficient,
            })
            .unwrap_or(ReverseRecovery {
                charge: 0.0,
                temp_coefficient: 0.0,
            }),
        thermal_stages: record
            .thermal_stages
            .into_iter()
            .map(|stage| ThermalStage {
                resistance: stage.resistance,
                capacitance: stage.capacitance,
                resistance_temp_coefficient: stage.resistance_temp_coefficient,
                capacitance_temp_coefficient: stage.capacitance_temp_coefficient,
            })
            .collect(),
        surface_area: record.surface_area,
        cooling_coefficient: record.cooling_coefficient,
        max_temperature: record.max_temperature,
        lifetime: LifetimeModel {
            prefactor: record.lifetime.prefactor,
            exponent: record.lifetime.exponent,
            activation_energy: record.lifetime.activation_energy,
        },
    }
}
