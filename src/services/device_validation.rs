use crate::domain::device::DeviceParameters;
use crate::services::lifetime_error::LifetimeError;

const RANGE_PROBES: usize = 256;

/// Checks the invariants every simulation relies on.
///
/// Temperature-dependent resistances and capacitances must stay positive
/// for every temperature in `temperature_range` (inclusive, °C).
pub fn validate_device(
    device: &DeviceParameters,
    temperature_range: (f64, f64),
) -> Result<(), LifetimeError> {
    let name = device.name.as_str();
    let fail = |field: &str, value: f64, reason: &str| -> Result<(), LifetimeError> {
        Err(LifetimeError::configuration(name, field, value, reason))
    };

    if device.thermal_stages.is_empty() {
        return fail("thermal_stages", 0.0, "at least one thermal stage is required");
    }
    positive(name, "on_resistance.nominal", device.on_resistance.nominal)?;
    for (k, coefficient) in device.on_resistance.temp_coefficients.iter().enumerate() {
        finite(name, &format!("on_resistance.temp_coefficients[{k}]"), *coefficient)?;
    }
    positive(name, "switching.test_voltage", device.switching.test_voltage)?;
    positive(name, "switching.test_current", device.switching.test_current)?;
    non_negative(name, "switching.turn_on_energy", device.switching.turn_on_energy)?;
    non_negative(name, "switching.turn_off_energy", device.switching.turn_off_energy)?;
    finite(name, "switching.temp_coefficient", device.switching.temp_coefficient)?;
    non_negative(name, "output_capacitance", device.output_capacitance)?;
    if let Some(energy) = &device.output_energy {
        non_negative(name, "output_energy.nominal", energy.nominal)?;
        finite(name, "output_energy.temp_coefficient", energy.temp_coefficient)?;
    }
    non_negative(name, "reverse_recovery.charge", device.reverse_recovery.charge)?;
    finite(name, "reverse_recovery.temp_coefficient", device.reverse_recovery.temp_coefficient)?;
    non_negative(name, "surface_area", device.surface_area)?;
    non_negative(name, "cooling_coefficient", device.cooling_coefficient)?;
    positive(name, "max_temperature", device.max_temperature)?;
    positive(name, "lifetime.prefactor", device.lifetime.prefactor)?;
    non_negative(name, "lifetime.exponent", device.lifetime.exponent)?;
    finite(name, "lifetime.activation_energy", device.lifetime.activation_energy)?;

    for (i, stage) in device.thermal_stages.iter().enumerate() {
        positive(name, &format!("thermal_stages[{i}].resistance"), stage.resistance)?;
        positive(name, &format!("thermal_stages[{i}].capacitance"), stage.capacitance)?;
        finite(
            name,
            &format!("thermal_stages[{i}].resistance_temp_coefficient"),
            stage.resistance_temp_coefficient,
        )?;
        finite(
            name,
            &format!("thermal_stages[{i}].capacitance_temp_coefficient"),
            stage.capacitance_temp_coefficient,
        )?;
    }

    let (low, high) = temperature_range;
    for temperature in probe_temperatures(low, high) {
        let on_resistance = device.on_resistance.at(temperature);
        if !(on_resistance > 0.0) {
            return fail(
                "on_resistance.temp_coefficients",
                on_resistance,
                &format!("on-resistance is not positive at {temperature:.1} °C"),
            );
        }
        for (i, stage) in device.thermal_stages.iter().enumerate() {
            let resistance = stage.resistance_at(temperature);
            if !(resistance > 0.0) {
                return fail(
                    &format!("thermal_stages[{i}].resistance_temp_coefficient"),
                    stage.resistance_temp_coefficient,
                    &format!("thermal resistance is not positive at {temperature:.1} °C"),
                );
            }
            let capacitance = stage.capacitance_at(temperature);
            if !(capacitance > 0.0) {
                return fail(
                    &format!("thermal_stages[{i}].capacitance_temp_coefficient"),
                    stage.capacitance_temp_coefficient,
                    &format!("thermal capacitance is not positive at {temperature:.1} °C"),
                );
            }
        }
    }
    Ok(())
}

fn probe_temperatures(low: f64, high: f64) -> impl Iterator<Item = f64> {
    let span = high - low;
    (0..=RANGE_PROBES).map(move |i| low + span * i as f64 / RANGE_PROBES as f64)
}

fn finite(device: &str, field: &str, value: f64) -> Result<(), LifetimeError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(LifetimeError::configuration(device, field, value, "must be finite"))
    }
}

fn positive(device: &str, field: &str, value: f64) -> Result<(), LifetimeError> {
    finite(device, field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(LifetimeError::configuration(device, field, value, "must be positive"))
    }
}

fn non_negative(device: &str, field: &str, value: f64) -> Result<(), LifetimeError> {
    finite(device, field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(LifetimeError::configuration(device, field, value, "must not be negative"))
    }
}
