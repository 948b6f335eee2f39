use crate::domain::device::DeviceParameters;
use crate::domain::load_profile::SwitchState;
use crate::domain::power_loss::PowerLossBreakdown;
use crate::services::lifetime_error::{LifetimeError, Stage};

/// Instantaneous power dissipation of `device` at one operating point.
///
/// Conduction loss is `I^2 * R_on(T)`. Turn-on and turn-off losses are
/// charged only on `Transition` samples, as energy per switch scaled to the
/// operating voltage and current and amortized over the switching frequency.
/// Capacitive and reverse-recovery losses apply whenever a switching
/// frequency is present.
pub fn compute_losses(
    voltage: f64,
    current: f64,
    state: SwitchState,
    switching_frequency: f64,
    junction_temperature: f64,
    device: &DeviceParameters,
) -> Result<PowerLossBreakdown, LifetimeError> {
    check_finite("voltage", voltage)?;
    check_finite("current", current)?;
    check_finite("junction_temperature", junction_temperature)?;
    check_finite("switching_frequency", switching_frequency)?;
    if switching_frequency < 0.0 {
        return Err(LifetimeError::invalid_input(
            Stage::PowerLoss,
            "switching_frequency",
            switching_frequency,
            "must not be negative",
        ));
    }

    let conduction = current * current * device.on_resistance.at(junction_temperature);

    let abs_voltage = voltage.abs();
    let abs_current = current.abs();

    let (turn_on, turn_off) = if state == SwitchState::Transition {
        let switching = &device.switching;
        let scale = (abs_voltage / switching.test_voltage)
            * (abs_current / switching.test_current)
            * switching.time_factor(junction_temperature)
            * switching_frequency;
        (
            switching.turn_on_energy * scale,
            switching.turn_off_energy * scale,
        )
    } else {
        (0.0, 0.0)
    };

    let (capacitive, reverse_recovery) = if switching_frequency > 0.0 {
        let stored = 0.5 * device.output_capacitance * voltage * voltage
            + device
                .output_energy
                .as_ref()
                .map(|energy| energy.at(junction_temperature))
                .unwrap_or(0.0);
        let recovery = device.reverse_recovery.charge_at(junction_temperature) * abs_voltage;
        (stored * switching_frequency, recovery * switching_frequency)
    } else {
        (0.0, 0.0)
    };

    Ok(PowerLossBreakdown {
        conduction,
        turn_on,
        turn_off,
        capacitive,
        reverse_recovery,
    })
}

fn check_finite(field: &str, value: f64) -> Result<(), LifetimeError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(LifetimeError::invalid_input(
            Stage::PowerLoss,
            field,
            value,
            "must be finite",
        ))
    }
}
