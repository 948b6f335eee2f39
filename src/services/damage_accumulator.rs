use tracing::{debug, warn};

use crate::domain::damage::{CycleDamage, DamageReport, LifetimeEstimate};
use crate::domain::device::{DeviceParameters, LifetimeModel};
use crate::domain::thermal_cycle::ThermalCycle;
use crate::services::lifetime_error::{LifetimeError, Stage};

/// Boltzmann constant in eV/K.
pub const BOLTZMANN_EV: f64 = 8.617333262e-5;
const KELVIN_OFFSET: f64 = 273.15;

/// Coffin-Manson cycles to failure with an Arrhenius term on the mean
/// temperature, floored at one cycle.
pub fn cycles_to_failure(range: f64, mean_temperature: f64, model: &LifetimeModel) -> f64 {
    let mean_kelvin = mean_temperature + KELVIN_OFFSET;
    let cycles = model.prefactor
        * range.powf(-model.exponent)
        * (model.activation_energy / (BOLTZMANN_EV * mean_kelvin)).exp();
    cycles.max(1.0)
}

/// Miner's-rule damage of one mission made of `cycles`.
///
/// `mission_duration` is the length of the load profile the cycles came
/// from, used to turn the damage fraction into a time to failure.
pub fn accumulate(
    cycles: &[ThermalCycle],
    device: &DeviceParameters,
    mission_duration: f64,
) -> Result<DamageReport, LifetimeError> {
    check_model(device)?;
    if !mission_duration.is_finite() || mission_duration < 0.0 {
        return Err(LifetimeError::invalid_input(
            Stage::DamageAccumulation,
            "mission_duration",
            mission_duration,
            "must be finite and not negative",
        ));
    }

    let mut damaged = Vec::with_capacity(cycles.len());
    let mut skipped = 0usize;
    for (position, cycle) in cycles.iter().enumerate() {
        check_cycle(position, cycle)?;
        if cycle.range == 0.0 {
            skipped += 1;
            continue;
        }
        let n_f = cycles_to_failure(cycle.range, cycle.mean, &device.lifetime);
        damaged.push(CycleDamage {
            cycle: *cycle,
            cycles_to_failure: n_f,
            damage: cycle.weight / n_f,
        });
    }
    if skipped > 0 {
        warn!(
            device = %device.name,
            skipped,
            "zero-range cycles contribute no damage and were skipped"
        );
    }

    let damage_fraction: f64 = damaged.iter().map(|c| c.damage).sum();
    let lifetime = if damage_fraction > 0.0 {
        LifetimeEstimate::Finite {
            missions_to_failure: 1.0 / damage_fraction,
            seconds_to_failure: mission_duration / damage_fraction,
        }
    } else {
        LifetimeEstimate::NoAppreciableDamage
    };
    debug!(
        device = %device.name,
        cycles = damaged.len(),
        damage_fraction,
        "damage accumulated"
    );

    Ok(DamageReport {
        cycles: damaged,
        damage_fraction,
        mission_duration,
        lifetime,
    })
}

fn check_model(device: &DeviceParameters) -> Result<(), LifetimeError> {
    let model = &device.lifetime;
    if !(model.prefactor > 0.0 && model.prefactor.is_finite()) {
        return Err(LifetimeError::configuration(
            &device.name,
            "lifetime.prefactor",
            model.prefactor,
            "must be positive",
        ));
    }
    for (field, value) in [
        ("lifetime.exponent", model.exponent),
        ("lifetime.activation_energy", model.activation_energy),
    ] {
        if !value.is_finite() {
            return Err(LifetimeError::configuration(
                &device.name,
                field,
                value,
                "must be finite",
            ));
        }
    }
    Ok(())
}

fn check_cycle(position: usize, cycle: &ThermalCycle) -> Result<(), LifetimeError> {
    let invalid = |field: &str, value: f64, reason: &str| LifetimeError::InvalidInput {
        stage: Stage::DamageAccumulation,
        field: field.to_string(),
        sample_index: Some(position),
        timestamp: None,
        value,
        reason: reason.to_string(),
    };
    if !cycle.range.is_finite() || cycle.range < 0.0 {
        return Err(invalid("range", cycle.range, "must be finite and not negative"));
    }
    if !(cycle.weight > 0.0 && cycle.weight.is_finite()) {
        return Err(invalid("weight", cycle.weight, "must be positive"));
    }
    if !cycle.mean.is_finite() || cycle.mean <= -KELVIN_OFFSET {
        return Err(invalid("mean", cycle.mean, "must be above absolute zero"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::thermal_cycle::{FULL_CYCLE, HALF_CYCLE};
    use crate::test_support::single_stage_device;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn cycle(range: f64, mean: f64, weight: f64) -> ThermalCycle {
        ThermalCycle {
            range,
            mean,
            weight,
            from_index: 0,
            to_index: 1,
        }
    }

    #[test]
    fn cycles_to_failure_follows_coffin_manson_with_arrhenius_term() {
        let model = LifetimeModel {
            prefactor: 3.5e5,
            exponent: 5.1,
            activation_energy: 0.54,
        };

        let n_f = cycles_to_failure(10.0, 75.0, &model);

        let expected = 3.5e5 * 10f64.powf(-5.1) * (0.54 / (BOLTZMANN_EV * 348.15)).exp();
        assert!((n_f - expected).abs() / expected < 1e-12);
        assert!(cycles_to_failure(20.0, 75.0, &model) < n_f);
    }

    #[test]
    fn cycles_to_failure_is_floored_at_one() {
        let model = LifetimeModel {
            prefactor: 1.0,
            exponent: 5.0,
            activation_energy: 0.0,
        };
        assert_eq!(cycles_to_failure(100.0, 50.0, &model), 1.0);
    }

    #[test]
    fn half_cycles_count_half_damage() {
        let device = single_stage_device(1.0, 1.0, 0.1);

        let full = accumulate(&[cycle(30.0, 90.0, FULL_CYCLE)], &device, 10.0).unwrap();
        let half = accumulate(&[cycle(30.0, 90.0, HALF_CYCLE)], &device, 10.0).unwrap();

        assert!((half.damage_fraction * 2.0 - full.damage_fraction).abs() < 1e-15);
        assert!(
            (full.missions_to_failure() - 1.0 / full.damage_fraction).abs()
                / full.missions_to_failure()
                < 1e-12
        );
        assert!(
            (full.seconds_to_failure() - 10.0 / full.damage_fraction).abs()
                / full.seconds_to_failure()
                < 1e-12
        );
    }

    #[test]
    fn no_cycles_means_no_appreciable_damage() {
        let device = single_stage_device(1.0, 1.0, 0.1);

        let report = accumulate(&[], &device, 15.0).unwrap();

        assert_eq!(report.damage_fraction, 0.0);
        assert_eq!(report.lifetime, LifetimeEstimate::NoAppreciableDamage);
        assert!(report.seconds_to_failure().is_infinite());
    }

    #[test]
    fn zero_range_cycles_are_skipped() {
        let device = single_stage_device(1.0, 1.0, 0.1);

        let report = accumulate(
            &[cycle(0.0, 60.0, FULL_CYCLE), cycle(5.0, 60.0, HALF_CYCLE)],
            &device,
            1.0,
        )
        .unwrap();

        assert_eq!(report.cycles.len(), 1);
        assert_eq!(report.cycles[0].cycle.range, 5.0);
    }

    #[test]
    fn rejects_negative_range_with_cycle_position() {
        let device = single_stage_device(1.0, 1.0, 0.1);

        let err = accumulate(
            &[cycle(5.0, 60.0, FULL_CYCLE), cycle(-1.0, 60.0, FULL_CYCLE)],
            &device,
            1.0,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            LifetimeError::InvalidInput {
                stage: Stage::DamageAccumulation,
                ref field,
                sample_index: Some(1),
                ..
            } if field == "range"
        ));
    }

    #[test]
    fn adding_a_cycle_never_decreases_damage() {
        let device = single_stage_device(1.0, 1.0, 0.1);
        let mut rng = StdRng::seed_from_u64(2024);
        let mut cycles = Vec::new();
        let mut previous = 0.0;

        for _ in 0..200 {
            let weight = if rng.gen_bool(0.5) { FULL_CYCLE } else { HALF_CYCLE };
            cycles.push(cycle(
                rng.gen_range(0.01..120.0),
                rng.gen_range(-40.0..175.0),
                weight,
            ));

            let report = accumulate(&cycles, &device, 1.0).unwrap();
            assert!(report.damage_fraction >= previous);
            previous = report.damage_fraction;
        }
        assert!(previous > 0.0);
    }
}
