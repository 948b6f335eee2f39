use crate::domain::device::{
    DeviceParameters, LifetimeModel, OnResistance, ReverseRecovery, SwitchingEnergy, ThermalStage,
};
use crate::domain::load_profile::{Interpolation, LoadProfile, LoadSample, SwitchState};

// A device with one temperature-independent RC stage and no switching,
// capacitive or cooling contributions, so analytical RC results apply.
pub fn single_stage_device(resistance: f64, capacitance: f64, on_resistance: f64) -> DeviceParameters {
    DeviceParameters {
        name: "test-device".to_string(),
        on_resistance: OnResistance {
            nominal: on_resistance,
            temp_coefficients: vec![],
        },
        switching: SwitchingEnergy {
            turn_on_energy: 0.0,
            turn_off_energy: 0.0,
            test_voltage: 400.0,
            test_current: 10.0,
            temp_coefficient: 0.0,
        },
        output_capacitance: 0.0,
        output_energy: None,
        reverse_recovery: ReverseRecovery {
            charge: 0.0,
            temp_coefficient: 0.0,
        },
        thermal_stages: vec![ThermalStage::new(resistance, capacitance)],
        surface_area: 0.0,
        cooling_coefficient: 0.0,
        max_temperature: 175.0,
        lifetime: LifetimeModel {
            prefactor: 3.5e5,
            exponent: 5.1,
            activation_energy: 0.54,
        },
    }
}

pub fn switching_device() -> DeviceParameters {
    let mut device = single_stage_device(1.0, 0.5, 0.1);
    device.switching = SwitchingEnergy {
        turn_on_energy: 50e-6,
        turn_off_energy: 70e-6,
        test_voltage: 400.0,
        test_current: 10.0,
        temp_coefficient: 0.004,
    };
    device.output_capacitance = 150e-12;
    device.reverse_recovery = ReverseRecovery {
        charge: 0.8e-6,
        temp_coefficient: 0.0025,
    };
    device
}

pub fn constant_current_profile(current: f64, duration: f64, sample_count: usize) -> LoadProfile {
    let samples = (0..sample_count)
        .map(|i| {
            let time = duration * i as f64 / (sample_count - 1) as f64;
            LoadSample::new(time, 48.0, current, SwitchState::On)
        })
        .collect();
    LoadProfile {
        name: "constant".to_string(),
        samples,
        interpolation: Interpolation::Hold,
    }
}
