/// Temperature at which every nominal device value is specified (°C).
pub const REFERENCE_TEMPERATURE: f64 = 25.0;

#[derive(Debug, Clone, PartialEq)]
pub struct OnResistance {
    pub nominal: f64,
    /// Polynomial coefficients in `(T - 25)`, lowest order first.
    pub temp_coefficients: Vec<f64>,
}

impl OnResistance {
    pub fn at(&self, temperature: f64) -> f64 {
        let delta = temperature - REFERENCE_TEMPERATURE;
        let mut power = 1.0;
        let mut factor = 1.0;
        for coefficient in &self.temp_coefficients {
            power *= delta;
            factor += coefficient * power;
        }
        self.nominal * factor
    }
}

/// Energy per switching event measured at `test_voltage`/`test_current`.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchingEnergy {
    pub turn_on_energy: f64,
    pub turn_off_energy: f64,
    pub test_voltage: f64,
    pub test_current: f64,
    pub temp_coefficient: f64,
}

impl SwitchingEnergy {
    pub fn time_factor(&self, temperature: f64) -> f64 {
        linear_factor(self.temp_coefficient, temperature)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputEnergy {
    pub nominal: f64,
    pub temp_coefficient: f64,
}

impl OutputEnergy {
    pub fn at(&self, temperature: f64) -> f64 {
        self.nominal * linear_factor(self.temp_coefficient, temperature)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReverseRecovery {
    pub charge: f64,
    pub temp_coefficient: f64,
}

impl ReverseRecovery {
    pub fn charge_at(&self, temperature: f64) -> f64 {
        self.charge * linear_factor(self.temp_coefficient, temperature)
    }
}

/// One lumped RC pair of the junction-to-ambient network.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalStage {
    pub resistance: f64,
    pub capacitance: f64,
    pub resistance_temp_coefficient: f64,
    pub capacitance_temp_coefficient: f64,
}

impl ThermalStage {
    pub fn new(resistance: f64, capacitance: f64) -> Self {
        Self {
            resistance,
            capacitance,
            resistance_temp_coefficient: 0.0,
            capacitance_temp_coefficient: 0.0,
        }
    }

    pub fn resistance_at(&self, temperature: f64) -> f64 {
        self.resistance * linear_factor(self.resistance_temp_coefficient, temperature)
    }

    pub fn capacitance_at(&self, temperature: f64) -> f64 {
        self.capacitance * linear_factor(self.capacitance_temp_coefficient, temperature)
    }
}

/// Coffin-Manson constants: `N_f = A * dT^-n * exp(Ea / (k * T_mean))`.
#[derive(Debug, Clone, PartialEq)]
pub struct LifetimeModel {
    pub prefactor: f64,
    pub exponent: f64,
    /// Activation energy in eV.
    pub activation_energy: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceParameters {
    pub name: String,
    pub on_resistance: OnResistance,
    pub switching: SwitchingEnergy,
    pub output_capacitance: f64,
    pub output_energy: Option<OutputEnergy>,
    pub reverse_recovery: ReverseRecovery,
    pub thermal_stages: Vec<ThermalStage>,
    pub surface_area: f64,
    pub cooling_coefficient: f64,
    /// Absolute maximum junction temperature rating (°C).
    pub max_temperature: f64,
    pub lifetime: LifetimeModel,
}

impl DeviceParameters {
    /// Heat transfer coefficient of the case-to-ambient cooling path (W/K).
    pub fn cooling_conductance(&self) -> f64 {
        self.surface_area * self.cooling_coefficient
    }

    /// Junction-to-ambient resistance with every node at `temperature`.
    ///
    /// The last stage sits in parallel with the cooling path, so with no
    /// cooling this is the plain sum of stage resistances.
    pub fn steady_state_resistance(&self, temperature: f64) -> f64 {
        let Some((last, upstream)) = self.thermal_stages.split_last() else {
            return 0.0;
        };
        let upstream_sum: f64 = upstream
            .iter()
            .map(|stage| stage.resistance_at(temperature))
            .sum();
        let last_conductance = 1.0 / last.resistance_at(temperature) + self.cooling_conductance();
        upstream_sum + 1.0 / last_conductance
    }
}

fn linear_factor(coefficient: f64, temperature: f64) -> f64 {
    1.0 + coefficient * (temperature - REFERENCE_TEMPERATURE)
}
