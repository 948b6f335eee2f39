use super::thermal_cycle::ThermalCycle;

const SECONDS_PER_YEAR: f64 = 365.25 * 24.0 * 3600.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleDamage {
    pub cycle: ThermalCycle,
    pub cycles_to_failure: f64,
    pub damage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LifetimeEstimate {
    Finite {
        missions_to_failure: f64,
        seconds_to_failure: f64,
    },
    /// Damage fraction is zero; the mission causes no measurable fatigue.
    NoAppreciableDamage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DamageReport {
    pub cycles: Vec<CycleDamage>,
    pub damage_fraction: f64,
    pub mission_duration: f64,
    pub lifetime: LifetimeEstimate,
}

impl DamageReport {
    pub fn missions_to_failure(&self) -> f64 {
        match self.lifetime {
            LifetimeEstimate::Finite {
                missions_to_failure,
                ..
            } => missions_to_failure,
            LifetimeEstimate::NoAppreciableDamage => f64::INFINITY,
        }
    }

    pub fn seconds_to_failure(&self) -> f64 {
        match self.lifetime {
            LifetimeEstimate::Finite {
                seconds_to_failure, ..
            } => seconds_to_failure,
            LifetimeEstimate::NoAppreciableDamage => f64::INFINITY,
        }
    }

    pub fn years_to_failure(&self) -> f64 {
        self.seconds_to_failure() / SECONDS_PER_YEAR
    }

    pub fn total_cycle_weight(&self) -> f64 {
        self.cycles.iter().map(|c| c.cycle.weight).sum()
    }

    pub fn sum_cycles_to_failure(&self) -> f64 {
        self.cycles.iter().map(|c| c.cycles_to_failure).sum()
    }
}
