use super::power_loss::PowerLossBreakdown;

/// Node temperatures of the thermal network (°C). Stage 0 is the junction.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalState {
    pub stages: Vec<f64>,
}

impl ThermalState {
    pub fn uniform(temperature: f64, stage_count: usize) -> Self {
        Self {
            stages: vec![temperature; stage_count],
        }
    }

    pub fn junction(&self) -> f64 {
        self.stages.first().copied().unwrap_or(f64::NAN)
    }
}

/// One recorded sample of a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct TracePoint {
    pub sample_index: usize,
    pub time: f64,
    pub voltage: f64,
    pub current: f64,
    pub state: ThermalState,
    pub losses: PowerLossBreakdown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureExcursion {
    pub first_sample: usize,
    pub first_timestamp: f64,
    pub peak_temperature: f64,
    pub samples_above: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimulationTrace {
    pub points: Vec<TracePoint>,
    pub excursion: Option<TemperatureExcursion>,
    pub substeps: usize,
}

impl SimulationTrace {
    pub fn junction_temperatures(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.state.junction()).collect()
    }
}
