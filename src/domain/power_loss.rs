/// Instantaneous dissipation of one sample, split by mechanism (W).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PowerLossBreakdown {
    pub conduction: f64,
    pub turn_on: f64,
    pub turn_off: f64,
    pub capacitive: f64,
    pub reverse_recovery: f64,
}

impl PowerLossBreakdown {
    pub fn total(&self) -> f64 {
        self.conduction + self.turn_on + self.turn_off + self.capacitive + self.reverse_recovery
    }
}
