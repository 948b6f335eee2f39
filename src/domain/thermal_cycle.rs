pub const FULL_CYCLE: f64 = 1.0;
pub const HALF_CYCLE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalCycle {
    pub range: f64,
    pub mean: f64,
    pub weight: f64,
    /// Sample indices of the two turning points that define the cycle.
    pub from_index: usize,
    pub to_index: usize,
}

impl ThermalCycle {
    pub fn is_full(&self) -> bool {
        self.weight == FULL_CYCLE
    }
}
