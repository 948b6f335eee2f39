use tracing::debug;

use crate::domain::thermal_cycle::{FULL_CYCLE, HALF_CYCLE, ThermalCycle};
use crate::services::lifetime_error::{LifetimeError, Stage};

#[derive(Debug, Clone, Default)]
pub struct RainflowOptions {
    /// Cycles with a range below this threshold (K) are dropped.
    pub min_range: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurningPoint {
    pub index: usize,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RainflowCount {
    /// Closed cycles in the order they closed, followed by the residual
    /// half-cycles in series order.
    pub cycles: Vec<ThermalCycle>,
    /// Turning points left on the stack once no further cycle closes.
    pub residue: Vec<TurningPoint>,
}

impl RainflowCount {
    pub fn full_cycles(&self) -> impl Iterator<Item = &ThermalCycle> {
        self.cycles.iter().filter(|cycle| cycle.is_full())
    }

    pub fn half_cycles(&self) -> impl Iterator<Item = &ThermalCycle> {
        self.cycles.iter().filter(|cycle| !cycle.is_full())
    }
}

/// Local extrema of `series`. Monotonic runs collapse to their end points,
/// plateaus to their first sample, and both ends of the series are kept.
pub fn turning_points(series: &[f64]) -> Vec<TurningPoint> {
    let mut points: Vec<TurningPoint> = Vec::new();
    for (index, &value) in series.iter().enumerate() {
        let point = TurningPoint { index, value };
        let n = points.len();
        if n == 0 {
            points.push(point);
            continue;
        }
        let last = points[n - 1];
        if value == last.value {
            continue;
        }
        if n >= 2 && (last.value - points[n - 2].value) * (value - last.value) > 0.0 {
            points[n - 1] = point;
        } else {
            points.push(point);
        }
    }
    points
}

/// Four-point rainflow counting over `series`.
///
/// Whenever the inner range of the last four turning points is no larger
/// than both outer ranges, the inner pair closes a full cycle and leaves the
/// stack. Ties close immediately, so among equal ranges the cycle formed
/// first is counted first. Whatever remains on the stack is emitted as
/// half-cycles.
pub fn count(series: &[f64], options: &RainflowOptions) -> Result<RainflowCount, LifetimeError> {
    if let Some((index, value)) = series
        .iter()
        .enumerate()
        .find(|(_, value)| !value.is_finite())
    {
        return Err(LifetimeError::InvalidInput {
            stage: Stage::Rainflow,
            field: "temperature".to_string(),
            sample_index: Some(index),
            timestamp: None,
            value: *value,
            reason: "must be finite".to_string(),
        });
    }

    let mut cycles = Vec::new();
    let mut stack: Vec<TurningPoint> = Vec::new();
    for point in turning_points(series) {
        stack.push(point);
        while stack.len() >= 4 {
            let n = stack.len();
            let (a, b, c, d) = (stack[n - 4], stack[n - 3], stack[n - 2], stack[n - 1]);
            let inner = (b.value - c.value).abs();
            if inner <= (a.value - b.value).abs() && inner <= (c.value - d.value).abs() {
                cycles.push(cycle_between(b, c, FULL_CYCLE));
                stack.drain(n - 3..n - 1);
            } else {
                break;
            }
        }
    }
    let closed = cycles.len();
    cycles.extend(
        stack
            .windows(2)
            .map(|pair| cycle_between(pair[0], pair[1], HALF_CYCLE)),
    );

    let before_filter = cycles.len();
    cycles.retain(|cycle| cycle.range >= options.min_range);
    debug!(
        samples = series.len(),
        full_cycles = closed,
        half_cycles = before_filter - closed,
        dropped = before_filter - cycles.len(),
        "rainflow counting finished"
    );

    Ok(RainflowCount {
        cycles,
        residue: stack,
    })
}

/// Thermal cycles of `series`; see [`count`].
pub fn extract(series: &[f64], options: &RainflowOptions) -> Result<Vec<ThermalCycle>, LifetimeError> {
    count(series, options).map(|counted| counted.cycles)
}

fn cycle_between(from: TurningPoint, to: TurningPoint, weight: f64) -> ThermalCycle {
    ThermalCycle {
        range: (from.value - to.value).abs(),
        mean: 0.5 * (from.value + to.value),
        weight,
        from_index: from.index,
        to_index: to.index,
    }
}
