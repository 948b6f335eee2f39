//! Fixed-step classic Runge-Kutta integration.
//!
//! The system is evaluated four times per step, so any state-dependent
//! coefficients inside [`OdeSystem::derivatives`] are refreshed at every
//! evaluation point rather than once per step.

/// A first-order system `dy/dt = f(t, y)`.
pub trait OdeSystem {
    type Error;

    fn derivatives(&self, t: f64, y: &[f64], dydt: &mut [f64]) -> Result<(), Self::Error>;
}

/// RK4 stepper with scratch buffers reused between steps.
pub struct Rk4 {
    k1: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    probe: Vec<f64>,
}

impl Rk4 {
    pub fn new(dimension: usize) -> Self {
        Self {
            k1: vec![0.0; dimension],
            k2: vec![0.0; dimension],
            k3: vec![0.0; dimension],
            k4: vec![0.0; dimension],
            probe: vec![0.0; dimension],
        }
    }

    /// Advances `y` from `t` to `t + h` in place.
    pub fn step<S: OdeSystem>(
        &mut self,
        system: &S,
        t: f64,
        y: &mut [f64],
        h: f64,
    ) -> Result<(), S::Error> {
        let half = 0.5 * h;

        system.derivatives(t, y, &mut self.k1)?;
        offset(&mut self.probe, y, &self.k1, half);
        system.derivatives(t + half, &self.probe, &mut self.k2)?;
        offset(&mut self.probe, y, &self.k2, half);
        system.derivatives(t + half, &self.probe, &mut self.k3)?;
        offset(&mut self.probe, y, &self.k3, h);
        system.derivatives(t + h, &self.probe, &mut self.k4)?;

        for i in 0..y.len() {
            y[i] += h / 6.0 * (self.k1[i] + 2.0 * self.k2[i] + 2.0 * self.k3[i] + self.k4[i]);
        }
        Ok(())
    }
}

fn offset(target: &mut [f64], base: &[f64], slope: &[f64], h: f64) {
    for ((out, y), k) in target.iter_mut().zip(base).zip(slope) {
        *out = y + h * k;
    }
}
