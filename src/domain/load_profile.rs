#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    On,
    Off,
    Transition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Voltage and current ramp linearly between samples.
    #[default]
    Linear,
    /// Every sample holds until the next one (square waves, PWM blocks).
    Hold,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadSample {
    pub time: f64,
    pub voltage: f64,
    pub current: f64,
    pub state: SwitchState,
    pub switching_frequency: Option<f64>,
}

impl LoadSample {
    pub fn new(time: f64, voltage: f64, current: f64, state: SwitchState) -> Self {
        Self {
            time,
            voltage,
            current,
            state,
            switching_frequency: None,
        }
    }

    pub fn frequency(&self) -> f64 {
        self.switching_frequency.unwrap_or(0.0)
    }
}

/// Electrical operating point between two samples, as seen by the loss model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingPoint {
    pub voltage: f64,
    pub current: f64,
    pub state: SwitchState,
    pub switching_frequency: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadProfile {
    pub name: String,
    pub samples: Vec<LoadSample>,
    pub interpolation: Interpolation,
}

impl LoadProfile {
    pub fn new(name: &str, samples: Vec<LoadSample>) -> Self {
        Self {
            name: name.to_string(),
            samples,
            interpolation: Interpolation::default(),
        }
    }

    /// Square-wave current load: `on_current` for the first half of every
    /// period, zero for the second half, `periods` periods long.
    pub fn square_wave(on_current: f64, voltage: f64, period: f64, periods: usize) -> Self {
        let half = period / 2.0;
        let mut samples = Vec::with_capacity(2 * periods + 1);
        for k in 0..periods {
            let start = k as f64 * period;
            samples.push(LoadSample::new(start, voltage, on_current, SwitchState::On));
            samples.push(LoadSample::new(start + half, voltage, 0.0, SwitchState::Off));
        }
        samples.push(LoadSample::new(
            periods as f64 * period,
            voltage,
            0.0,
            SwitchState::Off,
        ));
        Self {
            name: "square-wave".to_string(),
            samples,
            interpolation: Interpolation::Hold,
        }
    }

    pub fn duration(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.time - first.time,
            _ => 0.0,
        }
    }

    /// Operating point at `time` inside the interval that starts at sample
    /// `index`. State and frequency are taken from the left sample.
    pub fn operating_point(&self, index: usize, time: f64) -> OperatingPoint {
        let left = &self.samples[index];
        let (voltage, current) = match (self.interpolation, self.samples.get(index + 1)) {
            (Interpolation::Linear, Some(right)) => {
                let span = right.time - left.time;
                let fraction = ((time - left.time) / span).clamp(0.0, 1.0);
                (
                    left.voltage + fraction * (right.voltage - left.voltage),
                    left.current + fraction * (right.current - left.current),
                )
            }
            _ => (left.voltage, left.current),
        };
        OperatingPoint {
            voltage,
            current,
            state: left.state,
            switching_frequency: left.frequency(),
        }
    }

    /// Repeats the profile `count` times back to back. The first sample of
    /// every repetition after the first is dropped because it coincides with
    /// the last sample of the previous one.
    pub fn repeated(&self, count: usize) -> Self {
        if count <= 1 || self.samples.len() < 2 {
            return self.clone();
        }
        let duration = self.duration();
        let mut samples = self.samples.clone();
        for repetition in 1..count {
            let offset = repetition as f64 * duration;
            samples.extend(self.samples.iter().skip(1).map(|sample| LoadSample {
                time: sample.time + offset,
                ..sample.clone()
            }));
        }
        Self {
            name: self.name.clone(),
            samples,
            interpolation: self.interpolation,
        }
    }
}
