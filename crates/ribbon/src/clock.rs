/// Snapshot of the animation clock handed to each render tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Simulated time in seconds.
    pub seconds: f32,
    /// Monotonic tick counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Abstraction over where animation time comes from.
pub trait TimeSource: Send {
    /// Resets the source to its initial state.
    fn reset(&mut self);
    /// Produces a time sample for the next tick.
    fn sample(&mut self) -> TimeSample;
}

/// Deterministic source advancing by `1 / fps` per tick.
#[derive(Debug, Clone, Copy)]
pub struct FixedStepTimeSource {
    step: f32,
    frame: u64,
}

impl FixedStepTimeSource {
    /// Non-positive rates fall back to 60 ticks per second.
    pub fn new(fps: f32) -> Self {
        let fps = if fps > 0.0 { fps } else { 60.0 };
        Self {
            step: 1.0 / fps,
            frame: 0,
        }
    }

    pub fn step(&self) -> f32 {
        self.step
    }
}

impl TimeSource for FixedStepTimeSource {
    fn reset(&mut self) {
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.frame as f32 * self.step, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_step_advances_monotonically() {
        let mut source = FixedStepTimeSource::new(4.0);
        let samples: Vec<_> = (0..3).map(|_| source.sample()).collect();
        assert_eq!(samples[0], TimeSample::new(0.0, 0));
        assert_eq!(samples[1], TimeSample::new(0.25, 1));
        assert_eq!(samples[2], TimeSample::new(0.5, 2));

        source.reset();
        assert_eq!(source.sample().frame_index, 0);
    }

    #[test]
    fn fixed_step_rejects_non_positive_rates() {
        assert!((FixedStepTimeSource::new(0.0).step() - 1.0 / 60.0).abs() < 1e-9);
    }
}
