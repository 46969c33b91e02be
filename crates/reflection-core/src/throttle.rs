//! Fractional-frequency render throttling.

/// Smallest resolution scale a pass may render at.
pub const MIN_RESOLUTION_SCALE: f32 = 0.01;

/// Changes of the resolution scale smaller than this are ignored.
pub const RESOLUTION_SCALE_EPSILON: f32 = 1e-4;

/// Decides on which frames an expensive pass renders, and at what scale.
///
/// Each [`tick`](Self::tick) adds `frequency` to an accumulator; the pass
/// fires once the accumulator reaches one, which resets it to zero.
/// `tick` must be called exactly once per host frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Throttle {
    frequency: f32,
    accumulator: f32,
    resolution_scale: f32,
}

impl Throttle {
    /// Creates a throttle firing on `frequency` of all frames.
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency: frequency.clamp(0.0, 1.0),
            accumulator: 0.0,
            resolution_scale: 1.0,
        }
    }

    /// Advances one frame and returns whether the pass fires on it.
    pub fn tick(&mut self) -> bool {
        self.accumulator += self.frequency;
        if self.accumulator >= 1.0 {
            self.accumulator = 0.0;
            true
        } else {
            false
        }
    }

    /// Clears the accumulator.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }

    /// Returns the fraction of frames that fire.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Sets the fraction of frames that fire, clamped to `[0, 1]`.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency.clamp(0.0, 1.0);
    }

    /// Returns the current accumulator value.
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Returns the output resolution scale.
    pub fn resolution_scale(&self) -> f32 {
        self.resolution_scale
    }

    /// Sets the output resolution scale, clamped to `[0.01, 1]`.
    ///
    /// Returns `true` when the stored scale changed, i.e. when targets need
    /// to be resized.
    pub fn set_resolution_scale(&mut self, scale: f32) -> bool {
        let scale = scale.clamp(MIN_RESOLUTION_SCALE, 1.0);
        if (self.resolution_scale - scale).abs() > RESOLUTION_SCALE_EPSILON {
            self.resolution_scale = scale;
            true
        } else {
            false
        }
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(1.0)
    }
}
