/// Virtual seconds added per rendered frame.
pub const TICK_SECONDS: f64 = 0.016;

/// Frame-driven animation time shared by every effect and both render paths.
///
/// Time is derived from an integer tick count so that `k` ticks always read back as
/// `0.016 * k` with no accumulated rounding. Animation speed follows the achieved frame
/// rate rather than wall time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnimationClock {
    ticks: u64,
}

impl AnimationClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances one frame and returns the new time.
    pub fn tick(&mut self) -> f32 {
        self.ticks += 1;
        self.time()
    }

    pub fn time(&self) -> f32 {
        (self.ticks as f64 * TICK_SECONDS) as f32
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn reset(&mut self) {
        self.ticks = 0;
    }
}
