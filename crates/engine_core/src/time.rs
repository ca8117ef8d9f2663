//! Frame timing for the animation loop.
//!
//! Hosts hand the engine a timestamp per frame callback (milliseconds, as a
//! browser's animation frame would). The clock turns those into deltas.

use std::time::Duration;

/// Longest step the simulation will take in one frame. A tab that was
/// backgrounded for a minute should not teleport every bird off screen.
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(100);

/// Tracks frame timing from host-provided timestamps.
#[derive(Debug, Clone)]
pub struct FrameClock {
    /// Timestamp of the first frame, in milliseconds.
    start_ms: Option<f64>,
    /// Timestamp of the last frame, in milliseconds.
    last_ms: Option<f64>,
    /// Duration of the last frame (clamped).
    delta: Duration,
    /// Total elapsed time since the first frame.
    elapsed: Duration,
    /// Frame count since start.
    frame_count: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    /// Create a clock that has not seen a frame yet.
    pub fn new() -> Self {
        Self {
            start_ms: None,
            last_ms: None,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Advance to the frame stamped `now_ms`.
    ///
    /// The first frame has a zero delta. Timestamps that go backwards are
    /// treated as a zero-length frame.
    pub fn update(&mut self, now_ms: f64) {
        let start = *self.start_ms.get_or_insert(now_ms);
        let raw = match self.last_ms {
            Some(last) if now_ms >= last => now_ms - last,
            Some(last) => {
                log::trace!("frame timestamp went backwards ({} < {})", now_ms, last);
                0.0
            }
            None => 0.0,
        };
        self.delta = Duration::from_secs_f64(raw / 1000.0).min(MAX_FRAME_DELTA);
        self.last_ms = Some(now_ms.max(self.last_ms.unwrap_or(now_ms)));
        self.elapsed = Duration::from_secs_f64(((now_ms - start) / 1000.0).max(0.0));
        self.frame_count += 1;
    }

    /// Get the delta time in seconds.
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Get the delta time as a Duration.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Get total elapsed time in seconds.
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Get the current frame count.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the current FPS (averaged over last frame).
    pub fn fps(&self) -> f32 {
        if self.delta.as_secs_f32() > 0.0 {
            1.0 / self.delta.as_secs_f32()
        } else {
            0.0
        }
    }
}
