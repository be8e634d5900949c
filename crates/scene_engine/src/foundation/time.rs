//! Frame timing
//!
//! [`FrameClock`] turns wall clock time into the [`FrameUpdateInfo`] and
//! [`FrameRenderInfo`] values the scene entry points consume.

use std::time::Instant;

use crate::ecs::{FrameRenderInfo, FrameUpdateInfo};

/// Monotonic frame counter with delta timing
pub struct FrameClock {
    start: Instant,
    last_frame: Instant,
    frame_number: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    /// Create a clock positioned before frame 0
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            frame_number: 0,
        }
    }

    /// Advance to the next frame and return its update info
    pub fn tick(&mut self) -> FrameUpdateInfo {
        let now = Instant::now();
        let info = FrameUpdateInfo {
            frame_number: self.frame_number,
            delta_seconds: now.duration_since(self.last_frame).as_secs_f32(),
            total_seconds: now.duration_since(self.start).as_secs_f64(),
        };
        self.last_frame = now;
        self.frame_number += 1;
        info
    }

    /// Render info for the frame most recently returned by [`tick`](Self::tick)
    pub fn render_info(&self) -> FrameRenderInfo {
        FrameRenderInfo::new(self.frame_number.saturating_sub(1))
    }

    /// Number of frames ticked so far
    pub fn frame_count(&self) -> u64 {
        self.frame_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_numbers_frames_from_zero() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick().frame_number, 0);
        let second = clock.tick();
        assert_eq!(second.frame_number, 1);
        assert!(second.delta_seconds >= 0.0);
        assert_eq!(clock.render_info().frame_number, 1);
        assert_eq!(clock.frame_count(), 2);
    }
}
