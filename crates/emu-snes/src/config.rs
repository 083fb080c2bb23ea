//! Rewind engine configuration.

use serde::{Deserialize, Serialize};

/// Rewind engine tuning.
///
/// The defaults hold roughly ten seconds of 60 Hz history: one capture
/// every 3 frames, 200 snapshots, and a full keyframe every 30 captures
/// so reconstruction never replays more than 29 deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewindConfig {
    /// Maximum snapshots held in the ring.
    pub capacity: usize,
    /// Frames between captures.
    pub capture_interval: u32,
    /// Captures between full keyframes.
    pub keyframe_interval: u32,
}

impl Default for RewindConfig {
    fn default() -> Self {
        Self {
            capacity: 200,
            capture_interval: 3,
            keyframe_interval: 30,
        }
    }
}

impl RewindConfig {
    /// Check the configuration contract: the ring must be able to hold
    /// a full keyframe period, and the intervals must be non-zero.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated constraint.
    pub fn validate(&self) -> Result<(), String> {
        if self.capture_interval == 0 {
            return Err("capture_interval must be at least 1".to_string());
        }
        if self.keyframe_interval == 0 {
            return Err("keyframe_interval must be at least 1".to_string());
        }
        if self.capacity < self.keyframe_interval as usize {
            return Err(format!(
                "capacity ({}) must be at least keyframe_interval ({})",
                self.capacity, self.keyframe_interval
            ));
        }
        Ok(())
    }
}
