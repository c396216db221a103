//! Edit mode settings
//!
//! Controls how structural edits interact with neighbouring clips:
//! - Sliding: clips after an edit point shift to make or reclaim room
//! - Fixed: clips stay put and operations that need room fail instead

use serde::{Deserialize, Serialize};

/// Default gap below which two clips count as merge-point candidates, in
/// seconds. Exposed as a settings field because its value materially
/// changes behaviour near clip boundaries.
pub const DEFAULT_MERGE_POINT_TOLERANCE: f64 = 0.01;

/// Per-track editing behaviour settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EditSettings {
    /// When true, clips after a cleared region slide left to close the gap
    /// and clips after a paste point slide right to make room. When false,
    /// clips never move and a paste without room fails.
    pub clips_can_move: bool,

    /// Maximum gap between two adjacent clips for them to be flagged as a
    /// merge point in the location cache. Also the overlap tolerance: two
    /// clips may never overlap by more than this.
    pub merge_point_tolerance: f64,
}

impl Default for EditSettings {
    fn default() -> Self {
        Self {
            clips_can_move: true,
            merge_point_tolerance: DEFAULT_MERGE_POINT_TOLERANCE,
        }
    }
}

impl EditSettings {
    /// Settings with clip sliding disabled
    pub fn fixed() -> Self {
        Self {
            clips_can_move: false,
            ..Self::default()
        }
    }
}
