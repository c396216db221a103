//! Derived index of interesting track positions
//!
//! Rebuilt on demand from clip state, never persisted. The presentation
//! layer uses it to draw cut-line expanders and merge-point handles.

use serde::{Deserialize, Serialize};

/// What a location marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationKind {
    /// A cut line that can be expanded or removed
    CutLine,
    /// Two clips close enough to be merged, by index into the track's
    /// clip collection
    MergePoint { left: usize, right: usize },
}

/// One entry in a track's location cache
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Track-absolute seconds
    pub position: f64,
    pub kind: LocationKind,
}
