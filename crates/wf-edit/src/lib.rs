//! wf-edit: Non-destructive multi-clip waveform editing
//!
//! The editing engine behind an audio track:
//! - Clip: one contiguous run of audio with its own gain envelope and
//!   re-expandable cut lines
//! - Track: an ordered, non-overlapping collection of clips with the full
//!   editing surface (cut/copy/paste/clear/split/join/disjoin/silence)
//! - Location cache: derived index of cut lines and merge points
//! - Persisted state mirror for the project-file writer
//!
//! No operation here rewrites sample data in place; storage is shared,
//! reference-counted blocks from wf-store.

mod clip;
mod location;
mod persist;
mod track;

pub use clip::*;
pub use location::*;
pub use persist::*;
pub use track::*;
