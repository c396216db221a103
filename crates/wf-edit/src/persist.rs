//! Persisted-state mirror of the track data model
//!
//! Pure-data serde types matching the live model 1:1: a track node holds
//! rate/gain/pan and an ordered list of clip nodes; a clip node holds its
//! offset, envelope control points, sample-block references and nested
//! cut-line sub-nodes (same clip schema). The project-file writer owns
//! the bytes and the block store owns block persistence; the state only
//! carries block ids, which are re-linked against the store on load.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use wf_core::{EditResult, EnvPoint, Envelope};
use wf_store::{BlockId, SampleStore, Sequence};

use crate::{Clip, CutLine, Track};

/// Schema version for migrations
pub const STATE_VERSION: u32 = 1;

/// Reference to one stored sample block
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlockRefState {
    pub id: BlockId,
    pub len: u64,
}

/// A cut line: position plus the hidden clip, nested with the same schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutLineState {
    pub position: f64,
    pub clip: ClipState,
}

/// Clip node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipState {
    pub offset: f64,
    pub rate: u32,
    pub blocks: Vec<BlockRefState>,
    pub envelope: Vec<EnvPoint>,
    pub cut_lines: Vec<CutLineState>,
}

/// Track node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackState {
    pub version: u32,
    pub name: String,
    pub rate: u32,
    pub gain: f32,
    pub pan: f32,
    pub clips: Vec<ClipState>,
}

impl Clip {
    fn to_state(&self) -> ClipState {
        ClipState {
            offset: self.offset(),
            rate: self.rate(),
            blocks: self
                .sequence()
                .block_refs()
                .into_iter()
                .map(|(id, len)| BlockRefState { id, len })
                .collect(),
            envelope: self.envelope().points().to_vec(),
            cut_lines: self
                .cut_lines()
                .iter()
                .map(|cl| CutLineState {
                    position: cl.position,
                    clip: cl.clip.to_state(),
                })
                .collect(),
        }
    }

    fn from_state(state: &ClipState, store: &Arc<dyn SampleStore>) -> EditResult<Clip> {
        let refs: Vec<(BlockId, u64)> = state.blocks.iter().map(|b| (b.id, b.len)).collect();
        let sequence = Sequence::from_block_refs(Arc::clone(store), &refs)?;
        let envelope = Envelope::from_points(state.envelope.clone());

        let mut cut_lines = Vec::with_capacity(state.cut_lines.len());
        for cl in &state.cut_lines {
            cut_lines.push(CutLine {
                position: cl.position,
                clip: Clip::from_state(&cl.clip, store)?,
            });
        }

        Ok(Clip::from_parts(
            state.offset,
            state.rate,
            sequence,
            envelope,
            cut_lines,
        ))
    }
}

impl Track {
    /// Snapshot the track into its persisted form
    pub fn to_state(&self) -> TrackState {
        TrackState {
            version: STATE_VERSION,
            name: self.name().to_string(),
            rate: self.rate(),
            gain: self.gain(),
            pan: self.pan(),
            clips: self.clips().iter().map(Clip::to_state).collect(),
        }
    }

    /// Rebuild a track from persisted state, re-linking every block
    /// reference against `store`. Unknown ids fail with a storage error.
    pub fn from_state(state: &TrackState, store: Arc<dyn SampleStore>) -> EditResult<Track> {
        let mut track = Track::new(Arc::clone(&store), state.rate);
        track.set_name(&state.name);
        track.set_gain(state.gain);
        track.set_pan(state.pan);
        for clip_state in &state.clips {
            let clip = Clip::from_state(clip_state, &store)?;
            track.push_clip(clip);
        }
        Ok(track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_store::MemoryStore;

    const RATE: u32 = 1000;

    #[test]
    fn test_state_roundtrip_through_json() {
        let store: Arc<dyn SampleStore> = Arc::new(MemoryStore::with_max_block_len(64));
        let mut track = Track::new(Arc::clone(&store), RATE);
        track.set_name("vox");
        track.set_gain(0.8);
        track.set_pan(-0.25);
        let data: Vec<f32> = (0..200).map(|i| (i as f32 * 0.01).sin()).collect();
        track.append(&data).unwrap();
        track.clear_and_add_cut_line(0.05, 0.08).unwrap();
        track.split_at(0.1).unwrap();

        let state = track.to_state();
        let json = serde_json::to_string(&state).unwrap();
        let parsed: TrackState = serde_json::from_str(&json).unwrap();
        let rebuilt = Track::from_state(&parsed, Arc::clone(&store)).unwrap();

        assert_eq!(rebuilt.name(), "vox");
        assert_eq!(rebuilt.gain(), 0.8);
        assert_eq!(rebuilt.pan(), -0.25);
        assert_eq!(rebuilt.num_clips(), track.num_clips());
        assert_eq!(
            rebuilt.clip(0).unwrap().cut_lines().len(),
            track.clip(0).unwrap().cut_lines().len()
        );

        let mut a = vec![0.0f32; 200];
        let mut b = vec![0.0f32; 200];
        track.get(&mut a, 0).unwrap();
        rebuilt.get(&mut b, 0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_state_rejects_unknown_blocks() {
        let store: Arc<dyn SampleStore> = Arc::new(MemoryStore::new());
        let state = TrackState {
            version: STATE_VERSION,
            name: "broken".into(),
            rate: RATE,
            gain: 1.0,
            pan: 0.0,
            clips: vec![ClipState {
                offset: 0.0,
                rate: RATE,
                blocks: vec![BlockRefState { id: 42, len: 10 }],
                envelope: Vec::new(),
                cut_lines: Vec::new(),
            }],
        };
        assert!(Track::from_state(&state, store).is_err());
    }
}
