//! Sequence block bookkeeping

use serde::{Deserialize, Serialize};

use crate::BlockId;

/// Cached peak summary of one block, computed when the block is written
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub min: f32,
    pub max: f32,
    pub rms: f32,
}

impl BlockSummary {
    pub const SILENT: Self = Self {
        min: 0.0,
        max: 0.0,
        rms: 0.0,
    };

    /// Scan a sample buffer for min/max/rms
    pub fn scan(samples: &[f32]) -> Self {
        if samples.is_empty() {
            return Self::SILENT;
        }
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        let mut sumsq = 0.0f64;
        for &s in samples {
            if s < min {
                min = s;
            }
            if s > max {
                max = s;
            }
            sumsq += f64::from(s) * f64::from(s);
        }
        Self {
            min,
            max,
            rms: (sumsq / samples.len() as f64).sqrt() as f32,
        }
    }
}

/// One entry in a sequence's block list
#[derive(Debug, Clone, Copy)]
pub struct SeqBlock {
    /// Block id in the sample store
    pub id: BlockId,
    /// First sample of this block, relative to the sequence start
    pub start: u64,
    /// Number of samples in the block
    pub len: u64,
    /// Peak summary
    pub summary: BlockSummary,
}

impl SeqBlock {
    /// One past the last sample covered by this block
    #[inline]
    pub fn end(&self) -> u64 {
        self.start + self.len
    }
}
