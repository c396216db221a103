//! Sample block store
//!
//! The store owns fixed-size-bounded, immutable-once-written sample blocks,
//! reference-counted so that copy operations can share storage without
//! duplicating bytes. The editing engine only consumes this interface; the
//! store's persistence policy (memory, project directory, database) is its
//! own concern.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::trace;
use parking_lot::RwLock;

use wf_core::{StoreError, StoreResult};

/// Block id in a sample store
pub type BlockId = u64;

/// Default maximum samples per block (1 MiB of f32 samples)
pub const DEFAULT_MAX_BLOCK_LEN: u64 = 262_144;

/// Interface the editing engine requires from a sample block store.
///
/// Blocks are write-once: `alloc_block` is the only way data enters the
/// store, and a block's samples never change afterwards. Mutation at higher
/// layers is read-modify-write into a fresh block. Sharing is explicit:
/// every owner of a block id holds one reference, taken with `retain_block`
/// and returned with `release_block`.
pub trait SampleStore: Send + Sync + std::fmt::Debug {
    /// Write a new block holding a copy of `samples`, with one reference
    /// owned by the caller. Fails if `samples` exceeds `max_block_len`.
    fn alloc_block(&self, samples: &[f32]) -> StoreResult<BlockId>;

    /// Read `out.len()` samples starting at `offset` within the block
    fn read_block(&self, id: BlockId, offset: u64, out: &mut [f32]) -> StoreResult<()>;

    /// Take an additional reference on a block (zero-copy sharing)
    fn retain_block(&self, id: BlockId) -> StoreResult<()>;

    /// Return one reference; the block is dropped once its reference and
    /// lock counts both reach zero
    fn release_block(&self, id: BlockId);

    /// Pin a block against being dropped, independent of references
    fn lock_block(&self, id: BlockId);

    /// Undo one `lock_block`
    fn unlock_block(&self, id: BlockId);

    /// Number of samples in a block
    fn block_len(&self, id: BlockId) -> StoreResult<u64>;

    /// Hard upper bound on samples per block
    fn max_block_len(&self) -> u64;

    /// Persistence barrier; in-memory stores return immediately
    fn flush(&self) -> StoreResult<()> {
        Ok(())
    }
}

struct StoredBlock {
    data: Arc<[f32]>,
    refs: u32,
    locks: u32,
}

impl std::fmt::Debug for StoredBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredBlock")
            .field("len", &self.data.len())
            .field("refs", &self.refs)
            .field("locks", &self.locks)
            .finish()
    }
}

/// In-memory `SampleStore` implementation
#[derive(Debug)]
pub struct MemoryStore {
    blocks: RwLock<HashMap<BlockId, StoredBlock>>,
    next_id: AtomicU64,
    max_block_len: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_max_block_len(DEFAULT_MAX_BLOCK_LEN)
    }

    /// Store with a custom block size cap; small caps are useful in tests
    /// to exercise multi-block paths with little data.
    pub fn with_max_block_len(max_block_len: u64) -> Self {
        assert!(max_block_len >= 2, "block size cap too small");
        Self {
            blocks: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            max_block_len,
        }
    }

    /// Number of live blocks (test/diagnostic aid)
    pub fn num_blocks(&self) -> usize {
        self.blocks.read().len()
    }

    /// Total samples held across all live blocks (test/diagnostic aid)
    pub fn total_samples(&self) -> u64 {
        self.blocks.read().values().map(|b| b.data.len() as u64).sum()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleStore for MemoryStore {
    fn alloc_block(&self, samples: &[f32]) -> StoreResult<BlockId> {
        if samples.len() as u64 > self.max_block_len {
            return Err(StoreError::Alloc(format!(
                "block of {} samples exceeds cap of {}",
                samples.len(),
                self.max_block_len
            )));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.blocks.write().insert(
            id,
            StoredBlock {
                data: samples.into(),
                refs: 1,
                locks: 0,
            },
        );
        trace!("alloc block {} ({} samples)", id, samples.len());
        Ok(id)
    }

    fn read_block(&self, id: BlockId, offset: u64, out: &mut [f32]) -> StoreResult<()> {
        let blocks = self.blocks.read();
        let block = blocks.get(&id).ok_or(StoreError::UnknownBlock(id))?;
        let len = out.len() as u64;
        let block_len = block.data.len() as u64;
        if offset + len > block_len {
            return Err(StoreError::ReadOutOfBounds {
                offset,
                len,
                block_len,
            });
        }
        out.copy_from_slice(&block.data[offset as usize..(offset + len) as usize]);
        Ok(())
    }

    fn retain_block(&self, id: BlockId) -> StoreResult<()> {
        let mut blocks = self.blocks.write();
        let block = blocks.get_mut(&id).ok_or(StoreError::UnknownBlock(id))?;
        block.refs += 1;
        Ok(())
    }

    fn release_block(&self, id: BlockId) {
        let mut blocks = self.blocks.write();
        if let Some(block) = blocks.get_mut(&id) {
            block.refs = block.refs.saturating_sub(1);
            if block.refs == 0 && block.locks == 0 {
                blocks.remove(&id);
                trace!("drop block {}", id);
            }
        }
    }

    fn lock_block(&self, id: BlockId) {
        if let Some(block) = self.blocks.write().get_mut(&id) {
            block.locks += 1;
        }
    }

    fn unlock_block(&self, id: BlockId) {
        let mut blocks = self.blocks.write();
        if let Some(block) = blocks.get_mut(&id) {
            block.locks = block.locks.saturating_sub(1);
            if block.refs == 0 && block.locks == 0 {
                blocks.remove(&id);
            }
        }
    }

    fn block_len(&self, id: BlockId) -> StoreResult<u64> {
        let blocks = self.blocks.read();
        let block = blocks.get(&id).ok_or(StoreError::UnknownBlock(id))?;
        Ok(block.data.len() as u64)
    }

    fn max_block_len(&self) -> u64 {
        self.max_block_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_read() {
        let store = MemoryStore::new();
        let id = store.alloc_block(&[1.0, 2.0, 3.0]).unwrap();
        let mut out = [0.0f32; 2];
        store.read_block(id, 1, &mut out).unwrap();
        assert_eq!(out, [2.0, 3.0]);
    }

    #[test]
    fn test_read_out_of_bounds() {
        let store = MemoryStore::new();
        let id = store.alloc_block(&[1.0, 2.0]).unwrap();
        let mut out = [0.0f32; 2];
        assert!(store.read_block(id, 1, &mut out).is_err());
    }

    #[test]
    fn test_alloc_over_cap() {
        let store = MemoryStore::with_max_block_len(4);
        assert!(store.alloc_block(&[0.0; 5]).is_err());
    }

    #[test]
    fn test_refcount_lifecycle() {
        let store = MemoryStore::new();
        let id = store.alloc_block(&[0.5]).unwrap();
        store.retain_block(id).unwrap();
        store.release_block(id);
        assert_eq!(store.num_blocks(), 1);
        store.release_block(id);
        assert_eq!(store.num_blocks(), 0);
        assert!(store.retain_block(id).is_err());
    }

    #[test]
    fn test_lock_pins_block() {
        let store = MemoryStore::new();
        let id = store.alloc_block(&[0.5]).unwrap();
        store.lock_block(id);
        store.release_block(id);
        assert_eq!(store.num_blocks(), 1);
        store.unlock_block(id);
        assert_eq!(store.num_blocks(), 0);
    }
}
