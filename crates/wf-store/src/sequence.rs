//! Block-backed contiguous sample run
//!
//! A Sequence is one run of audio stored as a list of immutable blocks.
//! Editing never rewrites a block in place: set/delete/paste re-pack only
//! the blocks touching the edit seam and share every untouched block with
//! the store's reference counting. This is what makes copy cheap and what
//! keeps a shared block safe from mutation through another owner.

use std::sync::Arc;

use wf_core::{EditError, EditResult};

use crate::{BlockId, BlockSummary, SampleStore, SeqBlock};

/// Reference-counted list of sample blocks forming one contiguous run
#[derive(Debug)]
pub struct Sequence {
    store: Arc<dyn SampleStore>,
    blocks: Vec<SeqBlock>,
    num_samples: u64,
    /// Blocks shorter than this get merged when appending
    min_block: u64,
    /// Hard cap on block length, from the store
    max_block: u64,
}

impl Sequence {
    pub fn new(store: Arc<dyn SampleStore>) -> Self {
        let max_block = store.max_block_len();
        Self {
            store,
            blocks: Vec::new(),
            num_samples: 0,
            min_block: max_block / 2,
            max_block,
        }
    }

    /// Rebuild a sequence from persisted (block id, length) references.
    /// Retains every block and re-derives the peak summaries.
    pub fn from_block_refs(
        store: Arc<dyn SampleStore>,
        refs: &[(BlockId, u64)],
    ) -> EditResult<Self> {
        let mut seq = Self::new(store);
        for &(id, len) in refs {
            seq.store.retain_block(id)?;
            let mut buf = vec![0.0f32; len as usize];
            // The block is already retained, so an early return drops `seq`
            // and releases it again.
            seq.store.read_block(id, 0, &mut buf)?;
            seq.blocks.push(SeqBlock {
                id,
                start: seq.num_samples,
                len,
                summary: BlockSummary::scan(&buf),
            });
            seq.num_samples += len;
        }
        Ok(seq)
    }

    #[inline]
    pub fn num_samples(&self) -> u64 {
        self.num_samples
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_samples == 0
    }

    pub fn store(&self) -> &Arc<dyn SampleStore> {
        &self.store
    }

    pub fn blocks(&self) -> &[SeqBlock] {
        &self.blocks
    }

    /// Persisted form: (block id, length) per block, in order
    pub fn block_refs(&self) -> Vec<(BlockId, u64)> {
        self.blocks.iter().map(|b| (b.id, b.len)).collect()
    }

    #[inline]
    pub fn max_block_len(&self) -> u64 {
        self.max_block
    }

    #[inline]
    pub fn min_block_len(&self) -> u64 {
        self.min_block
    }

    /// A good number of samples to grab in one chunk starting at `start`
    /// in order to land on a block boundary
    pub fn best_block_len(&self, start: u64) -> u64 {
        if self.blocks.is_empty() || start >= self.num_samples {
            return self.max_block;
        }
        let mut b = self.find_block(start);
        let mut result = self.blocks[b].end() - start;
        while result < self.min_block
            && b + 1 < self.blocks.len()
            && result + self.blocks[b + 1].len <= self.max_block
        {
            b += 1;
            result += self.blocks[b].len;
        }
        result
    }

    /// Index of the block containing sample `pos`
    fn find_block(&self, pos: u64) -> usize {
        if pos >= self.num_samples {
            return self.blocks.len().saturating_sub(1);
        }
        self.blocks.partition_point(|b| b.end() <= pos)
    }

    fn range_err(&self, what: &str, start: u64, len: u64) -> EditError {
        EditError::OutOfRange(format!(
            "{what}: start {start} + len {len} exceeds {} samples",
            self.num_samples
        ))
    }

    /// Read `out.len()` samples starting at `start`
    pub fn get(&self, out: &mut [f32], start: u64) -> EditResult<()> {
        let len = out.len() as u64;
        if start + len > self.num_samples {
            return Err(self.range_err("sequence get", start, len));
        }
        if len == 0 {
            return Ok(());
        }

        let mut b = self.find_block(start);
        let mut pos = start;
        let mut filled = 0usize;
        while filled < out.len() {
            let block = self.blocks[b];
            let take = (block.end() - pos).min(len - filled as u64) as usize;
            self.store
                .read_block(block.id, pos - block.start, &mut out[filled..filled + take])?;
            filled += take;
            pos += take as u64;
            b += 1;
        }
        Ok(())
    }

    /// Overwrite samples starting at `start`
    pub fn set(&mut self, buf: &[f32], start: u64) -> EditResult<()> {
        self.set_impl(Some(buf), start, buf.len() as u64)
    }

    /// Overwrite a range with silence
    pub fn set_silence(&mut self, start: u64, len: u64) -> EditResult<()> {
        self.set_impl(None, start, len)
    }

    fn set_impl(&mut self, buf: Option<&[f32]>, start: u64, len: u64) -> EditResult<()> {
        if start + len > self.num_samples {
            return Err(self.range_err("sequence set", start, len));
        }
        if len == 0 {
            return Ok(());
        }

        let mut b = self.find_block(start);
        let mut pos = start;
        let mut src_off = 0usize;
        let mut remaining = len;
        while remaining > 0 {
            let block = self.blocks[b];
            let take = (block.end() - pos).min(remaining);
            let patch = buf.map(|s| &s[src_off..src_off + take as usize]);
            self.copy_write(b, pos - block.start, take, patch)?;
            remaining -= take;
            pos += take;
            src_off += take as usize;
            b += 1;
        }
        self.check_consistency();
        Ok(())
    }

    /// Replace one block with a patched copy. Shared blocks are never
    /// touched: the old block is released, not rewritten.
    fn copy_write(
        &mut self,
        idx: usize,
        offset: u64,
        len: u64,
        patch: Option<&[f32]>,
    ) -> EditResult<()> {
        let old = self.blocks[idx];
        let mut data = vec![0.0f32; old.len as usize];
        self.store.read_block(old.id, 0, &mut data)?;
        match patch {
            Some(src) => data[offset as usize..(offset + len) as usize].copy_from_slice(src),
            None => data[offset as usize..(offset + len) as usize].fill(0.0),
        }
        let fresh = self.new_block(&data, old.start)?;
        self.store.release_block(old.id);
        self.blocks[idx] = fresh;
        Ok(())
    }

    /// Allocate a block for `data` and summarize it
    fn new_block(&self, data: &[f32], start: u64) -> EditResult<SeqBlock> {
        let id = self.store.alloc_block(data)?;
        Ok(SeqBlock {
            id,
            start,
            len: data.len() as u64,
            summary: BlockSummary::scan(data),
        })
    }

    /// Split a buffer into evenly-sized blocks no longer than the cap
    fn blockify(&self, data: &[f32], start: u64, out: &mut Vec<SeqBlock>) -> EditResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let len = data.len() as u64;
        let num = len.div_ceil(self.max_block);
        for i in 0..num {
            let s = i * len / num;
            let e = (i + 1) * len / num;
            out.push(self.new_block(&data[s as usize..e as usize], start + s)?);
        }
        Ok(())
    }

    /// Share another sequence's block onto the end of this one
    fn append_shared_block(&mut self, block: &SeqBlock) -> EditResult<()> {
        self.store.retain_block(block.id)?;
        self.blocks.push(SeqBlock {
            start: self.num_samples,
            ..*block
        });
        self.num_samples += block.len;
        Ok(())
    }

    /// Copy the range `[s0, s1)` into a new sequence. Whole blocks inside
    /// the range are shared with the store's refcounting; only the partial
    /// edge blocks are re-packed.
    pub fn copy(&self, s0: u64, s1: u64) -> EditResult<Sequence> {
        if s1 < s0 || s1 > self.num_samples {
            return Err(self.range_err("sequence copy", s0, s1.saturating_sub(s0)));
        }
        let mut dest = Sequence::new(Arc::clone(&self.store));
        if s1 == s0 {
            return Ok(dest);
        }

        let mut b = self.find_block(s0);
        let mut pos = s0;
        while pos < s1 {
            let block = self.blocks[b];
            if pos == block.start && block.end() <= s1 {
                dest.append_shared_block(&block)?;
                pos = block.end();
            } else {
                let take = block.end().min(s1) - pos;
                let mut buf = vec![0.0f32; take as usize];
                self.get(&mut buf, pos)?;
                dest.append(&buf)?;
                pos += take;
            }
            b += 1;
        }
        dest.check_consistency();
        Ok(dest)
    }

    /// Splice all of `src` in at sample position `s`
    pub fn paste(&mut self, s: u64, src: &Sequence) -> EditResult<()> {
        if s > self.num_samples {
            return Err(self.range_err("sequence paste", s, src.num_samples));
        }
        let added = src.num_samples;
        if added == 0 {
            return Ok(());
        }

        // Block ids are only meaningful within one store; a source from a
        // different document cannot share blocks, its bytes must cross.
        if !Arc::ptr_eq(&self.store, &src.store) {
            return self.paste_foreign(s, src);
        }

        if self.blocks.is_empty() {
            for block in &src.blocks {
                self.append_shared_block(block)?;
            }
            self.check_consistency();
            return Ok(());
        }

        let b = self.find_block(s);
        let block = self.blocks[b];
        let split = (s - block.start) as usize;

        // Everything fits into the block at the seam
        if block.len + added <= self.max_block {
            let mut buf = vec![0.0f32; (block.len + added) as usize];
            self.store.read_block(block.id, 0, &mut buf[..split])?;
            src.get(&mut buf[split..split + added as usize], 0)?;
            self.store
                .read_block(block.id, split as u64, &mut buf[split + added as usize..])?;

            let fresh = self.new_block(&buf, block.start)?;
            self.store.release_block(block.id);
            self.blocks[b] = fresh;
            for blk in &mut self.blocks[b + 1..] {
                blk.start += added;
            }
            self.num_samples += added;
            self.check_consistency();
            return Ok(());
        }

        // Rebuild around the seam
        let mut left = vec![0.0f32; split];
        self.store.read_block(block.id, 0, &mut left)?;
        let mut right = vec![0.0f32; block.len as usize - split];
        self.store.read_block(block.id, split as u64, &mut right)?;

        let mut new_blocks: Vec<SeqBlock> =
            Vec::with_capacity(self.blocks.len() + src.blocks.len() + 2);
        new_blocks.extend_from_slice(&self.blocks[..b]);

        if src.blocks.len() <= 4 {
            // Small source: lump seam block and source together, re-split
            let mut buf = Vec::with_capacity(left.len() + added as usize + right.len());
            buf.extend_from_slice(&left);
            let mid = buf.len();
            buf.resize(mid + added as usize, 0.0);
            src.get(&mut buf[mid..], 0)?;
            buf.extend_from_slice(&right);
            self.blockify(&buf, block.start, &mut new_blocks)?;
        } else {
            // Large source: merge only the seams, share the interior
            let first_two = (src.blocks[0].len + src.blocks[1].len) as usize;
            let mut buf = Vec::with_capacity(left.len() + first_two);
            buf.extend_from_slice(&left);
            let mid = buf.len();
            buf.resize(mid + first_two, 0.0);
            src.get(&mut buf[mid..], 0)?;
            self.blockify(&buf, block.start, &mut new_blocks)?;

            for sb in &src.blocks[2..src.blocks.len() - 2] {
                self.store.retain_block(sb.id)?;
                new_blocks.push(SeqBlock {
                    start: s + sb.start,
                    ..*sb
                });
            }

            let last_two_start = src.blocks[src.blocks.len() - 2].start;
            let last_two = (added - last_two_start) as usize;
            let mut buf = vec![0.0f32; last_two];
            src.get(&mut buf, last_two_start)?;
            buf.extend_from_slice(&right);
            self.blockify(&buf, s + last_two_start, &mut new_blocks)?;
        }

        self.store.release_block(block.id);
        for blk in &self.blocks[b + 1..] {
            new_blocks.push(SeqBlock {
                start: blk.start + added,
                ..*blk
            });
        }
        self.blocks = new_blocks;
        self.num_samples += added;
        self.check_consistency();
        Ok(())
    }

    /// Re-home a foreign sequence into this store chunk by chunk, then
    /// paste the local copy
    fn paste_foreign(&mut self, s: u64, src: &Sequence) -> EditResult<()> {
        let mut local = Sequence::new(Arc::clone(&self.store));
        let chunk = self.max_block as usize;
        let mut buf = vec![0.0f32; chunk.min(src.num_samples as usize)];
        let mut done = 0u64;
        while done < src.num_samples {
            let n = (chunk as u64).min(src.num_samples - done) as usize;
            src.get(&mut buf[..n], done)?;
            local.append(&buf[..n])?;
            done += n as u64;
        }
        self.paste(s, &local)
    }

    /// Remove `len` samples starting at `start` and close the gap
    pub fn delete(&mut self, start: u64, len: u64) -> EditResult<()> {
        if len == 0 {
            return Ok(());
        }
        if start + len > self.num_samples {
            return Err(self.range_err("sequence delete", start, len));
        }

        let b0 = self.find_block(start);
        let b1 = self.find_block(start + len - 1);

        // Deletion inside one block with a comfortable remainder
        if b0 == b1 && self.blocks[b0].len - len >= self.min_block {
            let block = self.blocks[b0];
            let pos = (start - block.start) as usize;
            let mut buf = vec![0.0f32; (block.len - len) as usize];
            self.store.read_block(block.id, 0, &mut buf[..pos])?;
            self.store.read_block(block.id, pos as u64 + len, &mut buf[pos..])?;

            let fresh = self.new_block(&buf, block.start)?;
            self.store.release_block(block.id);
            self.blocks[b0] = fresh;
            for blk in &mut self.blocks[b0 + 1..] {
                blk.start -= len;
            }
            self.num_samples -= len;
            self.check_consistency();
            return Ok(());
        }

        // Re-pack the seam blocks, drop the interior
        let mut new_blocks: Vec<SeqBlock> = Vec::with_capacity(self.blocks.len());
        new_blocks.extend_from_slice(&self.blocks[..b0]);

        let pre = start - self.blocks[b0].start;
        if pre > 0 {
            let mut buf = vec![0.0f32; pre as usize];
            self.store.read_block(self.blocks[b0].id, 0, &mut buf)?;
            self.blockify(&buf, self.blocks[b0].start, &mut new_blocks)?;
        }

        let end = start + len;
        let post = self.blocks[b1].end() - end;
        if post > 0 {
            let mut buf = vec![0.0f32; post as usize];
            self.store
                .read_block(self.blocks[b1].id, end - self.blocks[b1].start, &mut buf)?;
            self.blockify(&buf, start, &mut new_blocks)?;
        }

        for blk in &self.blocks[b1 + 1..] {
            new_blocks.push(SeqBlock {
                start: blk.start - len,
                ..*blk
            });
        }
        for blk in &self.blocks[b0..=b1] {
            self.store.release_block(blk.id);
        }
        self.blocks = new_blocks;
        self.num_samples -= len;
        self.check_consistency();
        Ok(())
    }

    /// Insert `len` zero samples at position `s`. The zero data is built
    /// once and shared across as many blocks as the length needs.
    pub fn insert_silence(&mut self, s: u64, len: u64) -> EditResult<()> {
        if s > self.num_samples {
            return Err(self.range_err("sequence insert_silence", s, len));
        }
        if len == 0 {
            return Ok(());
        }

        let mut silence = Sequence::new(Arc::clone(&self.store));
        let ideal = self.max_block;
        let zeros = vec![0.0f32; ideal.min(len) as usize];
        let mut full_block: Option<SeqBlock> = None;
        let mut remaining = len;
        while remaining > 0 {
            let l = remaining.min(ideal);
            if l == ideal && full_block.is_some() {
                if let Some(fb) = full_block {
                    silence.append_shared_block(&fb)?;
                }
            } else {
                let nb = silence.new_block(&zeros[..l as usize], silence.num_samples)?;
                silence.blocks.push(nb);
                silence.num_samples += l;
                if l == ideal {
                    full_block = Some(nb);
                }
            }
            remaining -= l;
        }

        self.paste(s, &silence)
    }

    /// Append samples, topping up a short final block before emitting new
    /// full-size blocks
    pub fn append(&mut self, buf: &[f32]) -> EditResult<()> {
        let mut src = buf;

        if !self.blocks.is_empty() {
            let idx = self.blocks.len() - 1;
            let last = self.blocks[idx];
            if last.len < self.min_block && !src.is_empty() {
                let add = ((self.max_block - last.len) as usize).min(src.len());
                let mut merged = vec![0.0f32; last.len as usize + add];
                self.store
                    .read_block(last.id, 0, &mut merged[..last.len as usize])?;
                merged[last.len as usize..].copy_from_slice(&src[..add]);

                let fresh = self.new_block(&merged, last.start)?;
                self.store.release_block(last.id);
                self.blocks[idx] = fresh;
                self.num_samples += add as u64;
                src = &src[add..];
            }
        }

        while !src.is_empty() {
            let l = (self.max_block as usize).min(src.len());
            let fresh = self.new_block(&src[..l], self.num_samples)?;
            self.blocks.push(fresh);
            self.num_samples += l as u64;
            src = &src[l..];
        }
        self.check_consistency();
        Ok(())
    }

    /// Min/max over a sample range, using cached block summaries for every
    /// block wholly inside the range
    pub fn get_min_max(&self, start: u64, len: u64) -> EditResult<(f32, f32)> {
        if len == 0 || self.blocks.is_empty() {
            return Ok((0.0, 0.0));
        }
        if start + len > self.num_samples {
            return Err(self.range_err("sequence get_min_max", start, len));
        }

        let b0 = self.find_block(start);
        let b1 = self.find_block(start + len - 1);
        let mut min = f32::MAX;
        let mut max = f32::MIN;

        if b1 > b0 {
            for b in &self.blocks[b0 + 1..b1] {
                min = min.min(b.summary.min);
                max = max.max(b.summary.max);
            }
        }

        // The edge blocks may only partly overlap the range; read samples
        // unless their whole-block summary cannot move the result anyway.
        let first = self.blocks[b0];
        if first.summary.min < min || first.summary.max > max {
            let s0 = start - first.start;
            let l0 = (first.len - s0).min(len);
            let mut buf = vec![0.0f32; l0 as usize];
            self.store.read_block(first.id, s0, &mut buf)?;
            let s = BlockSummary::scan(&buf);
            min = min.min(s.min);
            max = max.max(s.max);
        }
        if b1 > b0 {
            let last = self.blocks[b1];
            if last.summary.min < min || last.summary.max > max {
                let l1 = start + len - last.start;
                let mut buf = vec![0.0f32; l1 as usize];
                self.store.read_block(last.id, 0, &mut buf)?;
                let s = BlockSummary::scan(&buf);
                min = min.min(s.min);
                max = max.max(s.max);
            }
        }
        Ok((min, max))
    }

    /// Pin every block against store-side eviction
    pub fn lock(&self) {
        for b in &self.blocks {
            self.store.lock_block(b.id);
        }
    }

    pub fn unlock(&self) {
        for b in &self.blocks {
            self.store.unlock_block(b.id);
        }
    }

    fn check_consistency(&self) {
        if cfg!(debug_assertions) {
            let mut pos = 0u64;
            for b in &self.blocks {
                debug_assert_eq!(b.start, pos, "block starts must be contiguous");
                debug_assert!(b.len > 0, "empty block in sequence");
                pos += b.len;
            }
            debug_assert_eq!(pos, self.num_samples, "num_samples out of sync");
        }
    }
}

impl Clone for Sequence {
    fn clone(&self) -> Self {
        for b in &self.blocks {
            // Blocks owned by this sequence are always live in the store
            let retained = self.store.retain_block(b.id);
            debug_assert!(retained.is_ok());
        }
        Self {
            store: Arc::clone(&self.store),
            blocks: self.blocks.clone(),
            num_samples: self.num_samples,
            min_block: self.min_block,
            max_block: self.max_block,
        }
    }
}

impl Drop for Sequence {
    fn drop(&mut self) {
        for b in &self.blocks {
            self.store.release_block(b.id);
        }
    }
}
