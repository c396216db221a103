//! Track: multi-clip timeline orchestration
//!
//! A track owns an unordered collection of non-overlapping clips and
//! routes every time-range operation to the clips it affects. Structural
//! operations either fully succeed or leave the track in its prior valid
//! state: partially-affected clips are edited on staged copies that are
//! only committed once every per-clip step has succeeded.
//!
//! Sample reads outside any clip return silence (zero fill) by contract,
//! so the real-time playback path never sees an error branch.

use std::sync::Arc;

use log::debug;

use wf_core::{
    EditError, EditResult, EditSettings, sample_period, samples_to_time, snap_to_sample,
    time_to_samples,
};
use wf_store::SampleStore;

use crate::{Clip, Location, LocationKind};

/// Samples scanned per chunk during a disjoin silence search; the
/// progress callback is polled between chunks
const SCAN_CHUNK: u64 = 65_536;

/// One channel's timeline of audio clips
#[derive(Debug)]
pub struct Track {
    name: String,
    rate: u32,
    gain: f32,
    pan: f32,
    clips: Vec<Clip>,
    settings: EditSettings,
    store: Arc<dyn SampleStore>,
    locations: Vec<Location>,
    locations_dirty: bool,
}

impl Track {
    pub fn new(store: Arc<dyn SampleStore>, rate: u32) -> Self {
        Self::with_settings(store, rate, EditSettings::default())
    }

    pub fn with_settings(store: Arc<dyn SampleStore>, rate: u32, settings: EditSettings) -> Self {
        Self {
            name: "Audio Track".to_string(),
            rate,
            gain: 1.0,
            pan: 0.0,
            clips: Vec::new(),
            settings,
            store,
            locations: Vec::new(),
            locations_dirty: false,
        }
    }

    /// Empty track with the same rate, settings and mixer state
    fn empty_like(&self) -> Self {
        let mut t = Self::with_settings(Arc::clone(&self.store), self.rate, self.settings);
        t.name = self.name.clone();
        t.gain = self.gain;
        t.pan = self.pan;
        t
    }

    // ────────────────────────────────────────────────────────────────────
    // Metadata and mixer state
    // ────────────────────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    #[inline]
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Reinterpret all clips at a new rate without converting samples
    pub fn set_rate(&mut self, rate: u32) {
        self.rate = rate;
        for clip in &mut self.clips {
            clip.set_rate(rate);
        }
        self.locations_dirty = true;
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }

    pub fn set_pan(&mut self, pan: f32) {
        self.pan = pan.clamp(-1.0, 1.0);
    }

    /// Per-channel playback gain under the stereo pan law (even channels
    /// left, odd channels right)
    pub fn channel_gain(&self, channel: u32) -> f32 {
        let mut left = 1.0;
        let mut right = 1.0;
        if self.pan < 0.0 {
            right = self.pan + 1.0;
        } else if self.pan > 0.0 {
            left = 1.0 - self.pan;
        }
        if channel % 2 == 0 {
            left * self.gain
        } else {
            right * self.gain
        }
    }

    pub fn settings(&self) -> &EditSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: EditSettings) {
        self.settings = settings;
        self.locations_dirty = true;
    }

    pub fn store(&self) -> &Arc<dyn SampleStore> {
        &self.store
    }

    // ────────────────────────────────────────────────────────────────────
    // Clips and extent
    // ────────────────────────────────────────────────────────────────────

    pub fn num_clips(&self) -> usize {
        self.clips.len()
    }

    pub fn clip(&self, idx: usize) -> Option<&Clip> {
        self.clips.get(idx)
    }

    pub fn clip_mut(&mut self, idx: usize) -> Option<&mut Clip> {
        self.locations_dirty = true;
        self.clips.get_mut(idx)
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    /// Take ownership of an existing clip (used by the state loader)
    pub(crate) fn push_clip(&mut self, clip: Clip) {
        self.clips.push(clip);
        self.locations_dirty = true;
    }

    /// Append an empty clip and return its index
    pub fn create_clip(&mut self) -> usize {
        self.clips.push(Clip::new(Arc::clone(&self.store), self.rate));
        self.locations_dirty = true;
        self.clips.len() - 1
    }

    fn last_or_create_clip(&mut self) -> &mut Clip {
        if self.clips.is_empty() {
            self.create_clip();
        }
        let idx = self.clips.len() - 1;
        &mut self.clips[idx]
    }

    /// Clip indices ordered by start time
    pub fn sorted_clip_indices(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.clips.len()).collect();
        order.sort_by(|&a, &b| {
            self.clips[a]
                .start_time()
                .total_cmp(&self.clips[b].start_time())
        });
        order
    }

    /// Earliest clip start; zero for an empty track
    pub fn start_time(&self) -> f64 {
        self.clips
            .iter()
            .map(|c| c.start_time())
            .min_by(f64::total_cmp)
            .unwrap_or(0.0)
    }

    /// Latest clip end; zero for an empty track
    pub fn end_time(&self) -> f64 {
        self.clips
            .iter()
            .map(|c| c.end_time())
            .max_by(f64::total_cmp)
            .unwrap_or(0.0)
    }

    pub fn offset(&self) -> f64 {
        self.start_time()
    }

    /// Move the whole track so its first clip starts at `o`
    pub fn set_offset(&mut self, o: f64) {
        let delta = o - self.offset();
        for clip in &mut self.clips {
            clip.shift(delta);
        }
        self.locations_dirty = true;
    }

    #[inline]
    fn period(&self) -> f64 {
        sample_period(self.rate)
    }

    /// Whether no clip overlaps `[t0, t1]` by more than a sample
    pub fn is_region_empty(&self, t0: f64, t1: f64) -> bool {
        let period = self.period();
        !self
            .clips
            .iter()
            .any(|c| c.start_time() < t1 - period && c.end_time() - period > t0)
    }

    /// Largest block length across all clips' storage
    pub fn max_block_len(&self) -> u64 {
        self.clips
            .iter()
            .map(|c| c.sequence().max_block_len())
            .max()
            .unwrap_or_else(|| self.store.max_block_len())
    }

    /// A good chunk size for reading around absolute sample `s`
    pub fn best_block_len(&self, s: i64) -> u64 {
        for clip in &self.clips {
            if s >= clip.start_sample() && s < clip.end_sample() {
                return clip.sequence().best_block_len((s - clip.start_sample()) as u64);
            }
        }
        self.max_block_len()
    }

    // ────────────────────────────────────────────────────────────────────
    // Samples across clips
    // ────────────────────────────────────────────────────────────────────

    /// Read samples in absolute track coordinates. Regions not covered by
    /// any clip read back as silence.
    pub fn get(&self, out: &mut [f32], start: i64) -> EditResult<()> {
        let len = out.len() as i64;

        // When the request lies inside a single clip nothing needs
        // zeroing; otherwise clear everything first.
        let inside_one = self
            .clips
            .iter()
            .any(|c| start >= c.start_sample() && start + len <= c.end_sample());
        if !inside_one {
            out.fill(0.0);
        }

        for clip in &self.clips {
            let (dst, src, n) = match Self::intersect(clip, start, len) {
                Some(v) => v,
                None => continue,
            };
            clip.get(&mut out[dst..dst + n], src)?;
        }
        Ok(())
    }

    /// Write samples in absolute track coordinates; regions outside every
    /// clip are ignored
    pub fn set(&mut self, buf: &[f32], start: i64) -> EditResult<()> {
        let len = buf.len() as i64;
        for clip in &mut self.clips {
            let (src, dst, n) = match Self::intersect(clip, start, len) {
                Some(v) => v,
                None => continue,
            };
            clip.set(&buf[src..src + n], dst)?;
        }
        Ok(())
    }

    /// Intersection of a clip with an absolute sample range: returns
    /// (offset into the request buffer, offset into the clip, length)
    fn intersect(clip: &Clip, start: i64, len: i64) -> Option<(usize, u64, usize)> {
        let clip_start = clip.start_sample();
        let clip_end = clip.end_sample();
        if clip_end <= start || clip_start >= start + len {
            return None;
        }
        let mut to_copy = (start + len - clip_start).min(clip.num_samples() as i64);
        let mut in_clip = 0i64;
        let mut start_delta = clip_start - start;
        if start_delta < 0 {
            in_clip = -start_delta;
            to_copy += start_delta;
            start_delta = 0;
        }
        if to_copy <= 0 {
            return None;
        }
        Some((start_delta as usize, in_clip as u64, to_copy as usize))
    }

    /// Peak summary over a time range, for drawing
    pub fn get_min_max(&self, t0: f64, t1: f64) -> EditResult<(f32, f32)> {
        if t1 < t0 {
            return Err(EditError::OutOfRange(format!(
                "min/max range reversed: {t0} > {t1}"
            )));
        }
        let mut min = 0.0f32;
        let mut max = 0.0f32;
        for clip in &self.clips {
            if t1 >= clip.start_time() && t0 <= clip.end_time() {
                let (cmin, cmax) = clip.get_min_max(t0, t1)?;
                min = min.min(cmin);
                max = max.max(cmax);
            }
        }
        Ok((min, max))
    }

    /// Resample the automation curve onto a fixed display grid. Positions
    /// outside every clip read as zero gain.
    pub fn get_envelope_values(&self, out: &mut [f64], t0: f64, tstep: f64) {
        out.fill(0.0);
        let end_time = t0 + tstep * out.len() as f64;

        for clip in &self.clips {
            if clip.start_time() >= end_time || clip.end_time() <= t0 {
                continue;
            }
            let mut dst = 0usize;
            let mut rt0 = t0;
            if rt0 < clip.start_time() {
                dst = ((clip.start_time() - rt0) / tstep + 0.5).floor() as usize;
                rt0 = t0 + dst as f64 * tstep;
            }
            if dst >= out.len() {
                continue;
            }
            let mut n = out.len() - dst;
            if rt0 + n as f64 * tstep > clip.end_time() {
                n = ((clip.end_time() - rt0) / tstep) as usize;
            }
            clip.envelope()
                .values(&mut out[dst..dst + n], rt0 - clip.offset(), tstep);
        }
    }

    /// Overwrite the overlap of `[t0, t1]` with silence in place; no
    /// structural change
    pub fn silence(&mut self, t0: f64, t1: f64) -> EditResult<()> {
        if t1 < t0 {
            return Err(EditError::OutOfRange(format!(
                "silence range reversed: {t0} > {t1}"
            )));
        }
        let start = time_to_samples(t0, self.rate);
        let len = time_to_samples(t1, self.rate) - start;
        for clip in &mut self.clips {
            let (_, in_clip, n) = match Self::intersect(clip, start, len) {
                Some(v) => v,
                None => continue,
            };
            clip.set_silence(in_clip, n as u64)?;
        }
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────
    // Copy / cut
    // ────────────────────────────────────────────────────────────────────

    /// Copy `[t0, t1]` into a new track with time rebased to zero. Whole
    /// and partial clips are range-copied (cut lines are never copied).
    /// An empty or reversed range yields an empty but valid track.
    pub fn copy(&self, t0: f64, t1: f64) -> EditResult<Track> {
        let mut dest = self.empty_like();
        if t1 <= t0 {
            return Ok(dest);
        }

        for clip in &self.clips {
            if t1 > clip.start_time() && t0 < clip.end_time() {
                let c0 = t0.max(clip.start_time());
                let c1 = t1.min(clip.end_time());
                let mut copy = clip.copy_range(c0, c1)?;
                if copy.is_empty() {
                    continue;
                }
                copy.set_offset((c0 - t0).max(0.0));
                dest.clips.push(copy);
            }
        }
        Ok(dest)
    }

    /// Copy then clear
    pub fn cut(&mut self, t0: f64, t1: f64) -> EditResult<Track> {
        let dest = self.copy(t0, t1)?;
        self.clear(t0, t1)?;
        Ok(dest)
    }

    /// Copy then split-delete (remainders become separate clips, nothing
    /// slides)
    pub fn split_cut(&mut self, t0: f64, t1: f64) -> EditResult<Track> {
        let dest = self.copy(t0, t1)?;
        self.split_delete(t0, t1)?;
        Ok(dest)
    }

    /// Copy then clear-with-cut-line
    pub fn cut_and_add_cut_line(&mut self, t0: f64, t1: f64) -> EditResult<Track> {
        let dest = self.copy(t0, t1)?;
        self.clear_and_add_cut_line(t0, t1)?;
        Ok(dest)
    }

    // ────────────────────────────────────────────────────────────────────
    // Clear family
    // ────────────────────────────────────────────────────────────────────

    pub fn clear(&mut self, t0: f64, t1: f64) -> EditResult<()> {
        self.handle_clear(t0, t1, false, false)
    }

    pub fn clear_and_add_cut_line(&mut self, t0: f64, t1: f64) -> EditResult<()> {
        self.handle_clear(t0, t1, true, false)
    }

    pub fn split_delete(&mut self, t0: f64, t1: f64) -> EditResult<()> {
        self.handle_clear(t0, t1, false, true)
    }

    fn handle_clear(
        &mut self,
        t0: f64,
        t1: f64,
        add_cut_lines: bool,
        split: bool,
    ) -> EditResult<()> {
        if t1 < t0 {
            return Err(EditError::OutOfRange(format!(
                "clear range reversed: {t0} > {t1}"
            )));
        }
        let period = self.period();

        // Cut lines are only meaningful when the removed span is strictly
        // interior to the clips it touches; otherwise downgrade to a
        // plain clear, once for the whole call.
        let mut add_cut_lines = add_cut_lines;
        if add_cut_lines {
            for clip in &self.clips {
                if t1 > clip.start_time()
                    && t0 < clip.end_time()
                    && (t0 + period < clip.start_time() || t1 - period > clip.end_time())
                {
                    debug!("clear: span crosses a clip boundary, dropping cut line");
                    add_cut_lines = false;
                    break;
                }
            }
        }

        let mut to_delete: Vec<usize> = Vec::new();
        let mut to_replace: Vec<(usize, Clip)> = Vec::new();
        let mut to_add: Vec<Clip> = Vec::new();

        for (idx, clip) in self.clips.iter().enumerate() {
            if t0 <= clip.start_time() && t1 >= clip.end_time() {
                // Wholly inside the range
                to_delete.push(idx);
            } else if t1 > clip.start_time() && t0 < clip.end_time() {
                // Partially affected: edit a staged copy
                if add_cut_lines {
                    let mut c = clip.clone();
                    c.clear_and_add_cut_line(t0, t1)?;
                    to_replace.push((idx, c));
                } else if split {
                    if t0 <= clip.start_time() {
                        let mut c = clip.clone();
                        c.clear(c.start_time(), t1)?;
                        c.shift(t1 - clip.start_time());
                        to_replace.push((idx, c));
                    } else if t1 >= clip.end_time() {
                        let mut c = clip.clone();
                        c.clear(t0, c.end_time())?;
                        to_replace.push((idx, c));
                    } else {
                        // Interior: the left and right remainders become
                        // two new clips
                        let mut left = clip.clone();
                        left.clear(t0, left.end_time())?;
                        let mut right = clip.clone();
                        right.clear(right.start_time(), t1)?;
                        right.shift(t1 - clip.start_time());
                        to_delete.push(idx);
                        to_add.push(left);
                        to_add.push(right);
                    }
                } else {
                    let mut c = clip.clone();
                    c.clear(t0, t1)?;
                    to_replace.push((idx, c));
                }
            }
        }

        // Everything succeeded; commit.
        for (idx, c) in to_replace {
            self.clips[idx] = c;
        }
        if !split && self.settings.clips_can_move {
            for clip in &mut self.clips {
                if clip.start_time() >= t1 {
                    clip.shift(-(t1 - t0));
                }
            }
        }
        to_delete.sort_unstable();
        for idx in to_delete.into_iter().rev() {
            self.clips.remove(idx);
        }
        self.clips.append(&mut to_add);
        self.locations_dirty = true;
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────
    // Paste
    // ────────────────────────────────────────────────────────────────────

    /// Paste another track's clips at `t0`.
    ///
    /// Single-clip sources landing inside an existing clip are spliced
    /// directly into it (no new clip boundary). Anything else inserts the
    /// source clips as new clips, shifting later clips right to make room
    /// when the sliding mode allows it, and failing with
    /// `InsufficientSpace` when it does not.
    pub fn paste(&mut self, t0: f64, other: &Track) -> EditResult<()> {
        if other.clips.is_empty() {
            return Ok(());
        }
        let period = self.period();
        let insert_dur = other.end_time();
        let can_move = self.settings.clips_can_move;

        // Make room for the pasted data unless the target span is empty
        if !self.is_region_empty(t0, t0 + insert_dur - period) && can_move {
            if other.clips.len() > 1 {
                // Cut everything from the paste point on and re-paste it
                // shifted; the hole left behind receives the new clips.
                let tail = self.cut(t0, self.end_time() + period)?;
                self.paste(t0 + insert_dur, &tail)?;
            } else {
                for clip in &mut self.clips {
                    if clip.start_time() > t0 - period {
                        clip.shift(insert_dur);
                    }
                }
            }
        }

        if other.clips.len() == 1 {
            // Single-clip mode: splice into the clip the paste point
            // lands in, if any
            let src_end = other.clips[0].end_time();
            let inside = self.clips.iter().position(|clip| {
                if can_move {
                    t0 + src_end - period > clip.start_time()
                        && t0 < clip.end_time() - period
                } else {
                    t0 >= clip.start_time() && t0 < clip.end_time()
                }
            });

            if let Some(idx) = inside {
                if !can_move {
                    // Nothing was moved out of the way above, so the
                    // grown clip must still fit.
                    let host_start = self.clips[idx].start_time();
                    let host_end = self.clips[idx].end_time();
                    for (i, clip) in self.clips.iter().enumerate() {
                        if i != idx
                            && clip.start_time() > host_start
                            && host_end + insert_dur > clip.start_time()
                        {
                            return Err(EditError::InsufficientSpace(
                                "not enough room to paste without moving clips".into(),
                            ));
                        }
                    }
                }
                debug!("paste: splicing into existing clip {idx} at {t0}");
                self.locations_dirty = true;
                return self.clips[idx].paste(t0, &other.clips[0]);
            }
        }

        // Multi-clip mode: insert as new clips
        if !can_move && !self.is_region_empty(t0, t0 + insert_dur - period) {
            return Err(EditError::InsufficientSpace(
                "not enough room to paste without moving clips".into(),
            ));
        }

        debug!("paste: inserting {} clip(s) at {t0}", other.clips.len());
        for clip in &other.clips {
            let mut new = clip.clone();
            if new.rate() != self.rate {
                new.resample(self.rate)?;
            }
            new.shift(t0);
            new.mark_changed();
            self.clips.push(new);
        }
        self.locations_dirty = true;
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────
    // Silence insertion, split, join, disjoin
    // ────────────────────────────────────────────────────────────────────

    /// Insert `len` seconds of silence at `t`, shifting later clips
    pub fn insert_silence(&mut self, t: f64, len: f64) -> EditResult<()> {
        if len <= 0.0 {
            return Err(EditError::OutOfRange(format!(
                "insert_silence length {len} not positive"
            )));
        }

        if self.clips.is_empty() {
            let mut clip = Clip::new(Arc::clone(&self.store), self.rate);
            clip.set_offset(t);
            clip.insert_silence(t, len)?;
            self.clips.push(clip);
            self.locations_dirty = true;
            return Ok(());
        }

        if let Some(idx) = self
            .clips
            .iter()
            .position(|c| c.start_time() <= t && c.end_time() > t)
        {
            self.clips[idx].insert_silence(t, len)?;
        }
        for clip in &mut self.clips {
            if clip.start_time() > t {
                clip.shift(len);
            }
        }
        self.locations_dirty = true;
        Ok(())
    }

    /// Split the clips under `t0` and `t1`
    pub fn split(&mut self, t0: f64, t1: f64) -> EditResult<()> {
        self.split_at(t0)?;
        if t1 != t0 {
            self.split_at(t1)?;
        }
        Ok(())
    }

    /// Split the clip straddling `t` into two clips meeting at `t`.
    /// A no-op when `t` does not fall strictly inside any clip.
    pub fn split_at(&mut self, t: f64) -> EditResult<()> {
        let t = snap_to_sample(t, self.rate);
        if let Some(idx) = self
            .clips
            .iter()
            .position(|c| t > c.start_time() && t < c.end_time())
        {
            let right = self.clips[idx].split_at(t)?;
            self.clips.push(right);
            self.locations_dirty = true;
        }
        Ok(())
    }

    /// Merge every clip intersecting `[t0, t1]` into one clip, filling
    /// gaps wider than one sample period with silence
    pub fn join(&mut self, t0: f64, t1: f64) -> EditResult<()> {
        let period = self.period();
        let mut order: Vec<usize> = (0..self.clips.len())
            .filter(|&i| {
                let c = &self.clips[i];
                c.start_time() < t1 - period && c.end_time() - period > t0
            })
            .collect();
        if order.is_empty() {
            return Ok(());
        }
        order.sort_by(|&a, &b| {
            self.clips[a]
                .start_time()
                .total_cmp(&self.clips[b].start_time())
        });

        let mut joined = Clip::new(Arc::clone(&self.store), self.rate);
        joined.set_offset(self.clips[order[0]].offset());
        let mut t = joined.offset();

        for &i in &order {
            let clip = &self.clips[i];
            if clip.offset() - t > period {
                joined.insert_silence(t, clip.offset() - t)?;
                t = joined.end_time();
            }
            joined.paste(t, clip)?;
            t = joined.end_time();
        }
        debug!("join: folded {} clips into one", order.len());

        order.sort_unstable();
        for idx in order.into_iter().rev() {
            self.clips.remove(idx);
        }
        self.clips.push(joined);
        self.locations_dirty = true;
        Ok(())
    }

    /// Scan `[t0, t1]` for runs of exact silence of more than
    /// `min_silence_run` samples and split-delete each run, fragmenting
    /// clips at the silence boundaries. Returns the number of runs cut.
    pub fn disjoin(&mut self, t0: f64, t1: f64, min_silence_run: u64) -> EditResult<usize> {
        self.disjoin_with_progress(t0, t1, min_silence_run, |_, _| true)
    }

    /// `disjoin` variant polling `poll(samples_done, samples_total)`
    /// between scan chunks; returning false cancels the scan before any
    /// edit is made.
    pub fn disjoin_with_progress<F>(
        &mut self,
        t0: f64,
        t1: f64,
        min_silence_run: u64,
        mut poll: F,
    ) -> EditResult<usize>
    where
        F: FnMut(u64, u64) -> bool,
    {
        let mut regions: Vec<(f64, f64)> = Vec::new();

        let total: u64 = self
            .clips
            .iter()
            .map(|c| {
                let start = c.time_to_samples_clip(t0.max(c.start_time()));
                let end = c.time_to_samples_clip(t1.min(c.end_time()));
                end.saturating_sub(start)
            })
            .sum();
        let mut done_total = 0u64;

        for clip in &self.clips {
            let start = clip.time_to_samples_clip(t0.max(clip.start_time()));
            let end = clip.time_to_samples_clip(t1.min(clip.end_time()));
            if end <= start {
                continue;
            }
            let len = end - start;

            let mut buffer = vec![0.0f32; SCAN_CHUNK.min(len) as usize];
            let mut run_start: Option<u64> = None;
            let mut done = 0u64;
            while done < len {
                let n = SCAN_CHUNK.min(len - done);
                let buf = &mut buffer[..n as usize];
                clip.get(buf, start + done)?;

                for (i, &v) in buf.iter().enumerate() {
                    let pos = start + done + i as u64;
                    if v == 0.0 && run_start.is_none() {
                        run_start = Some(pos);
                    } else if v != 0.0 || pos == end - 1 {
                        if let Some(rs) = run_start.take() {
                            let run_end = if pos == end - 1 && v == 0.0 { pos } else { pos - 1 };
                            if run_end - rs + 1 > min_silence_run {
                                regions.push((
                                    clip.start_time() + samples_to_time(rs as i64, clip.rate()),
                                    clip.start_time()
                                        + samples_to_time(run_end as i64 + 1, clip.rate()),
                                ));
                            }
                        }
                    }
                }

                done += n;
                done_total += n;
                if !poll(done_total, total) {
                    return Ok(0);
                }
            }
        }

        debug!("disjoin: {} silence run(s) found", regions.len());
        let count = regions.len();
        for (s, e) in regions {
            self.split_delete(s, e)?;
        }
        Ok(count)
    }

    /// Append clip `idx2`'s audio to the end of clip `idx1` and discard
    /// `idx2`; used to collapse a merge point
    pub fn merge_clips(&mut self, idx1: usize, idx2: usize) -> EditResult<()> {
        if idx1 >= self.clips.len() || idx2 >= self.clips.len() || idx1 == idx2 {
            return Err(EditError::OutOfRange(format!(
                "merge indices {idx1}, {idx2} invalid for {} clips",
                self.clips.len()
            )));
        }
        let src = self.clips[idx2].clone();
        let mut merged = self.clips[idx1].clone();
        merged.paste(merged.end_time(), &src)?;

        self.clips[idx1] = merged;
        self.clips.remove(idx2);
        self.locations_dirty = true;
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────
    // Cut lines
    // ────────────────────────────────────────────────────────────────────

    /// Re-splice the hidden audio behind the cut line near `pos`,
    /// shifting later clips right (or failing) per the sliding mode.
    /// Returns the re-expanded span for re-selection.
    pub fn expand_cut_line(&mut self, pos: f64) -> EditResult<(f64, f64)> {
        let found = self
            .clips
            .iter()
            .enumerate()
            .find_map(|(i, c)| c.find_cut_line(pos).map(|span| (i, span)));
        let (idx, (start, end)) = found
            .ok_or_else(|| EditError::OutOfRange(format!("no cut line near {pos}")))?;

        let host_start = self.clips[idx].start_time();
        let host_end = self.clips[idx].end_time();
        let dur = end - start;

        if !self.settings.clips_can_move {
            for (i, clip) in self.clips.iter().enumerate() {
                if i != idx
                    && clip.start_time() > host_start
                    && host_end + dur > clip.start_time()
                {
                    return Err(EditError::InsufficientSpace(
                        "not enough room to expand the cut line".into(),
                    ));
                }
            }
        }

        self.clips[idx].expand_cut_line(pos)?;

        if self.settings.clips_can_move {
            for (i, clip) in self.clips.iter_mut().enumerate() {
                if i != idx && clip.start_time() > host_start {
                    clip.shift(dur);
                }
            }
        }
        self.locations_dirty = true;
        Ok((start, end))
    }

    /// Permanently discard the cut line near `pos`
    pub fn remove_cut_line(&mut self, pos: f64) -> bool {
        for clip in &mut self.clips {
            if clip.remove_cut_line(pos) {
                self.locations_dirty = true;
                return true;
            }
        }
        false
    }

    // ────────────────────────────────────────────────────────────────────
    // Drag/slide feasibility and clip transfer
    // ────────────────────────────────────────────────────────────────────

    /// Largest part of `amount` clip `idx` can move without overlapping a
    /// neighbour; zero when no move is possible
    pub fn can_offset_clip(&self, idx: usize, amount: f64) -> f64 {
        let Some(clip) = self.clips.get(idx) else {
            return 0.0;
        };

        let mut allowed = amount;
        for (i, c) in self.clips.iter().enumerate() {
            if i == idx {
                continue;
            }
            if c.start_time() < clip.end_time() + amount
                && c.end_time() > clip.start_time() + amount
            {
                if amount > 0.0 {
                    allowed = allowed.min(c.start_time() - clip.end_time()).max(0.0);
                } else {
                    allowed = allowed.max(c.end_time() - clip.start_time()).min(0.0);
                }
            }
        }
        if allowed == amount {
            return allowed;
        }
        // The clamped amount must itself be conflict-free; play safe
        // otherwise.
        if self.offset_is_free(idx, allowed) {
            allowed
        } else {
            0.0
        }
    }

    fn offset_is_free(&self, idx: usize, amount: f64) -> bool {
        let clip = &self.clips[idx];
        self.clips.iter().enumerate().all(|(i, c)| {
            i == idx
                || c.start_time() >= clip.end_time() + amount
                || c.end_time() <= clip.start_time() + amount
        })
    }

    /// Whether a foreign clip would fit at its current position
    pub fn can_insert_clip(&self, clip: &Clip) -> bool {
        !self.clips.iter().any(|c| {
            c.start_time() < clip.end_time() && c.end_time() > clip.start_time()
        })
    }

    /// Transfer ownership of clip `idx` to another track
    pub fn move_clip_to_track(&mut self, idx: usize, dest: &mut Track) -> EditResult<()> {
        if idx >= self.clips.len() {
            return Err(EditError::OutOfRange(format!(
                "clip index {idx} out of {}",
                self.clips.len()
            )));
        }
        let clip = self.clips.remove(idx);
        dest.clips.push(clip);
        self.locations_dirty = true;
        dest.locations_dirty = true;
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────
    // Recording path, resample, locking
    // ────────────────────────────────────────────────────────────────────

    /// Append recorded samples to the last clip (creating one if needed)
    pub fn append(&mut self, buf: &[f32]) -> EditResult<()> {
        self.locations_dirty = true;
        self.last_or_create_clip().append(buf)
    }

    /// Persistence barrier for the underlying store
    pub fn flush(&self) -> EditResult<()> {
        self.store.flush()?;
        Ok(())
    }

    /// Convert every clip to a new rate. All clips are converted before
    /// any is committed, so a failure leaves the track unchanged.
    pub fn resample(&mut self, new_rate: u32) -> EditResult<()> {
        let mut converted = self.clips.clone();
        for clip in &mut converted {
            clip.resample(new_rate)?;
        }
        self.clips = converted;
        self.rate = new_rate;
        self.locations_dirty = true;
        Ok(())
    }

    /// Pin all clips' storage while another document reads this track
    pub fn lock(&self) {
        for clip in &self.clips {
            clip.lock();
        }
    }

    pub fn unlock(&self) {
        for clip in &self.clips {
            clip.unlock();
        }
    }

    // ────────────────────────────────────────────────────────────────────
    // Location cache
    // ────────────────────────────────────────────────────────────────────

    /// Whether the cache needs a rebuild before its next read
    pub fn locations_dirty(&self) -> bool {
        self.locations_dirty
    }

    /// Rebuild the derived index of cut lines and merge points. A pure
    /// function of clip state; rebuilding twice yields identical results.
    pub fn update_location_cache(&mut self) {
        let mut locations = Vec::new();
        let order = self.sorted_clip_indices();

        for (k, &i) in order.iter().enumerate() {
            let clip = &self.clips[i];
            for cl in clip.cut_lines() {
                locations.push(Location {
                    position: clip.offset() + cl.position,
                    kind: LocationKind::CutLine,
                });
            }
            if k > 0 {
                let prev = &self.clips[order[k - 1]];
                if (prev.end_time() - clip.start_time()).abs()
                    < self.settings.merge_point_tolerance
                {
                    locations.push(Location {
                        position: prev.end_time(),
                        kind: LocationKind::MergePoint {
                            left: order[k - 1],
                            right: i,
                        },
                    });
                }
            }
        }

        self.locations = locations;
        self.locations_dirty = false;
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }
}
