//! Audio clip with envelope and cut lines
//!
//! A clip is the unit of non-destructive editing: one contiguous run of
//! samples at a fixed rate, positioned on the track timeline by an offset
//! in seconds, with its own gain envelope and a private list of cut lines.
//! A cut line is a hidden nested clip holding provisionally deleted audio;
//! expanding it re-splices the audio without loss, removing it is the only
//! truly destructive operation and never happens as a side effect.
//!
//! Public time-range operations take track-absolute seconds; `get`/`set`
//! take sample indices within the clip.

use std::sync::Arc;

use wf_core::{
    EditError, EditResult, Envelope, sample_period, samples_to_time, time_to_samples,
};
use wf_store::{SampleStore, Sequence};

/// Samples processed per chunk when resampling
const RESAMPLE_CHUNK: usize = 65_536;

/// Provisionally deleted audio, re-expandable at `position`
#[derive(Debug, Clone)]
pub struct CutLine {
    /// Clip-relative seconds of the removed span's start
    pub position: f64,
    /// The removed audio, rebased to offset zero
    pub clip: Clip,
}

/// One contiguous, independently editable run of audio samples
#[derive(Debug, Clone)]
pub struct Clip {
    /// Track-time start in seconds
    offset: f64,
    /// Sample rate in Hz
    rate: u32,
    sequence: Sequence,
    envelope: Envelope,
    cut_lines: Vec<CutLine>,
    /// Set by every sample mutation; display caches poll and reset it
    changed: bool,
}

impl Clip {
    pub fn new(store: Arc<dyn SampleStore>, rate: u32) -> Self {
        Self {
            offset: 0.0,
            rate,
            sequence: Sequence::new(store),
            envelope: Envelope::new(),
            cut_lines: Vec::new(),
            changed: false,
        }
    }

    pub(crate) fn from_parts(
        offset: f64,
        rate: u32,
        sequence: Sequence,
        envelope: Envelope,
        cut_lines: Vec<CutLine>,
    ) -> Self {
        Self {
            offset,
            rate,
            sequence,
            envelope,
            cut_lines,
            changed: false,
        }
    }

    // ────────────────────────────────────────────────────────────────────
    // Position and extent
    // ────────────────────────────────────────────────────────────────────

    #[inline]
    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: f64) {
        self.offset = offset;
    }

    /// Move the clip by a time delta
    pub fn shift(&mut self, dt: f64) {
        self.offset += dt;
    }

    #[inline]
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Reinterpret the samples at a new rate without converting them
    pub fn set_rate(&mut self, rate: u32) {
        self.rate = rate;
    }

    #[inline]
    pub fn num_samples(&self) -> u64 {
        self.sequence.num_samples()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    #[inline]
    pub fn start_time(&self) -> f64 {
        self.offset
    }

    #[inline]
    pub fn end_time(&self) -> f64 {
        self.offset + self.duration()
    }

    #[inline]
    pub fn duration(&self) -> f64 {
        samples_to_time(self.num_samples() as i64, self.rate)
    }

    /// First sample of the clip in absolute track coordinates
    #[inline]
    pub fn start_sample(&self) -> i64 {
        time_to_samples(self.offset, self.rate)
    }

    /// One past the last sample in absolute track coordinates
    #[inline]
    pub fn end_sample(&self) -> i64 {
        self.start_sample() + self.num_samples() as i64
    }

    /// Whether an absolute time falls inside the clip
    pub fn contains_time(&self, t: f64) -> bool {
        t >= self.start_time() && t < self.end_time()
    }

    /// Map an absolute time to a sample index within the clip, clamped to
    /// the clip's extent
    pub fn time_to_samples_clip(&self, t: f64) -> u64 {
        let s = time_to_samples(t - self.offset, self.rate);
        (s.max(0) as u64).min(self.num_samples())
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Mutable envelope access for the automation editing layer
    pub fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    pub fn cut_lines(&self) -> &[CutLine] {
        &self.cut_lines
    }

    #[inline]
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    pub fn reset_changed(&mut self) {
        self.changed = false;
    }

    // ────────────────────────────────────────────────────────────────────
    // Samples
    // ────────────────────────────────────────────────────────────────────

    /// Read samples starting at a clip-relative index
    pub fn get(&self, out: &mut [f32], start: u64) -> EditResult<()> {
        self.sequence.get(out, start)
    }

    /// Overwrite samples starting at a clip-relative index
    pub fn set(&mut self, buf: &[f32], start: u64) -> EditResult<()> {
        self.sequence.set(buf, start)?;
        self.changed = true;
        Ok(())
    }

    /// Overwrite a clip-relative sample range with silence
    pub fn set_silence(&mut self, start: u64, len: u64) -> EditResult<()> {
        self.sequence.set_silence(start, len)?;
        self.changed = true;
        Ok(())
    }

    /// Record new samples onto the end of the clip
    pub fn append(&mut self, buf: &[f32]) -> EditResult<()> {
        self.sequence.append(buf)?;
        self.changed = true;
        Ok(())
    }

    /// Persistence barrier for the underlying store
    pub fn flush(&self) -> EditResult<()> {
        self.sequence.store().flush()?;
        Ok(())
    }

    /// Min/max sample values over an absolute time range
    pub fn get_min_max(&self, t0: f64, t1: f64) -> EditResult<(f32, f32)> {
        let t0 = t0.max(self.start_time());
        let t1 = t1.min(self.end_time());
        if t1 <= t0 {
            return Ok((0.0, 0.0));
        }
        let s0 = self.time_to_samples_clip(t0);
        let s1 = self.time_to_samples_clip(t1);
        self.sequence.get_min_max(s0, s1 - s0)
    }

    // ────────────────────────────────────────────────────────────────────
    // Structural edits
    // ────────────────────────────────────────────────────────────────────

    /// Remove the absolute time range `[t0, t1)` from the clip, closing
    /// the gap. The envelope's value is frozen as explicit points at both
    /// new edges first, so the surviving curve keeps its shape. Cut lines
    /// inside the range are discarded, later ones shift left.
    pub fn clear(&mut self, t0: f64, t1: f64) -> EditResult<()> {
        let t0 = t0.max(self.start_time());
        let t1 = t1.min(self.end_time());
        if t1 <= t0 {
            return Ok(());
        }

        let s0 = self.time_to_samples_clip(t0);
        let s1 = self.time_to_samples_clip(t1);
        if s1 <= s0 {
            return Ok(());
        }
        let rel0 = samples_to_time(s0 as i64, self.rate);
        let rel1 = samples_to_time(s1 as i64, self.rate);

        // The left pin sits on the last surviving sample and takes the
        // curve's own value there, so the left segment keeps its exact
        // shape; the right pin snapshots the value at t1 for the segment
        // that slides in.
        let pin = rel0 - sample_period(self.rate);
        let freeze_left = (s0 > 0 && self.envelope.num_points() > 0)
            .then(|| (pin, self.envelope.value_at(pin)));
        let freeze_right = (s1 < self.num_samples() && self.envelope.num_points() > 0)
            .then(|| (rel1, self.envelope.value_at(rel1)));

        self.sequence.delete(s0, s1 - s0)?;

        if let Some((t, v)) = freeze_left {
            self.envelope.insert(t, v);
        }
        if let Some((t, v)) = freeze_right {
            self.envelope.insert(t, v);
        }
        self.envelope.collapse_region(rel0, rel1);

        let removed = rel1 - rel0;
        self.cut_lines
            .retain(|cl| cl.position < rel0 || cl.position >= rel1);
        for cl in &mut self.cut_lines {
            if cl.position >= rel1 {
                cl.position -= removed;
            }
        }

        self.changed = true;
        Ok(())
    }

    /// Like `clear`, but the removed span is detached into a hidden clip
    /// recorded as a cut line instead of being discarded
    pub fn clear_and_add_cut_line(&mut self, t0: f64, t1: f64) -> EditResult<()> {
        let t0 = t0.max(self.start_time());
        let t1 = t1.min(self.end_time());
        if t1 <= t0 {
            return Ok(());
        }

        let mut hidden = self.copy_range(t0, t1)?;
        let rel0 = samples_to_time(self.time_to_samples_clip(t0) as i64, self.rate);
        let rel1 = samples_to_time(self.time_to_samples_clip(t1) as i64, self.rate);

        // Cut lines inside the span move into the hidden clip instead of
        // being discarded by the clear below.
        let mut moved = Vec::new();
        let mut i = 0;
        while i < self.cut_lines.len() {
            if self.cut_lines[i].position >= rel0 && self.cut_lines[i].position < rel1 {
                moved.push(self.cut_lines.remove(i));
            } else {
                i += 1;
            }
        }

        if let Err(e) = self.clear(t0, t1) {
            self.cut_lines.extend(moved);
            return Err(e);
        }

        for mut cl in moved {
            cl.position -= rel0;
            hidden.cut_lines.push(cl);
        }
        self.cut_lines.push(CutLine {
            position: rel0,
            clip: hidden,
        });
        Ok(())
    }

    /// Find a cut line near the absolute time `pos`; returns the absolute
    /// start/end the hidden audio would occupy when expanded
    pub fn find_cut_line(&self, pos: f64) -> Option<(f64, f64)> {
        let idx = self.cut_line_index(pos)?;
        let cl = &self.cut_lines[idx];
        let start = self.offset + cl.position;
        Some((start, start + cl.clip.duration()))
    }

    fn cut_line_index(&self, pos: f64) -> Option<usize> {
        let rel = pos - self.offset;
        let tolerance = sample_period(self.rate) * 0.5;
        self.cut_lines
            .iter()
            .position(|cl| (cl.position - rel).abs() < tolerance)
    }

    /// Re-splice the hidden clip at `pos` back into this clip, shifting
    /// everything after it later. The exact inverse of
    /// `clear_and_add_cut_line`. Returns the re-expanded span.
    pub fn expand_cut_line(&mut self, pos: f64) -> EditResult<(f64, f64)> {
        let idx = self
            .cut_line_index(pos)
            .ok_or_else(|| EditError::OutOfRange(format!("no cut line at {pos}")))?;

        let cl = self.cut_lines.remove(idx);
        let at = self.offset + cl.position;
        let end = at + cl.clip.duration();
        match self.paste(at, &cl.clip) {
            Ok(()) => Ok((at, end)),
            Err(e) => {
                self.cut_lines.insert(idx, cl);
                Err(e)
            }
        }
    }

    /// Permanently discard the hidden clip at `pos` without re-splicing
    pub fn remove_cut_line(&mut self, pos: f64) -> bool {
        match self.cut_line_index(pos) {
            Some(idx) => {
                self.cut_lines.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Splice another clip's entire contents in at absolute time `t`.
    /// Fails unless `t` lies within `[start_time, end_time]`. A source at
    /// a different rate is resampled first.
    pub fn paste(&mut self, t: f64, other: &Clip) -> EditResult<()> {
        if t < self.start_time() || t > self.end_time() {
            return Err(EditError::OutOfRange(format!(
                "paste at {t} outside clip [{}, {}]",
                self.start_time(),
                self.end_time()
            )));
        }

        let converted;
        let src = if other.rate != self.rate {
            let mut c = other.clone();
            c.resample(self.rate)?;
            converted = c;
            &converted
        } else {
            other
        };

        let s = self.time_to_samples_clip(t);
        let rel = samples_to_time(s as i64, self.rate);
        let dur = src.duration();

        self.sequence.paste(s, &src.sequence)?;
        self.envelope.paste(rel, &src.envelope, dur);

        for cl in &mut self.cut_lines {
            if cl.position >= rel {
                cl.position += dur;
            }
        }
        for cl in &src.cut_lines {
            self.cut_lines.push(CutLine {
                position: cl.position + rel,
                clip: cl.clip.clone(),
            });
        }

        self.changed = true;
        Ok(())
    }

    /// Insert zero-valued samples at absolute time `t`, shifting what
    /// follows later. The envelope gains a flat stretch over the silence.
    pub fn insert_silence(&mut self, t: f64, duration: f64) -> EditResult<()> {
        if t < self.start_time() || t > self.end_time() {
            return Err(EditError::OutOfRange(format!(
                "insert_silence at {t} outside clip [{}, {}]",
                self.start_time(),
                self.end_time()
            )));
        }
        let len = time_to_samples(duration, self.rate);
        if len <= 0 {
            return Ok(());
        }

        let s = self.time_to_samples_clip(t);
        let rel = samples_to_time(s as i64, self.rate);
        let dur = samples_to_time(len, self.rate);

        self.sequence.insert_silence(s, len as u64)?;
        self.envelope.expand_region(rel, dur);
        for cl in &mut self.cut_lines {
            if cl.position >= rel {
                cl.position += dur;
            }
        }

        self.changed = true;
        Ok(())
    }

    /// Split the clip at absolute time `t` (snapped to the sample grid),
    /// keeping the left half in place and returning the right half offset
    /// at `t`. The envelope's boundary value is frozen into both halves.
    pub fn split_at(&mut self, t: f64) -> EditResult<Clip> {
        let s = self.time_to_samples_clip(t);
        if s == 0 || s >= self.num_samples() {
            return Err(EditError::OutOfRange(format!(
                "split at {t} not strictly inside clip [{}, {}]",
                self.start_time(),
                self.end_time()
            )));
        }
        let rel = samples_to_time(s as i64, self.rate);
        let t = self.offset + rel;

        if self.envelope.num_points() > 0 {
            let pin = rel - sample_period(self.rate);
            let left_v = self.envelope.value_at(pin);
            let right_v = self.envelope.value_at(rel);
            self.envelope.insert(pin, left_v);
            self.envelope.insert(rel, right_v);
        }

        // Build the right half completely before mutating self, so a
        // failure leaves this clip unchanged.
        let mut right = self.clone();
        right.clear(right.start_time(), t)?;
        right.set_offset(t);

        self.clear(t, self.end_time())?;
        Ok(right)
    }

    /// Copy the absolute time range `[t0, t1)` into a new clip rebased to
    /// offset zero. Cut lines are not copied; sample storage is shared.
    pub fn copy_range(&self, t0: f64, t1: f64) -> EditResult<Clip> {
        let s0 = self.time_to_samples_clip(t0);
        let s1 = self.time_to_samples_clip(t1);
        let rel0 = samples_to_time(s0 as i64, self.rate);
        let rel1 = samples_to_time(s1 as i64, self.rate);

        Ok(Clip {
            offset: 0.0,
            rate: self.rate,
            sequence: self.sequence.copy(s0, s1)?,
            envelope: self.envelope.extract_range(rel0, rel1),
            cut_lines: Vec::new(),
            changed: false,
        })
    }

    /// Rewrite the samples at a new rate (linear interpolation). On
    /// failure the clip keeps its previous, readable state.
    pub fn resample(&mut self, new_rate: u32) -> EditResult<()> {
        if new_rate == self.rate {
            return Ok(());
        }
        if new_rate == 0 {
            return Err(EditError::OutOfRange("invalid sample rate 0".into()));
        }

        let num = self.sequence.num_samples();
        let mut dest = Sequence::new(Arc::clone(self.sequence.store()));

        if num > 0 {
            let ratio = self.rate as f64 / new_rate as f64;
            let new_len = num * new_rate as u64 / self.rate as u64;
            let mut out = Vec::with_capacity(RESAMPLE_CHUNK);
            let mut done: u64 = 0;
            while done < new_len {
                let n = RESAMPLE_CHUNK.min((new_len - done) as usize);
                let first_src = (done as f64 * ratio).floor() as u64;
                let last_src =
                    ((((done + n as u64 - 1) as f64) * ratio).floor() as u64 + 1).min(num - 1);
                let mut src = vec![0.0f32; (last_src - first_src + 1) as usize];
                self.sequence.get(&mut src, first_src)?;

                out.clear();
                for i in 0..n {
                    let pos = (done + i as u64) as f64 * ratio;
                    let idx = (pos.floor() as u64 - first_src) as usize;
                    let frac = (pos - pos.floor()) as f32;
                    let s0 = src[idx];
                    let s1 = if idx + 1 < src.len() { src[idx + 1] } else { s0 };
                    out.push(s0 + (s1 - s0) * frac);
                }
                dest.append(&out)?;
                done += n as u64;
            }
        }

        // Hidden clips must follow the parent's rate so a later expansion
        // splices cleanly.
        let mut cut_lines = self.cut_lines.clone();
        for cl in &mut cut_lines {
            cl.clip.resample(new_rate)?;
        }

        self.sequence = dest;
        self.cut_lines = cut_lines;
        self.rate = new_rate;
        self.changed = true;
        Ok(())
    }

    /// Pin the clip's storage (and its cut lines') against eviction while
    /// another document reads it
    pub fn lock(&self) {
        self.sequence.lock();
        for cl in &self.cut_lines {
            cl.clip.lock();
        }
    }

    pub fn unlock(&self) {
        self.sequence.unlock();
        for cl in &self.cut_lines {
            cl.clip.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_store::MemoryStore;

    const RATE: u32 = 1000;

    fn store() -> Arc<dyn SampleStore> {
        Arc::new(MemoryStore::with_max_block_len(256))
    }

    fn ramp_clip(n: usize) -> Clip {
        let mut clip = Clip::new(store(), RATE);
        let data: Vec<f32> = (0..n).map(|i| i as f32).collect();
        clip.append(&data).unwrap();
        clip
    }

    fn read_all(clip: &Clip) -> Vec<f32> {
        let mut out = vec![0.0f32; clip.num_samples() as usize];
        clip.get(&mut out, 0).unwrap();
        out
    }

    #[test]
    fn test_extent() {
        let mut clip = ramp_clip(500);
        clip.set_offset(1.0);
        assert_eq!(clip.start_time(), 1.0);
        assert_eq!(clip.end_time(), 1.5);
        assert_eq!(clip.start_sample(), 1000);
        assert_eq!(clip.end_sample(), 1500);
        assert!(clip.contains_time(1.25));
        assert!(!clip.contains_time(1.5));
    }

    #[test]
    fn test_get_set() {
        let mut clip = ramp_clip(100);
        clip.reset_changed();
        clip.set(&[-1.0, -2.0], 10).unwrap();
        assert!(clip.is_changed());
        let all = read_all(&clip);
        assert_eq!(all[10], -1.0);
        assert_eq!(all[11], -2.0);

        let mut out = [0.0f32; 10];
        assert!(clip.get(&mut out, 95).is_err());
    }

    #[test]
    fn test_clear_contracts_and_freezes_envelope() {
        let mut clip = ramp_clip(1000);
        // Ramp envelope 0 → 1 over the clip.
        let mut env = Envelope::new();
        env.insert(0.0, 0.0);
        env.insert(1.0, 1.0);
        clip.envelope = env;

        clip.clear(0.2, 0.3).unwrap();
        assert_eq!(clip.num_samples(), 900);
        let all = read_all(&clip);
        assert_eq!(all[199], 199.0);
        assert_eq!(all[200], 300.0);

        // The envelope reproduces the original curve on both sides of the
        // seam: just before it the original value at 0.2, just after it
        // the original value at 0.3.
        assert!((clip.envelope().value_at(0.15) - 0.15).abs() < 1e-6);
        assert!((clip.envelope().value_at(0.2) - 0.3).abs() < 1e-6);
        assert!((clip.envelope().value_at(0.6) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_cut_line_roundtrip() {
        let mut clip = ramp_clip(1000);
        let original = read_all(&clip);

        clip.clear_and_add_cut_line(0.2, 0.3).unwrap();
        assert_eq!(clip.num_samples(), 900);
        assert_eq!(clip.cut_lines().len(), 1);
        let (start, end) = clip.find_cut_line(0.2).unwrap();
        assert_eq!(start, 0.2);
        assert!((end - 0.3).abs() < 1e-9);

        let (s, e) = clip.expand_cut_line(0.2).unwrap();
        assert_eq!((s, e), (start, end));
        assert_eq!(clip.cut_lines().len(), 0);
        assert_eq!(read_all(&clip), original);
    }

    #[test]
    fn test_clear_drops_covered_cut_lines_and_shifts_later() {
        let mut clip = ramp_clip(1000);
        clip.clear_and_add_cut_line(0.1, 0.15).unwrap();
        clip.clear_and_add_cut_line(0.5, 0.55).unwrap();
        assert_eq!(clip.cut_lines().len(), 2);

        // Clearing over the first cut line discards it; the second shifts.
        clip.clear(0.05, 0.2).unwrap();
        assert_eq!(clip.cut_lines().len(), 1);
        assert!((clip.cut_lines()[0].position - 0.35).abs() < 1e-9);
    }

    #[test]
    fn test_remove_cut_line_is_permanent() {
        let mut clip = ramp_clip(1000);
        clip.clear_and_add_cut_line(0.2, 0.3).unwrap();
        assert!(clip.remove_cut_line(0.2));
        assert!(!clip.remove_cut_line(0.2));
        assert_eq!(clip.num_samples(), 900);
        assert!(clip.expand_cut_line(0.2).is_err());
    }

    #[test]
    fn test_paste_bounds() {
        let mut clip = ramp_clip(100);
        let other = ramp_clip(10);
        assert!(clip.paste(0.2, &other).is_err());
        clip.paste(0.1, &other).unwrap(); // exactly at the end is allowed
        assert_eq!(clip.num_samples(), 110);
    }

    #[test]
    fn test_paste_splices_samples() {
        let mut clip = ramp_clip(100);
        let other = ramp_clip(10);
        clip.paste(0.05, &other).unwrap();
        let all = read_all(&clip);
        assert_eq!(all[49], 49.0);
        assert_eq!(all[50], 0.0);
        assert_eq!(all[59], 9.0);
        assert_eq!(all[60], 50.0);
    }

    #[test]
    fn test_paste_resamples_other_rate() {
        let mut clip = ramp_clip(1000); // 1 s at 1000 Hz
        let mut other = Clip::new(store(), 500);
        other.append(&vec![0.25f32; 500]).unwrap(); // 1 s at 500 Hz

        clip.paste(0.5, &other).unwrap();
        // One second of audio was inserted regardless of source rate.
        assert_eq!(clip.num_samples(), 2000);
        assert!((clip.duration() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_insert_silence() {
        let mut clip = ramp_clip(100);
        clip.clear_and_add_cut_line(0.08, 0.09).unwrap();
        clip.insert_silence(0.05, 0.02).unwrap();
        assert_eq!(clip.num_samples(), 110);
        let all = read_all(&clip);
        assert_eq!(all[49], 49.0);
        assert!(all[50..70].iter().all(|&s| s == 0.0));
        assert_eq!(all[70], 50.0);
        // The cut line after the insertion point moved with its audio.
        assert!((clip.cut_lines()[0].position - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_copy_range() {
        let clip = ramp_clip(1000);
        let copy = clip.copy_range(0.25, 0.75).unwrap();
        assert_eq!(copy.offset(), 0.0);
        assert_eq!(copy.num_samples(), 500);
        let all = read_all(&copy);
        assert_eq!(all[0], 250.0);
        assert_eq!(all[499], 749.0);
    }

    #[test]
    fn test_resample_preserves_shape_and_duration() {
        let mut clip = ramp_clip(1000);
        clip.resample(500).unwrap();
        assert_eq!(clip.rate(), 500);
        assert_eq!(clip.num_samples(), 500);
        assert!((clip.duration() - 1.0).abs() < 1e-9);
        let all = read_all(&clip);
        // The ramp survives linear resampling exactly.
        assert!((all[250] - 500.0).abs() < 1e-3);
    }

    #[test]
    fn test_split_at() {
        let mut clip = ramp_clip(1000);
        let right = clip.split_at(0.4).unwrap();
        assert_eq!(clip.num_samples(), 400);
        assert_eq!(right.num_samples(), 600);
        assert_eq!(right.offset(), 0.4);
        assert_eq!(read_all(&right)[0], 400.0);

        assert!(clip.split_at(0.0).is_err());
        assert!(clip.split_at(0.4).is_err());
    }

    #[test]
    fn test_resample_same_rate_is_noop() {
        let mut clip = ramp_clip(100);
        let before = read_all(&clip);
        clip.resample(RATE).unwrap();
        assert_eq!(read_all(&clip), before);
    }
}
