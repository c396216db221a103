//! Piecewise-linear gain envelope
//!
//! A sorted sequence of (time, gain) control points with linear
//! interpolation between them, attached to a clip. Times are clip-relative
//! seconds. An envelope with no points is flat at unity gain.
//!
//! Structural edits must keep the curve's shape intact across boundaries:
//! any operation that removes or inserts time first freezes the curve's
//! value at the new edges as explicit points, so the surviving segments
//! reproduce the original curve on their own.

use serde::{Deserialize, Serialize};

/// Gain of an envelope with no control points
pub const ENVELOPE_DEFAULT_VALUE: f64 = 1.0;

/// Two control points closer than this are considered the same point
const POINT_TIME_EPSILON: f64 = 1e-9;

/// Single envelope control point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvPoint {
    /// Time in clip-relative seconds
    pub time: f64,
    /// Gain factor at this time
    pub value: f64,
}

/// Piecewise-linear time/gain curve
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Control points, sorted by time
    points: Vec<EnvPoint>,
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a point list (sorts by time)
    pub fn from_points(mut points: Vec<EnvPoint>) -> Self {
        points.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { points }
    }

    pub fn points(&self) -> &[EnvPoint] {
        &self.points
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Get the interpolated gain at a time
    pub fn value_at(&self, t: f64) -> f64 {
        if self.points.is_empty() {
            return ENVELOPE_DEFAULT_VALUE;
        }

        let idx = self.points.partition_point(|p| p.time < t);

        if idx == 0 {
            return self.points[0].value;
        }
        if idx == self.points.len() {
            return self.points[idx - 1].value;
        }

        let p1 = self.points[idx - 1];
        let p2 = self.points[idx];
        let span = p2.time - p1.time;
        if span <= 0.0 {
            return p2.value;
        }
        let frac = (t - p1.time) / span;
        p1.value + (p2.value - p1.value) * frac
    }

    /// Fill a buffer with gains sampled on a fixed grid starting at `t0`
    pub fn values(&self, out: &mut [f64], t0: f64, tstep: f64) {
        for (i, v) in out.iter_mut().enumerate() {
            *v = self.value_at(t0 + tstep * i as f64);
        }
    }

    /// Insert a control point, maintaining sorted order. A point within
    /// epsilon of an existing one replaces it.
    pub fn insert(&mut self, t: f64, value: f64) {
        let idx = self.points.partition_point(|p| p.time < t - POINT_TIME_EPSILON);
        if idx < self.points.len() && (self.points[idx].time - t).abs() <= POINT_TIME_EPSILON {
            self.points[idx].value = value;
        } else {
            self.points.insert(idx, EnvPoint { time: t, value });
        }
    }

    /// Remove the region `[t0, t1)` and close the gap, shifting later
    /// points earlier. Callers freeze boundary values first.
    pub fn collapse_region(&mut self, t0: f64, t1: f64) {
        if t1 <= t0 {
            return;
        }
        let removed = t1 - t0;
        self.points.retain(|p| p.time < t0 || p.time >= t1);
        for p in &mut self.points {
            if p.time >= t1 {
                p.time -= removed;
            }
        }
    }

    /// Open a flat stretch of length `dt` at `t`, shifting later points
    /// right. The stretch holds the value the curve had at `t`.
    pub fn expand_region(&mut self, t: f64, dt: f64) {
        if dt <= 0.0 || self.points.is_empty() {
            return;
        }
        let v = self.value_at(t);
        for p in &mut self.points {
            if p.time >= t {
                p.time += dt;
            }
        }
        self.insert(t, v);
        self.insert(t + dt, v);
    }

    /// Splice another envelope's curve in at `t`, where `other_len` is the
    /// duration of the spliced content in seconds. The host curve resumes
    /// with its pre-splice value at `t + other_len`; an empty source leaves
    /// the opened stretch flat.
    pub fn paste(&mut self, t: f64, other: &Envelope, other_len: f64) {
        if self.points.is_empty() && other.points.is_empty() {
            return;
        }

        let v = self.value_at(t);
        let had_tail = self.points.iter().any(|p| p.time >= t);

        for p in &mut self.points {
            if p.time >= t {
                p.time += other_len;
            }
        }

        if other.points.is_empty() {
            self.insert(t, v);
            self.insert(t + other_len, v);
            return;
        }

        if had_tail {
            self.insert(t + other_len, v);
        }
        for p in &other.points {
            self.insert(t + p.time, p.value);
        }
    }

    /// Copy the curve over `[t0, t1]` into a new envelope rebased to zero,
    /// with the boundary values frozen as explicit points.
    pub fn extract_range(&self, t0: f64, t1: f64) -> Envelope {
        if self.points.is_empty() || t1 <= t0 {
            return Envelope::new();
        }

        let v0 = self.value_at(t0);
        let v1 = self.value_at(t1);

        let mut env = Envelope {
            points: self
                .points
                .iter()
                .filter(|p| p.time >= t0 && p.time <= t1)
                .map(|p| EnvPoint {
                    time: p.time - t0,
                    value: p.value,
                })
                .collect(),
        };
        env.insert(0.0, v0);
        env.insert(t1 - t0, v1);
        env
    }
}
