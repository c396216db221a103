//! Time/sample conversion helpers
//!
//! Track time is measured in seconds (f64), sample positions in i64.
//! All conversions round to the nearest sample so that edits land exactly
//! on the requested sample boundary regardless of floating point drift.

/// Convert seconds to a sample position at the given rate (round to nearest)
#[inline]
pub fn time_to_samples(t: f64, rate: u32) -> i64 {
    (t * rate as f64 + 0.5).floor() as i64
}

/// Convert a sample position to seconds at the given rate
#[inline]
pub fn samples_to_time(s: i64, rate: u32) -> f64 {
    s as f64 / rate as f64
}

/// Duration of a single sample in seconds
#[inline]
pub fn sample_period(rate: u32) -> f64 {
    1.0 / rate as f64
}

/// Snap a time to the sample grid at the given rate
#[inline]
pub fn snap_to_sample(t: f64, rate: u32) -> f64 {
    samples_to_time(time_to_samples(t, rate), rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_nearest() {
        assert_eq!(time_to_samples(0.5, 1000), 500);
        assert_eq!(time_to_samples(0.0004, 1000), 0);
        assert_eq!(time_to_samples(0.0006, 1000), 1);
    }

    #[test]
    fn test_snap_is_idempotent() {
        let t = snap_to_sample(0.123456, 44100);
        assert_eq!(t, snap_to_sample(t, 44100));
    }

    #[test]
    fn test_negative_positions() {
        assert_eq!(time_to_samples(-1.0, 48000), -48000);
        assert_eq!(samples_to_time(-48000, 48000), -1.0);
    }
}
