//! Editing engine integration tests
//!
//! Exercises the track-level editing laws end to end:
//! - Cut → paste reproduces the original samples bit-exactly
//! - Split → join restores samples and envelope
//! - No two clips ever overlap after any operation sequence
//! - Expand-cut-line is the exact inverse of clear-with-cut-line
//! - Location cache rebuilds are idempotent
//! - Dual-mode paste, sliding vs. fixed clip behaviour

use std::sync::Arc;

use wf_core::EditSettings;
use wf_edit::Track;
use wf_store::{MemoryStore, SampleStore};

const RATE: u32 = 1000;

fn store() -> Arc<dyn SampleStore> {
    let _ = env_logger::builder().is_test(true).try_init();
    Arc::new(MemoryStore::with_max_block_len(256))
}

/// Deterministic non-zero test signal
fn signal(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let t = i as f64 / RATE as f64;
            (2.0 * std::f64::consts::PI * 50.0 * t).sin() as f32 + 2.0
        })
        .collect()
}

fn make_track(data: &[f32]) -> Track {
    let mut track = Track::new(store(), RATE);
    track.append(data).unwrap();
    track
}

fn read(track: &Track, start: i64, len: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; len];
    track.get(&mut out, start).unwrap();
    out
}

/// Every pair of clips must respect the overlap tolerance
fn assert_no_overlap(track: &Track) {
    let tolerance = track.settings().merge_point_tolerance;
    for i in 0..track.num_clips() {
        for j in 0..track.num_clips() {
            if i == j {
                continue;
            }
            let a = track.clip(i).unwrap();
            let b = track.clip(j).unwrap();
            let overlap = a.end_time().min(b.end_time()) - a.start_time().max(b.start_time());
            assert!(
                overlap <= tolerance,
                "clips {i} and {j} overlap by {overlap}"
            );
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ROUND-TRIP LAWS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_cut_paste_roundtrip_is_bit_exact() {
    let data = signal(1000);
    let mut track = make_track(&data);

    let removed = track.cut(0.2, 0.5).unwrap();
    assert_eq!(track.clip(0).unwrap().num_samples(), 700);

    track.paste(0.2, &removed).unwrap();
    assert_eq!(read(&track, 0, 1000), data);
    assert_no_overlap(&track);
}

#[test]
fn test_cut_paste_roundtrip_multi_clip() {
    let data = signal(1000);
    let mut track = make_track(&data);
    track.split_at(0.4).unwrap();

    let removed = track.cut(0.2, 0.7).unwrap();
    track.paste(0.2, &removed).unwrap();

    // Clip boundaries may differ; the sample content over the cut range
    // (and everything before it) must not.
    assert_eq!(read(&track, 0, 700)[..], data[..700]);
    assert_no_overlap(&track);
}

#[test]
fn test_split_join_restores_samples_and_envelope() {
    let data = signal(1000);
    let mut track = make_track(&data);
    {
        let env = track.clip_mut(0).unwrap().envelope_mut();
        env.insert(0.0, 0.0);
        env.insert(1.0, 1.0);
    }
    let mut before = vec![0.0f64; 100];
    track.get_envelope_values(&mut before, 0.0, 0.01);

    track.split(0.4, 0.4).unwrap();
    assert_eq!(track.num_clips(), 2);
    track.join(0.0, 1.0).unwrap();
    assert_eq!(track.num_clips(), 1);

    assert_eq!(read(&track, 0, 1000), data);

    let mut after = vec![0.0f64; 100];
    track.get_envelope_values(&mut after, 0.0, 0.01);
    for (i, (a, b)) in before.iter().zip(after.iter()).enumerate() {
        assert!((a - b).abs() < 1e-6, "envelope diverged at step {i}: {a} vs {b}");
    }
    assert_no_overlap(&track);
}

#[test]
fn test_expand_cut_line_is_exact_inverse() {
    let data = signal(1000);
    let mut track = make_track(&data);

    track.clear_and_add_cut_line(0.2, 0.3).unwrap();
    assert_eq!(track.clip(0).unwrap().num_samples(), 900);
    track.update_location_cache();
    assert_eq!(track.locations().len(), 1);

    let (start, end) = track.expand_cut_line(0.2).unwrap();
    assert_eq!(start, 0.2);
    assert!((end - 0.3).abs() < 1e-9);
    assert_eq!(read(&track, 0, 1000), data);
}

#[test]
fn test_location_cache_rebuild_is_idempotent() {
    let mut track = make_track(&signal(1000));
    track.clear_and_add_cut_line(0.1, 0.15).unwrap();
    track.split_at(0.5).unwrap();

    track.update_location_cache();
    let first = track.locations().to_vec();
    track.update_location_cache();
    assert_eq!(track.locations(), first.as_slice());
    assert!(!first.is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// SCENARIOS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_scenario_a_clear_with_sliding() {
    // One clip spanning samples [0, 1000) at 1000 Hz.
    let data = signal(1000);
    let mut track = make_track(&data);

    track.clear(0.2, 0.3).unwrap();
    assert_eq!(track.num_clips(), 1);
    let clip = track.clip(0).unwrap();
    assert_eq!(clip.num_samples(), 900);
    assert_eq!(clip.start_time(), 0.0);

    let out = read(&track, 0, 900);
    assert_eq!(out[..200], data[..200]);
    assert_eq!(out[200..], data[300..]);
}

#[test]
fn test_scenario_a_split_delete() {
    let data = signal(1000);
    let mut track = make_track(&data);

    track.split_delete(0.2, 0.3).unwrap();
    assert_eq!(track.num_clips(), 2);

    let order = track.sorted_clip_indices();
    let left = track.clip(order[0]).unwrap();
    let right = track.clip(order[1]).unwrap();
    assert_eq!((left.start_time(), left.num_samples()), (0.0, 200));
    assert_eq!(right.start_time(), 0.3);
    assert_eq!(right.num_samples(), 700);

    let out = read(&track, 0, 1000);
    assert_eq!(out[..200], data[..200]);
    assert!(out[200..300].iter().all(|&s| s == 0.0));
    assert_eq!(out[300..], data[300..]);
    assert_no_overlap(&track);
}

#[test]
fn test_scenario_b_disjoin_splits_on_silence_runs() {
    // 500 non-zero, 2000 exact zero, 500 non-zero samples.
    let mut data = signal(3000);
    for s in &mut data[500..2500] {
        *s = 0.0;
    }
    let mut track = make_track(&data);

    let runs = track.disjoin(0.0, 3.0, 1000).unwrap();
    assert_eq!(runs, 1);
    assert_eq!(track.num_clips(), 2);

    let order = track.sorted_clip_indices();
    let a = track.clip(order[0]).unwrap();
    let b = track.clip(order[1]).unwrap();
    assert_eq!((a.start_time(), a.num_samples()), (0.0, 500));
    assert_eq!((b.start_time(), b.num_samples()), (2.5, 500));

    // A threshold longer than the run splits nothing.
    let mut track2 = make_track(&data);
    assert_eq!(track2.disjoin(0.0, 3.0, 2500).unwrap(), 0);
    assert_eq!(track2.num_clips(), 1);
}

#[test]
fn test_disjoin_progress_cancel_leaves_track_untouched() {
    let mut data = signal(3000);
    for s in &mut data[500..2500] {
        *s = 0.0;
    }
    let mut track = make_track(&data);
    let runs = track
        .disjoin_with_progress(0.0, 3.0, 1000, |_, _| false)
        .unwrap();
    assert_eq!(runs, 0);
    assert_eq!(track.num_clips(), 1);
    assert_eq!(track.clip(0).unwrap().num_samples(), 3000);
}

#[test]
fn test_scenario_c_join_fills_gap_with_silence() {
    // Clips [0, 100) and [150, 250) samples: a 50-sample gap.
    let first = signal(100);
    let mut track = make_track(&first);
    let second = make_track(&signal(100));
    track.paste(0.15, &second).unwrap();
    assert_eq!(track.num_clips(), 2);

    track.join(0.0, 0.25).unwrap();
    assert_eq!(track.num_clips(), 1);
    let clip = track.clip(0).unwrap();
    assert_eq!(clip.start_time(), 0.0);
    assert_eq!(clip.num_samples(), 250);

    let out = read(&track, 0, 250);
    assert_eq!(out[..100], first[..]);
    assert!(out[100..150].iter().all(|&s| s == 0.0));
    assert_eq!(out[150..250], signal(100)[..]);
}

#[test]
fn test_scenario_d_paste_modes() {
    // Host: clip [0, 1s) plus a far clip at [2.0, 2.5) to observe shifts.
    let mut track = make_track(&signal(1000));
    let far = make_track(&signal(500));
    track.paste(2.0, &far).unwrap();
    assert_eq!(track.num_clips(), 2);

    // Single-clip source into the interior: spliced, no new clip.
    let single = make_track(&signal(200));
    track.paste(0.5, &single).unwrap();
    assert_eq!(track.num_clips(), 2);
    assert_eq!(track.clip(0).unwrap().num_samples(), 1200);
    // The far clip moved right by the pasted duration.
    let far_start = track
        .sorted_clip_indices()
        .last()
        .map(|&i| track.clip(i).unwrap().start_time())
        .unwrap();
    assert!((far_start - 2.2).abs() < 1e-9);

    // Two-clip source into the same spot: clip count grows, later clips
    // shift right by the pasted duration again.
    let mut double = make_track(&signal(100));
    let tail = make_track(&signal(100));
    double.paste(0.15, &tail).unwrap();
    assert_eq!(double.num_clips(), 2);

    let clips_before = track.num_clips();
    track.paste(0.5, &double).unwrap();
    assert!(track.num_clips() >= clips_before + 1);
    let far_start = track
        .sorted_clip_indices()
        .last()
        .map(|&i| track.clip(i).unwrap().start_time())
        .unwrap();
    assert!((far_start - 2.45).abs() < 1e-9);
    assert_no_overlap(&track);
}

// ═══════════════════════════════════════════════════════════════════════════
// FIXED (NON-SLIDING) MODE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_fixed_mode_clear_leaves_later_clips() {
    let mut track = Track::with_settings(store(), RATE, EditSettings::fixed());
    track.append(&signal(1000)).unwrap();
    track.split_delete(0.4, 0.6).unwrap();
    let ends_before: Vec<f64> = (0..track.num_clips())
        .map(|i| track.clip(i).unwrap().start_time())
        .collect();

    track.clear(0.0, 0.2).unwrap();
    // The clip after the cleared region did not move.
    let order = track.sorted_clip_indices();
    let last = track.clip(*order.last().unwrap()).unwrap();
    assert!(ends_before.contains(&last.start_time()));
    assert_eq!(last.start_time(), 0.6);
}

#[test]
fn test_fixed_mode_paste_fails_without_room() {
    let mut track = Track::with_settings(store(), RATE, EditSettings::fixed());
    track.append(&signal(100)).unwrap();
    let second = make_track(&signal(100));
    track.paste(0.15, &second).unwrap(); // empty space: fine

    // Splicing 0.2 s into the first clip would run into the second.
    let big = make_track(&signal(200));
    let err = track.paste(0.05, &big).unwrap_err();
    assert!(matches!(err, wf_core::EditError::InsufficientSpace(_)));

    // Nothing moved, nothing changed.
    assert_eq!(track.num_clips(), 2);
    assert_eq!(track.clip(0).unwrap().num_samples(), 100);
    assert_no_overlap(&track);
}

#[test]
fn test_fixed_mode_expand_cut_line_fails_without_room() {
    let mut track = Track::with_settings(store(), RATE, EditSettings::fixed());
    track.append(&signal(500)).unwrap();
    track.clear_and_add_cut_line(0.1, 0.3).unwrap();
    // Clip is now [0, 0.3); park another clip right behind it.
    let neighbour = make_track(&signal(100));
    track.paste(0.35, &neighbour).unwrap();

    let err = track.expand_cut_line(0.1).unwrap_err();
    assert!(matches!(err, wf_core::EditError::InsufficientSpace(_)));

    // With sliding enabled the expansion succeeds and the neighbour moves.
    let mut settings = *track.settings();
    settings.clips_can_move = true;
    track.set_settings(settings);
    let (s, e) = track.expand_cut_line(0.1).unwrap();
    assert_eq!(s, 0.1);
    assert!((e - 0.3).abs() < 1e-9);
    let order = track.sorted_clip_indices();
    let neighbour_start = track.clip(*order.last().unwrap()).unwrap().start_time();
    assert!((neighbour_start - 0.55).abs() < 1e-9);
    assert_no_overlap(&track);
}

// ═══════════════════════════════════════════════════════════════════════════
// CROSS-TRACK OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_cross_track_paste_with_locked_source() {
    let shared = store();
    let data = signal(400);
    let mut src = Track::new(Arc::clone(&shared), RATE);
    src.append(&data).unwrap();

    let mut dest = Track::new(Arc::clone(&shared), RATE);

    // Freeze the source against modification while its data is read.
    src.lock();
    dest.paste(0.0, &src).unwrap();
    src.unlock();

    assert_eq!(read(&dest, 0, 400), data);
    assert_eq!(read(&src, 0, 400), data);
}

#[test]
fn test_move_clip_between_tracks_transfers_ownership() {
    let shared = store();
    let mut a = Track::new(Arc::clone(&shared), RATE);
    a.append(&signal(300)).unwrap();
    let mut b = Track::new(Arc::clone(&shared), RATE);

    assert!(b.can_insert_clip(a.clip(0).unwrap()));
    a.move_clip_to_track(0, &mut b).unwrap();
    assert_eq!((a.num_clips(), b.num_clips()), (0, 1));
    assert_eq!(read(&b, 0, 300), signal(300));
}

// ═══════════════════════════════════════════════════════════════════════════
// INVARIANT SWEEP
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_no_overlap_after_operation_sequence() {
    let mut track = make_track(&signal(2000));
    track.split_at(0.5).unwrap();
    assert_no_overlap(&track);
    track.clear(0.2, 0.4).unwrap();
    assert_no_overlap(&track);
    track.clear_and_add_cut_line(0.5, 0.6).unwrap();
    assert_no_overlap(&track);
    let removed = track.cut(0.1, 0.9).unwrap();
    assert_no_overlap(&track);
    track.paste(0.3, &removed).unwrap();
    assert_no_overlap(&track);
    track.insert_silence(0.2, 0.1).unwrap();
    assert_no_overlap(&track);
    track.join(0.0, track.end_time()).unwrap();
    assert_no_overlap(&track);
    track.disjoin(0.0, track.end_time(), 50).unwrap();
    assert_no_overlap(&track);
}
