// Unit tests for the playback scheduler.
//
// Ordering is derived from the scheduler's own cursor, not from arrival
// timing, so these drive it with explicit `now` values that simulate
// network jitter.

use voicelink::audio::PlaybackScheduler;
use voicelink::session::InterruptPolicy;

const LEAD_IN: f64 = 0.005;

#[test]
fn test_starts_are_gapless_and_ordered() {
    let mut scheduler = PlaybackScheduler::new(LEAD_IN);
    let durations = [0.3, 0.5, 0.2, 0.04];

    let units: Vec<_> = durations
        .iter()
        .map(|&duration| scheduler.schedule(duration, 0.0))
        .collect();

    for pair in units.windows(2) {
        assert!(
            pair[1].start >= pair[0].start + pair[0].duration - 1e-9,
            "unit {} starts at {} before {} ends",
            pair[1].id,
            pair[1].start,
            pair[0].id
        );
    }
}

#[test]
fn test_second_buffer_queues_behind_first_not_at_arrival_time() {
    let mut scheduler = PlaybackScheduler::new(LEAD_IN);

    // Buffer of 1.0s scheduled at device time 0; the next buffer arrives
    // only 0.1s later and must queue at 1.0, not 0.1.
    let first = scheduler.schedule(1.0, 0.0);
    let second = scheduler.schedule(0.5, 0.1);

    assert!((first.start - LEAD_IN).abs() < 1e-9);
    assert!((second.start - (first.start + 1.0)).abs() < 1e-9);
}

#[test]
fn test_lead_in_keeps_units_out_of_the_past() {
    let mut scheduler = PlaybackScheduler::new(LEAD_IN);

    // Cursor is at 0 but the clock has moved on; the unit may not start
    // before now plus the guard interval.
    let unit = scheduler.schedule(0.2, 5.0);
    assert!((unit.start - (5.0 + LEAD_IN)).abs() < 1e-9);
}

#[test]
fn test_completion_drains_the_active_set() {
    let mut scheduler = PlaybackScheduler::new(LEAD_IN);
    let a = scheduler.schedule(0.2, 0.0);
    let b = scheduler.schedule(0.2, 0.0);

    assert_eq!(scheduler.active_count(), 2);
    assert!(!scheduler.complete(a.id));
    assert!(scheduler.complete(b.id));
    assert_eq!(scheduler.active_count(), 0);

    // Stale ids (already cleared) are ignored.
    assert!(!scheduler.complete(a.id));
}

#[test]
fn test_hard_interrupt_clears_everything_and_resets_cursor() {
    let mut scheduler = PlaybackScheduler::new(LEAD_IN);
    scheduler.schedule(1.0, 0.0);
    scheduler.schedule(1.0, 0.0);
    scheduler.schedule(1.0, 0.0);

    let cleared = scheduler.interrupt(InterruptPolicy::Hard);

    assert_eq!(cleared.len(), 3);
    assert_eq!(scheduler.active_count(), 0);
    assert_eq!(scheduler.cursor(), 0.0);
}

#[test]
fn test_soft_interrupt_leaves_scheduled_units_alone() {
    let mut scheduler = PlaybackScheduler::new(LEAD_IN);
    scheduler.schedule(1.0, 0.0);
    scheduler.schedule(1.0, 0.0);
    let cursor_before = scheduler.cursor();

    let cleared = scheduler.interrupt(InterruptPolicy::Soft);

    assert!(cleared.is_empty());
    assert_eq!(scheduler.active_count(), 2);
    assert_eq!(scheduler.cursor(), cursor_before);
}

#[test]
fn test_idle_reset_clears_cursor_drift() {
    let mut scheduler = PlaybackScheduler::new(LEAD_IN);
    let unit = scheduler.schedule(0.5, 10.0);
    assert!(scheduler.cursor() > 10.0);

    scheduler.complete(unit.id);
    let snapshot = scheduler.scheduled_total();

    assert!(scheduler.reset_if_idle(snapshot));
    assert_eq!(scheduler.cursor(), 0.0);
}

#[test]
fn test_idle_reset_skipped_when_new_audio_arrived() {
    let mut scheduler = PlaybackScheduler::new(LEAD_IN);
    let unit = scheduler.schedule(0.5, 0.0);
    scheduler.complete(unit.id);
    let snapshot = scheduler.scheduled_total();

    // A new chunk lands inside the grace window.
    scheduler.schedule(0.5, 0.6);

    assert!(!scheduler.reset_if_idle(snapshot));
    assert!(scheduler.cursor() > 0.0);
}

#[test]
fn test_cursor_restarts_cleanly_after_reset() {
    let mut scheduler = PlaybackScheduler::new(LEAD_IN);
    let unit = scheduler.schedule(2.0, 0.0);
    scheduler.complete(unit.id);
    assert!(scheduler.reset_if_idle(scheduler.scheduled_total()));

    // The next turn starts from the live clock, not the drained timeline.
    let next = scheduler.schedule(0.5, 30.0);
    assert!((next.start - (30.0 + LEAD_IN)).abs() < 1e-9);
}

#[test]
fn test_teardown_clear_drops_future_units() {
    let mut scheduler = PlaybackScheduler::new(LEAD_IN);
    scheduler.schedule(1.0, 0.0);
    // This one has not started playing yet; clear must drop it anyway.
    let queued = scheduler.schedule(1.0, 0.0);
    assert!(queued.start > 0.9);

    let cleared = scheduler.clear();
    assert_eq!(cleared.len(), 2);
    assert_eq!(scheduler.active_count(), 0);
    assert_eq!(scheduler.cursor(), 0.0);
}
