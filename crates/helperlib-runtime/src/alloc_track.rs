// crates/helperlib-runtime/src/alloc_track.rs
//! Live-object tracking for leak detection.
//!
//! Per-kind counters of host objects allocated and not yet freed. Disabled
//! by default; `enable_tracking()` turns it on (the CLI's `--track-allocs`).
//! When disabled, `track_alloc`/`track_dealloc` check the flag and return.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use crate::object::ObjectKind;

/// Must be greater than the highest `ObjectKind` discriminant.
const NUM_KIND_SLOTS: usize = 13;

static KIND_COUNTERS: [AtomicI64; NUM_KIND_SLOTS] = {
    #[allow(clippy::declare_interior_mutable_const)]
    const ZERO: AtomicI64 = AtomicI64::new(0);
    [ZERO; NUM_KIND_SLOTS]
};

static TOTAL: AtomicI64 = AtomicI64::new(0);

static ENABLED: AtomicBool = AtomicBool::new(false);

pub fn enable_tracking() {
    ENABLED.store(true, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

#[inline]
pub fn track_alloc(kind: ObjectKind) {
    if !ENABLED.load(Ordering::Relaxed) {
        return;
    }
    TOTAL.fetch_add(1, Ordering::Relaxed);
    if let Some(counter) = KIND_COUNTERS.get(kind as usize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[inline]
pub fn track_dealloc(kind: ObjectKind) {
    if !ENABLED.load(Ordering::Relaxed) {
        return;
    }
    TOTAL.fetch_sub(1, Ordering::Relaxed);
    if let Some(counter) = KIND_COUNTERS.get(kind as usize) {
        counter.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Live objects of one kind.
pub fn live(kind: ObjectKind) -> i64 {
    KIND_COUNTERS
        .get(kind as usize)
        .map_or(0, |counter| counter.load(Ordering::Relaxed))
}

pub fn snapshot() -> i64 {
    TOTAL.load(Ordering::Relaxed)
}

pub fn delta(snap: i64) -> i64 {
    TOTAL.load(Ordering::Relaxed) - snap
}

/// Non-zero per-kind counts.
pub fn report() -> Vec<(ObjectKind, i64)> {
    ObjectKind::ALL
        .iter()
        .filter_map(|&kind| {
            let count = live(kind);
            (count != 0).then_some((kind, count))
        })
        .collect()
}

pub fn reset() {
    TOTAL.store(0, Ordering::Relaxed);
    for counter in &KIND_COUNTERS {
        counter.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Only `RecordKind` and `Other` are used here: no other test in this crate
    // allocates objects of those kinds, so parallel tests cannot disturb them.
    // Tracking is never switched off again once a test enabled it.

    #[test]
    fn enable_tracking_sets_flag() {
        enable_tracking();
        assert!(is_enabled());
    }

    #[test]
    fn alloc_and_dealloc_balance() {
        enable_tracking();
        let before = live(ObjectKind::Other);

        track_alloc(ObjectKind::Other);
        track_alloc(ObjectKind::Other);
        assert_eq!(live(ObjectKind::Other), before + 2);

        track_dealloc(ObjectKind::Other);
        assert_eq!(live(ObjectKind::Other), before + 1);
        track_dealloc(ObjectKind::Other);
        assert_eq!(live(ObjectKind::Other), before);
    }

    #[test]
    fn report_lists_live_kinds() {
        enable_tracking();
        track_alloc(ObjectKind::RecordKind);
        assert!(report().iter().any(|&(kind, _)| kind == ObjectKind::RecordKind));
        track_dealloc(ObjectKind::RecordKind);
    }

    #[test]
    fn every_kind_has_a_slot() {
        for &kind in ObjectKind::ALL {
            assert!((kind as usize) < NUM_KIND_SLOTS, "{} has no counter", kind.name());
        }
    }
}
