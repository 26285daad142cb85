//! Process-wide accumulator-update/refresh counters (§9 Design Notes:
//! "model as an atomic counter pair behind a compile-time/config switch;
//! never on the hot path"). Gated behind the pre-existing `stats` Cargo
//! feature; unlike the teacher's `linkme::distributed_slice`-registered
//! per-call-site histograms (built for tuning search parameters), this
//! crate only ever has two fixed counters, so a plain static pair is enough
//! — no dynamic registration machinery is needed.

use std::sync::atomic::{AtomicU64, Ordering};

static REFRESH_COUNT: AtomicU64 = AtomicU64::new(0);
static UPDATE_COUNT: AtomicU64 = AtomicU64::new(0);

/// Record one full accumulator refresh. A no-op unless the `stats` feature
/// is enabled.
#[inline]
pub fn record_refresh() {
    #[cfg(feature = "stats")]
    REFRESH_COUNT.fetch_add(1, Ordering::Relaxed);
}

/// Record one incremental accumulator update. A no-op unless the `stats`
/// feature is enabled.
#[inline]
pub fn record_update() {
    #[cfg(feature = "stats")]
    UPDATE_COUNT.fetch_add(1, Ordering::Relaxed);
}

/// Snapshot of the two counters, for diagnostics.
pub fn snapshot() -> (u64, u64) {
    (
        REFRESH_COUNT.load(Ordering::Relaxed),
        UPDATE_COUNT.load(Ordering::Relaxed),
    )
}
