//! Media group error de-duplication
//!
//! Every photo of an album arrives as its own webhook call. Users get the
//! "only one photo" notice once per album; the ledger remembers which albums
//! were already answered.

use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Record of media groups that already received their notification
///
/// Entries expire after the TTL and the cache is capacity bounded, so a
/// long-running process does not grow without limit. An album whose photos
/// arrive further apart than the TTL may be notified twice.
///
/// Near `max_capacity` the cache's TinyLFU admission policy may decline to
/// keep a new key. `try_claim` still reports that call as the winner, so the
/// next photo of that album can claim again and trigger a second notice.
/// Size `GROUP_LEDGER_MAX_SIZE` well above the number of albums expected
/// within one TTL.
#[derive(Clone)]
pub struct GroupErrorLedger {
    /// media_group_id -> () with automatic TTL
    cache: Cache<String, ()>,
    /// Suppressed duplicate notifications (for log throttling)
    suppressed_count: Arc<AtomicU64>,
}

impl GroupErrorLedger {
    /// Creates a ledger with the given entry TTL and capacity
    ///
    /// ```
    /// use cheatsheet_transport_telegram::ledger::GroupErrorLedger;
    ///
    /// let ledger = GroupErrorLedger::new(
    ///     86_400,  // 1 day TTL
    ///     100_000  // max 100k albums
    /// );
    /// ```
    #[must_use]
    pub fn new(ttl_secs: u64, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            cache,
            suppressed_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Atomically records `group_id` and reports whether this call recorded it.
    ///
    /// Returns `true` for exactly one caller per live entry, even when several
    /// updates of the same album race; every other caller gets `false`.
    pub async fn try_claim(&self, group_id: &str) -> bool {
        let entry = self.cache.entry_by_ref(group_id).or_insert(()).await;
        if entry.is_fresh() {
            return true;
        }

        let count = self.suppressed_count.fetch_add(1, Ordering::Relaxed) + 1;
        if count.is_multiple_of(100) {
            debug!(
                "Suppressed {} duplicate album notifications (recent: group {}, tracked: {})",
                count,
                group_id,
                self.entry_count()
            );
        }
        false
    }

    /// Read-only check whether `group_id` was already notified
    pub async fn is_recorded(&self, group_id: &str) -> bool {
        self.cache.get(group_id).await.is_some()
    }

    /// Returns the current number of entries
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Returns the total number of suppressed duplicate notifications
    #[must_use]
    pub fn suppressed_count(&self) -> u64 {
        self.suppressed_count.load(Ordering::Relaxed)
    }
}
