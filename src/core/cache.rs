//! Time-boxed read-through cache slots.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Source of wall-clock time for cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used to drive TTL expiry in tests.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

/// A cached value together with the time it was fetched.
#[derive(Debug, Clone)]
pub struct Snapshot<V> {
    pub value: V,
    pub fetched_at: DateTime<Utc>,
    pub freshness: Freshness,
}

impl<V> Snapshot<V> {
    pub fn is_stale(&self) -> bool {
        self.freshness == Freshness::Stale
    }
}

struct Entry<V> {
    value: V,
    fetched_at: DateTime<Utc>,
}

/// Holds at most one value and remembers when it was stored.
///
/// The value is swapped as a whole under the write lock, so readers see
/// either the previous snapshot or the new one. Expired values are kept
/// around so callers can fall back to them when a refresh fails.
pub struct TtlCell<V>
where
    V: Clone + Send + Sync + 'static,
{
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: RwLock<Option<Entry<V>>>,
}

impl<V> TtlCell<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            slot: RwLock::new(None),
        }
    }

    /// Returns the stored value if it is younger than the TTL.
    pub async fn fresh(&self) -> Option<Snapshot<V>> {
        let snapshot = self.last().await?;
        if snapshot.is_stale() {
            debug!("Cache EXPIRED");
            return None;
        }
        debug!("Cache HIT");
        Some(snapshot)
    }

    /// Returns the stored value regardless of age, marked fresh or stale.
    pub async fn last(&self) -> Option<Snapshot<V>> {
        let slot = self.slot.read().await;
        let Some(entry) = slot.as_ref() else {
            debug!("Cache MISS");
            return None;
        };
        // A clock that went backwards counts as zero age.
        let age = (self.clock.now() - entry.fetched_at)
            .to_std()
            .unwrap_or_default();
        let freshness = if age < self.ttl {
            Freshness::Fresh
        } else {
            Freshness::Stale
        };
        Some(Snapshot {
            value: entry.value.clone(),
            fetched_at: entry.fetched_at,
            freshness,
        })
    }

    /// Replaces the stored value and returns it as a fresh snapshot.
    pub async fn replace(&self, value: V) -> Snapshot<V> {
        let fetched_at = self.clock.now();
        let mut slot = self.slot.write().await;
        debug!("Cache PUT");
        *slot = Some(Entry {
            value: value.clone(),
            fetched_at,
        });
        Snapshot {
            value,
            fetched_at,
            freshness: Freshness::Fresh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn manual_clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_cell_get_put() {
        let clock = manual_clock();
        let cell = TtlCell::<i32>::new(Duration::from_secs(60), clock.clone());

        // Initially, cell is empty
        assert!(cell.fresh().await.is_none());
        assert!(cell.last().await.is_none());

        let stored = cell.replace(123).await;
        assert_eq!(stored.value, 123);
        assert_eq!(stored.fetched_at, clock.now());

        let hit = cell.fresh().await.unwrap();
        assert_eq!(hit.value, 123);
        assert_eq!(hit.freshness, Freshness::Fresh);
    }

    #[tokio::test]
    async fn test_cell_ttl_expiration() {
        let clock = manual_clock();
        let cell = TtlCell::<i32>::new(Duration::from_secs(60), clock.clone());
        cell.replace(123).await;

        clock.advance(Duration::from_secs(59));
        assert!(cell.fresh().await.is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cell.fresh().await.is_none());

        // The expired value stays available as a stale fallback
        let stale = cell.last().await.unwrap();
        assert_eq!(stale.value, 123);
        assert!(stale.is_stale());
    }

    #[tokio::test]
    async fn test_cell_replace_resets_age() {
        let clock = manual_clock();
        let cell = TtlCell::<i32>::new(Duration::from_secs(60), clock.clone());
        cell.replace(1).await;
        clock.advance(Duration::from_secs(120));

        cell.replace(2).await;
        let snapshot = cell.fresh().await.unwrap();
        assert_eq!(snapshot.value, 2);
    }
}
