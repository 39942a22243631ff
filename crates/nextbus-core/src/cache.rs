//! Last-good board fallback.
//!
//! The core does no storage I/O. The caller passes in the last cache entry
//! it holds and gets back the entry it should keep, so persistence stays
//! with whoever owns the disk or memory.

use crate::board::{next_departures, DepartureBoard};
use crate::scanner::Scanner;
use crate::select::Query;
use crate::snapshot::Snapshot;
use tracing::{debug, info};

/// Source of the current time, POSIX seconds
pub trait Clock {
    /// Current time in whole seconds since the epoch
    fn now_unix(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A clock stuck at one instant, for replays and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_unix(&self) -> i64 {
        self.0
    }
}

/// The last board worth serving again
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CacheEntry {
    /// The board as computed from a good snapshot
    pub board: DepartureBoard,
    /// When that board was computed, POSIX seconds
    pub generated_at_unix: i64,
}

impl CacheEntry {
    /// Captures a board for later reuse
    pub fn new(board: DepartureBoard) -> Self {
        let generated_at_unix = board.generated_at_unix;
        Self {
            board,
            generated_at_unix,
        }
    }

    /// Seconds since the entry was produced
    pub fn age(&self, now: i64) -> i64 {
        now.saturating_sub(self.generated_at_unix)
    }

    /// Returns true if the entry is at most `max_staleness` seconds old
    pub fn is_fresh(&self, now: i64, max_staleness: i64) -> bool {
        self.age(now) <= max_staleness
    }
}

/// Where a served board came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardSource {
    /// Computed from the current snapshot
    Fresh,
    /// Replayed from the cache entry after the current poll failed
    Cache,
    /// The current poll failed and no usable cache entry existed
    Failed,
}

/// Board to publish and cache entry to keep after one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    /// Board to hand to the dashboard
    pub board: DepartureBoard,
    /// Entry the caller should persist, if any
    pub cache: Option<CacheEntry>,
    /// Where `board` came from
    pub source: BoardSource,
}

/// Choose between a freshly computed board and the cached one.
///
/// A good board always wins and replaces the cache. A failed board falls
/// back to a cache entry no older than `max_staleness` seconds, rebased to
/// `now` so past departures disappear.
pub fn serve_with_cache(
    fresh: DepartureBoard,
    cached: Option<&CacheEntry>,
    now: i64,
    max_staleness: i64,
) -> Served {
    if fresh.ok {
        return Served {
            cache: Some(CacheEntry::new(fresh.clone())),
            board: fresh,
            source: BoardSource::Fresh,
        };
    }

    match cached {
        Some(entry) if entry.is_fresh(now, max_staleness) => {
            info!(
                "Serving cached board from {}s ago: {}",
                entry.age(now),
                fresh.message
            );
            let mut board = entry.board.rebased(now);
            board.message = format!(
                "{} (cached {}s ago; {})",
                entry.board.message,
                entry.age(now),
                fresh.message
            );
            Served {
                board,
                cache: Some(entry.clone()),
                source: BoardSource::Cache,
            }
        }
        Some(entry) => {
            debug!(
                "Cached board is {}s old, beyond {}s",
                entry.age(now),
                max_staleness
            );
            Served {
                board: fresh,
                cache: Some(entry.clone()),
                source: BoardSource::Failed,
            }
        }
        None => Served {
            board: fresh,
            cache: None,
            source: BoardSource::Failed,
        },
    }
}

/// One complete poll: scan the snapshot at the clock's current time and
/// fall back to the cache entry if that fails.
pub fn poll(
    snapshot: Option<&Snapshot>,
    query: &Query,
    scanner: &Scanner,
    clock: &impl Clock,
    cached: Option<&CacheEntry>,
    max_staleness: i64,
) -> Served {
    let now = clock.now_unix();
    let fresh = next_departures(snapshot, query, scanner, now);
    serve_with_cache(fresh, cached, now, max_staleness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Departure, MESSAGE_UNAVAILABLE};
    use crate::fixtures::{self, FeedMessage};
    use crate::scanner::ScanConfig;
    use crate::select::MatchTier;
    use pretty_assertions::assert_eq;

    const NOW: i64 = 1_700_000_000;

    fn query() -> Query {
        Query::new("55", "52103").unwrap()
    }

    fn good_snapshot() -> Snapshot {
        Snapshot::from(fixtures::encode(&FeedMessage {
            header: Some(fixtures::header(NOW - 10)),
            entity: vec![
                fixtures::entity(Some("55"), None, &[("52103", NOW + 90)]),
                fixtures::entity(Some("55"), None, &[("52103", NOW + 900)]),
            ],
        }))
    }

    fn scanner() -> Scanner {
        Scanner::with_config(ScanConfig::new().exhaustive())
    }

    #[test]
    fn test_fixed_clock() {
        assert_eq!(FixedClock(42).now_unix(), 42);
        assert!(SystemClock.now_unix() > 1_600_000_000);
    }

    #[test]
    fn test_fresh_board_replaces_cache() {
        let served = poll(
            Some(&good_snapshot()),
            &query(),
            &scanner(),
            &FixedClock(NOW),
            None,
            600,
        );

        assert_eq!(served.source, BoardSource::Fresh);
        assert_eq!(served.board.filter_used, MatchTier::Exact);
        let entry = served.cache.unwrap();
        assert_eq!(entry.generated_at_unix, NOW);
        assert_eq!(entry.board, served.board);
    }

    #[test]
    fn test_failure_served_from_cache() {
        let first = poll(
            Some(&good_snapshot()),
            &query(),
            &scanner(),
            &FixedClock(NOW),
            None,
            600,
        );
        let entry = first.cache.unwrap();

        let second = poll(None, &query(), &scanner(), &FixedClock(NOW + 120), Some(&entry), 600);
        assert_eq!(second.source, BoardSource::Cache);
        assert!(second.board.ok);
        assert_eq!(
            second.board.departures,
            vec![Departure::at(NOW + 900, NOW + 120)]
        );
        assert!(second.board.message.contains(MESSAGE_UNAVAILABLE));
        assert_eq!(second.board.generated_at_unix, NOW);
        assert_eq!(second.cache, Some(entry));
    }

    #[test]
    fn test_stale_cache_not_served() {
        let entry = CacheEntry::new(poll(
            Some(&good_snapshot()),
            &query(),
            &scanner(),
            &FixedClock(NOW),
            None,
            600,
        )
        .board);

        let served = poll(None, &query(), &scanner(), &FixedClock(NOW + 601), Some(&entry), 600);
        assert_eq!(served.source, BoardSource::Failed);
        assert!(!served.board.ok);
        assert_eq!(served.board.message, MESSAGE_UNAVAILABLE);
        assert_eq!(served.cache, Some(entry));
    }

    #[test]
    fn test_failure_without_cache() {
        let served = poll(None, &query(), &scanner(), &FixedClock(NOW), None, 600);
        assert_eq!(served.source, BoardSource::Failed);
        assert_eq!(served.cache, None);
    }

    #[test]
    fn test_entry_age() {
        let board = DepartureBoard::unavailable(&query(), NOW);
        let entry = CacheEntry::new(board);
        assert_eq!(entry.age(NOW + 30), 30);
        assert!(entry.is_fresh(NOW + 30, 30));
        assert!(!entry.is_fresh(NOW + 31, 30));
    }
}
