//! The departure board handed to the dashboard.
//!
//! A [`DepartureBoard`] is the only value that leaves the core. It is
//! produced for every poll, including failed ones, so consumers never have
//! to distinguish "no answer" from "an answer saying nothing is coming".

use crate::error::Error;
use crate::scanner::{NullObserver, ScanObserver, ScanOutcome, Scanner};
use crate::select::{MatchTier, Query};
use crate::snapshot::Snapshot;
use tracing::{debug, warn};

/// Status message of a successful scan with departures
pub const MESSAGE_OK: &str = "OK";

/// Status message of a successful scan without departures
pub const MESSAGE_NO_PREDICTIONS: &str = "No predictions found for this route/stop in current feed";

/// Status message when no snapshot could be fetched
pub const MESSAGE_UNAVAILABLE: &str = "Upstream feed unavailable";

/// Whole minutes from `now` until `timestamp`, rounded half up, never
/// negative
pub fn minutes_until(timestamp: i64, now: i64) -> i64 {
    timestamp.saturating_sub(now).max(0).saturating_add(30) / 60
}

/// One upcoming departure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Departure {
    /// Predicted time, POSIX seconds
    pub unix_timestamp: i64,
    /// Minutes from the board's reference time
    pub minutes_from_now: i64,
}

impl Departure {
    /// Creates a departure relative to `now`
    pub fn at(unix_timestamp: i64, now: i64) -> Self {
        Self {
            unix_timestamp,
            minutes_from_now: minutes_until(unix_timestamp, now),
        }
    }
}

/// Result of one poll for a (route, stop) pair
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DepartureBoard {
    /// False when the feed was unavailable or failed to decode
    pub ok: bool,
    /// Target route
    pub route_id: String,
    /// Target stop
    pub stop_id: String,
    /// Upcoming departures, ascending
    pub departures: Vec<Departure>,
    /// Human-readable status
    pub message: String,
    /// Time the board was computed, POSIX seconds
    pub generated_at_unix: i64,
    /// Feed header timestamp
    pub feed_timestamp_unix: Option<i64>,
    /// Seconds between the feed timestamp and `generated_at_unix`
    pub feed_age_seconds: Option<i64>,
    /// Matching tier that produced `departures`
    pub filter_used: MatchTier,
}

impl DepartureBoard {
    fn empty(query: &Query, ok: bool, message: impl Into<String>, now: i64) -> Self {
        Self {
            ok,
            route_id: query.route_id().to_string(),
            stop_id: query.stop_id().to_string(),
            departures: Vec::new(),
            message: message.into(),
            generated_at_unix: now,
            feed_timestamp_unix: None,
            feed_age_seconds: None,
            filter_used: MatchTier::None,
        }
    }

    /// Board for a completed scan
    pub fn from_outcome(query: &Query, outcome: &ScanOutcome, now: i64) -> Self {
        let departures: Vec<Departure> = outcome
            .selection
            .departures
            .iter()
            .map(|&t| Departure::at(t, now))
            .collect();

        let message = if departures.is_empty() {
            MESSAGE_NO_PREDICTIONS
        } else {
            MESSAGE_OK
        };

        Self {
            departures,
            feed_timestamp_unix: outcome.header.timestamp,
            feed_age_seconds: outcome.header.age_seconds(now),
            filter_used: outcome.selection.tier,
            ..Self::empty(query, true, message, now)
        }
    }

    /// Board for a snapshot that failed to decode
    pub fn failed(query: &Query, error: &Error, now: i64) -> Self {
        Self::empty(query, false, format!("Feed decode failed: {}", error), now)
    }

    /// Board for a poll where no snapshot was available
    pub fn unavailable(query: &Query, now: i64) -> Self {
        Self::empty(query, false, MESSAGE_UNAVAILABLE, now)
    }

    /// Minutes until the first departure, if any
    pub fn next_minutes(&self) -> Option<i64> {
        self.departures.first().map(|d| d.minutes_from_now)
    }

    /// The same board seen from a later reference time.
    ///
    /// Departures already in the past are dropped and the remaining minutes
    /// and feed age are recomputed; `generated_at_unix` is kept so consumers
    /// can tell how old the predictions are.
    pub fn rebased(&self, now: i64) -> Self {
        let departures = self
            .departures
            .iter()
            .filter(|d| d.unix_timestamp >= now)
            .map(|d| Departure::at(d.unix_timestamp, now))
            .collect();

        Self {
            departures,
            feed_age_seconds: self
                .feed_timestamp_unix
                .map(|ts| now.saturating_sub(ts).max(0)),
            ..self.clone()
        }
    }
}

/// Compute the board for one poll.
///
/// `None` means the fetch collaborator could not supply a snapshot. Decode
/// errors become a failed board; no partial departures are ever reported.
pub fn next_departures(
    snapshot: Option<&Snapshot>,
    query: &Query,
    scanner: &Scanner,
    now: i64,
) -> DepartureBoard {
    next_departures_with(snapshot, query, scanner, now, &mut NullObserver)
}

/// Compute the board for one poll, reporting scan progress to `observer`
pub fn next_departures_with<O: ScanObserver + ?Sized>(
    snapshot: Option<&Snapshot>,
    query: &Query,
    scanner: &Scanner,
    now: i64,
    observer: &mut O,
) -> DepartureBoard {
    let Some(snapshot) = snapshot else {
        debug!("No snapshot supplied for route {}", query.route_id());
        return DepartureBoard::unavailable(query, now);
    };

    match scanner.scan_with(snapshot.as_bytes(), query, now, observer) {
        Ok(outcome) => DepartureBoard::from_outcome(query, &outcome, now),
        Err(e) => {
            warn!("Feed decode failed ({} byte snapshot): {}", snapshot.len(), e);
            DepartureBoard::failed(query, &e, now)
        }
    }
}
