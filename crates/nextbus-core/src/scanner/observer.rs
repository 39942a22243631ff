//! Hooks for watching a scan.
//!
//! This module provides the [`ScanObserver`] trait, called by the scanner
//! as it walks a feed. Every method has a no-op default, so observers only
//! implement what they care about.

use crate::error::Error;
use crate::header::FeedHeader;
use crate::select::{Candidate, MatchTier};

/// Trait for observing the progress of a feed scan.
///
/// # Example
///
/// ```
/// use nextbus_core::scanner::ScanObserver;
/// use nextbus_core::Candidate;
///
/// #[derive(Default)]
/// struct Latest {
///     latest: Option<i64>,
/// }
///
/// impl ScanObserver for Latest {
///     fn candidate(&mut self, candidate: &Candidate, _accepted: &[nextbus_core::MatchTier]) {
///         self.latest = self.latest.max(Some(candidate.timestamp));
///     }
/// }
/// ```
pub trait ScanObserver {
    /// The feed header was decoded
    fn header(&mut self, header: &FeedHeader) {
        let _ = header;
    }

    /// An entity of `len` bytes is about to be scanned
    fn entity(&mut self, index: usize, len: usize) {
        let _ = (index, len);
    }

    /// An entity carried a trip update
    fn trip_update(&mut self) {}

    /// A stop-time update was decoded
    fn stop_time_update(&mut self, stop_id: Option<&str>) {
        let _ = stop_id;
    }

    /// An entity produced a candidate; `accepted` lists the tiers that kept it
    fn candidate(&mut self, candidate: &Candidate, accepted: &[MatchTier]) {
        let _ = (candidate, accepted);
    }

    /// An entity failed to decode and was left out
    fn corrupt_entity(&mut self, index: usize, error: &Error) {
        let _ = (index, error);
    }
}

/// An observer that ignores everything
pub struct NullObserver;

impl ScanObserver for NullObserver {}

/// An observer that counts what the scan saw
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanStats {
    /// Whether a header submessage was decoded
    pub header_seen: bool,
    /// Number of entities visited
    pub entities: usize,
    /// Number of trip updates visited
    pub trip_updates: usize,
    /// Number of stop-time updates decoded
    pub stop_time_updates: usize,
    /// Number of entities that produced a candidate
    pub candidates: usize,
    /// Number of entities skipped because they failed to decode
    pub corrupt_entities: usize,
}

impl ScanObserver for ScanStats {
    fn header(&mut self, _header: &FeedHeader) {
        self.header_seen = true;
    }

    fn entity(&mut self, _index: usize, _len: usize) {
        self.entities += 1;
    }

    fn trip_update(&mut self) {
        self.trip_updates += 1;
    }

    fn stop_time_update(&mut self, _stop_id: Option<&str>) {
        self.stop_time_updates += 1;
    }

    fn candidate(&mut self, _candidate: &Candidate, _accepted: &[MatchTier]) {
        self.candidates += 1;
    }

    fn corrupt_entity(&mut self, _index: usize, _error: &Error) {
        self.corrupt_entities += 1;
    }
}
