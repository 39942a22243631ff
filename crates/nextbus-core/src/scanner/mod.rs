//! Feed scanning for upcoming departures.
//!
//! This module walks one GTFS-Realtime snapshot without generated message
//! types and collects departures for a single (route, stop) pair.
//!
//! ## Algorithm Overview
//!
//! 1. Walk the top-level fields; decode the header (field 1) once
//! 2. For every entity (field 2), find the earliest stop time at the target
//!    stop that is not in the past
//! 3. Offer that candidate to the exact, heuristic and fallback tiers
//! 4. Optionally stop early once the exact tier is full and tightly grouped
//! 5. Select the first non-empty tier
//!
//! ## Failure containment
//!
//! A decode error inside an entity's declared byte span only drops that
//! entity. A decode error in the top-level field list (a bad tag, or an
//! entity length running past the buffer) aborts the scan, and no partial
//! result is returned.

mod entity;
pub mod observer;
pub mod wire;

use crate::error::Result;
use crate::header::{read_header_contained, FeedHeader};
use crate::schema::feed_message;
use crate::select::{Query, Selection, TieredCandidates};
use tracing::{debug, trace};

pub use observer::{NullObserver, ScanObserver, ScanStats};
pub use wire::{walk, Reader, Tag, Visit, WalkEnd, WireType};

/// Default number of departures kept
pub const DEFAULT_LIMIT: usize = 2;

/// Default spread, in seconds, under which a full exact tier ends the scan
pub const DEFAULT_EARLY_EXIT_TOLERANCE: i64 = 120;

/// Configuration for the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Maximum number of departures returned (at least 1)
    pub limit: usize,
    /// Stop scanning once the exact tier is full within this many seconds
    pub early_exit_tolerance: i64,
    /// Whether the early exit is allowed at all
    pub early_exit: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            early_exit_tolerance: DEFAULT_EARLY_EXIT_TOLERANCE,
            early_exit: true,
        }
    }
}

impl ScanConfig {
    /// Creates a new scan config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of departures to keep; zero is treated as one
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    /// Sets the early exit tolerance in seconds
    pub fn early_exit_tolerance(mut self, seconds: i64) -> Self {
        self.early_exit_tolerance = seconds;
        self
    }

    /// Disables the early exit so every entity is visited
    pub fn exhaustive(mut self) -> Self {
        self.early_exit = false;
        self
    }
}

/// How a scan left the top-level entity list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Every entity was visited
    Exhausted,
    /// The exact tier settled before the end of the buffer
    EarlyExit,
}

/// Everything one scan produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Header attributes; all `None` if the feed carried no header
    pub header: FeedHeader,
    /// Departures and the tier they came from
    pub selection: Selection,
    /// Whether the scan ran to the end of the buffer
    pub termination: Termination,
    /// Number of entities visited
    pub entities: usize,
}

/// Scanner for departures at one route and stop
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    config: ScanConfig,
}

impl Scanner {
    /// Creates a new scanner with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new scanner with custom configuration
    pub fn with_config(config: ScanConfig) -> Self {
        Self { config }
    }

    /// The scanner's configuration
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan a snapshot relative to the reference time `now`
    pub fn scan(&self, data: &[u8], query: &Query, now: i64) -> Result<ScanOutcome> {
        self.scan_with(data, query, now, &mut NullObserver)
    }

    /// Scan a snapshot, reporting progress to `observer`
    pub fn scan_with<O: ScanObserver + ?Sized>(
        &self,
        data: &[u8],
        query: &Query,
        now: i64,
        observer: &mut O,
    ) -> Result<ScanOutcome> {
        debug!(
            "Starting scan of {} bytes for route {} at stop {}",
            data.len(),
            query.route_id(),
            query.stop_id()
        );

        let mut header: Option<FeedHeader> = None;
        let mut tiers = TieredCandidates::new(self.config.limit);
        let mut entities = 0;

        let end = walk(Reader::new(data), |tag, reader| {
            if tag.is(feed_message::HEADER, WireType::Len) {
                let message = reader.read_message()?;
                if header.is_none() {
                    let decoded = read_header_contained(message);
                    observer.header(&decoded);
                    header = Some(decoded);
                }
                return Ok(Visit::Consumed);
            }

            if !tag.is(feed_message::ENTITY, WireType::Len) {
                return Ok(Visit::Skip);
            }

            let message = reader.read_message()?;
            let index = entities;
            let base = message.base();
            entities += 1;
            observer.entity(index, message.len());

            match entity::find_in_entity(message, query, now, &mut *observer) {
                Ok(Some(candidate)) => {
                    let accepted = tiers.offer(query, &candidate);
                    trace!(
                        "Entity {} at stop {:?}: {} (route {:?}, trip {:?}) accepted by {:?}",
                        index,
                        candidate.stop_id,
                        candidate.timestamp,
                        candidate.route_id,
                        candidate.trip_id,
                        accepted
                    );
                    observer.candidate(&candidate, &accepted);
                }
                Ok(None) => {}
                Err(e) => {
                    debug!("Skipping corrupt entity {} at offset {}: {}", index, base, e);
                    observer.corrupt_entity(index, &e);
                }
            }

            if self.config.early_exit && tiers.is_settled(self.config.early_exit_tolerance) {
                debug!("Exact tier settled after {} entities, stopping early", entities);
                return Ok(Visit::Stop);
            }

            Ok(Visit::Consumed)
        })?;

        let termination = match end {
            WalkEnd::Exhausted => Termination::Exhausted,
            WalkEnd::Stopped => Termination::EarlyExit,
        };

        let selection = tiers.select();
        debug!(
            "Scan complete: {} entities, {} departures from {} tier",
            entities,
            selection.departures.len(),
            selection.tier
        );

        Ok(ScanOutcome {
            header: header.unwrap_or_default(),
            selection,
            termination,
            entities,
        })
    }
}
