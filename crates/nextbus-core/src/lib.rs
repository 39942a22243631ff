//! # nextbus-core
//!
//! A library for finding the next departures of one route at one stop in a
//! GTFS-Realtime trip-updates snapshot, without generated protobuf types.
//!
//! This crate provides the core functionality for:
//! - Reading the protobuf wire format with a bounds-checked cursor
//! - Walking feed, entity, trip-update and stop-time messages by field number
//! - Matching route and stop with exact, heuristic and stop-only tiers
//! - Building the departure board the dashboard polls
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`scanner`]: Wire format reader, message walker and feed scan
//! - [`schema`]: Pinned field numbers
//! - [`header`]: Feed header extraction and the status document
//! - [`aggregate`]: Bounded, ordered, duplicate-free candidate set
//! - [`select`]: Query matching and the tiered fallback policy
//! - [`board`]: The output board
//! - [`cache`]: Last-good board fallback with an injected clock
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use nextbus_core::{next_departures, Query, Scanner, Snapshot};
//!
//! // An empty feed: valid, with nothing scheduled
//! let snapshot = Snapshot::from_static(&[]);
//! let query = Query::new("55", "52103")?;
//!
//! let board = next_departures(Some(&snapshot), &query, &Scanner::new(), 1_700_000_000);
//! assert!(board.ok);
//! assert!(board.departures.is_empty());
//! # Ok::<(), nextbus_core::Error>(())
//! ```
//!
//! ## Extensibility
//!
//! [`ScanObserver`] receives a callback for every header, entity, stop-time
//! update and candidate the scan visits.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod aggregate;
pub mod board;
pub mod cache;
pub mod error;
pub mod header;
pub mod scanner;
pub mod schema;
pub mod select;
pub mod snapshot;

#[cfg(test)]
mod fixtures;

// Re-export primary types for convenience
pub use board::{next_departures, next_departures_with, Departure, DepartureBoard};
pub use cache::{poll, serve_with_cache, BoardSource, CacheEntry, Clock, FixedClock, Served, SystemClock};
pub use error::{Error, Result};
pub use header::{parse_header, FeedHeader, FeedStatus};
pub use scanner::{ScanConfig, ScanObserver, ScanOutcome, ScanStats, Scanner, Termination};
pub use select::{Candidate, MatchTier, Query, Selection};
pub use snapshot::Snapshot;

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
