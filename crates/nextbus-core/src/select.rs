//! Route/stop matching and the tiered fallback policy.
//!
//! One scan fills three candidate sets at once:
//!
//! 1. **exact**: the trip descriptor's `route_id` equals the target route
//! 2. **heuristic**: `route_id` is absent or empty and the trip id carries
//!    the route as a `_`/`-` delimited token
//! 3. **fallback**: any trip serving the target stop
//!
//! [`TieredCandidates::select`] takes the first non-empty tier.

use crate::aggregate::CandidateSet;
use crate::error::{Error, Result};
use std::fmt;

/// The (route, stop) pair a scan looks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    route_id: String,
    stop_id: String,
}

impl Query {
    /// Creates a query; both identifiers must be non-blank
    pub fn new(route_id: impl Into<String>, stop_id: impl Into<String>) -> Result<Self> {
        let route_id = route_id.into().trim().to_string();
        let stop_id = stop_id.into().trim().to_string();

        if route_id.is_empty() {
            return Err(Error::invalid_query("route id is empty"));
        }
        if stop_id.is_empty() {
            return Err(Error::invalid_query("stop id is empty"));
        }

        Ok(Self { route_id, stop_id })
    }

    /// Target route identifier
    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    /// Target stop identifier
    pub fn stop_id(&self) -> &str {
        &self.stop_id
    }

    /// Permissive stop match: equal, or containing the target.
    ///
    /// Composite platform codes such as `52103A` embed the bare stop code.
    pub fn matches_stop(&self, stop_id: &str) -> bool {
        stop_id == self.stop_id || stop_id.contains(self.stop_id.as_str())
    }

    /// Exact route match
    pub fn matches_route(&self, route_id: Option<&str>) -> bool {
        route_id == Some(self.route_id.as_str())
    }

    /// Returns true if `trip_id` has the route as a `_` or `-` delimited token
    pub fn trip_mentions_route(&self, trip_id: Option<&str>) -> bool {
        trip_id.is_some_and(|trip_id| {
            trip_id
                .split(['_', '-'])
                .any(|token| token == self.route_id)
        })
    }
}

/// Which matching tier produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MatchTier {
    /// `route_id` equals the target route
    Exact,
    /// Route recovered from the trip id
    Heuristic,
    /// Stop-only match, route ignored
    Fallback,
    /// Nothing matched
    None,
}

impl MatchTier {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::Exact => "exact",
            MatchTier::Heuristic => "heuristic",
            MatchTier::Fallback => "fallback",
            MatchTier::None => "none",
        }
    }
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entity's earliest qualifying stop time and the identifiers used to
/// classify it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Predicted arrival or departure, POSIX seconds
    pub timestamp: i64,
    /// Declared stop id of the matching stop-time update
    pub stop_id: Option<String>,
    /// `route_id` of the trip descriptor
    pub route_id: Option<String>,
    /// `trip_id` of the trip descriptor
    pub trip_id: Option<String>,
}

/// Final departures of a scan and the tier that produced them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Ascending, distinct timestamps
    pub departures: Vec<i64>,
    /// Tier the departures came from
    pub tier: MatchTier,
}

/// The three candidate sets filled during one scan
#[derive(Debug, Clone)]
pub struct TieredCandidates {
    exact: CandidateSet,
    heuristic: CandidateSet,
    fallback: CandidateSet,
}

impl TieredCandidates {
    /// Creates empty tiers of `limit` slots each
    pub fn new(limit: usize) -> Self {
        Self {
            exact: CandidateSet::new(limit),
            heuristic: CandidateSet::new(limit),
            fallback: CandidateSet::new(limit),
        }
    }

    /// Route a candidate into every tier it qualifies for.
    ///
    /// Returns the tiers that accepted it, most specific first.
    pub fn offer(&mut self, query: &Query, candidate: &Candidate) -> Vec<MatchTier> {
        let mut accepted = Vec::new();

        if query.matches_route(candidate.route_id.as_deref())
            && self.exact.offer(candidate.timestamp)
        {
            accepted.push(MatchTier::Exact);
        }
        let route_absent = candidate.route_id.as_deref().map_or(true, str::is_empty);
        if route_absent
            && query.trip_mentions_route(candidate.trip_id.as_deref())
            && self.heuristic.offer(candidate.timestamp)
        {
            accepted.push(MatchTier::Heuristic);
        }
        if self.fallback.offer(candidate.timestamp) {
            accepted.push(MatchTier::Fallback);
        }

        accepted
    }

    /// Returns true if the exact tier is full within `tolerance` seconds
    pub fn is_settled(&self, tolerance: i64) -> bool {
        self.exact.is_settled(tolerance)
    }

    /// Candidates held by one tier
    pub fn tier(&self, tier: MatchTier) -> &[i64] {
        match tier {
            MatchTier::Exact => self.exact.as_slice(),
            MatchTier::Heuristic => self.heuristic.as_slice(),
            MatchTier::Fallback => self.fallback.as_slice(),
            MatchTier::None => &[],
        }
    }

    /// Take the first non-empty tier: exact, then heuristic, then fallback
    pub fn select(self) -> Selection {
        let tiers = [
            (MatchTier::Exact, self.exact),
            (MatchTier::Heuristic, self.heuristic),
            (MatchTier::Fallback, self.fallback),
        ];

        tiers
            .into_iter()
            .find(|(_, set)| !set.is_empty())
            .map(|(tier, set)| Selection {
                departures: set.into_vec(),
                tier,
            })
            .unwrap_or(Selection {
                departures: Vec::new(),
                tier: MatchTier::None,
            })
    }
}
