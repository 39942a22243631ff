//! Bounded, ordered, duplicate-free timestamp collection.

/// The earliest `limit` distinct timestamps offered so far, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    limit: usize,
    times: Vec<i64>,
}

impl CandidateSet {
    /// Creates an empty set holding at most `limit` timestamps (at least 1)
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            times: Vec::with_capacity(limit + 1),
        }
    }

    /// Offer a timestamp.
    ///
    /// Returns true if the set changed. Values already held, or later than
    /// every held value once the set is full, are ignored.
    pub fn offer(&mut self, timestamp: i64) -> bool {
        match self.times.binary_search(&timestamp) {
            Ok(_) => false,
            Err(index) if index >= self.limit => false,
            Err(index) => {
                self.times.insert(index, timestamp);
                self.times.truncate(self.limit);
                true
            }
        }
    }

    /// Returns true once `limit` timestamps are held
    pub fn is_full(&self) -> bool {
        self.times.len() >= self.limit
    }

    /// Returns true if the set is full and its spread is within `tolerance`
    /// seconds.
    ///
    /// Scanning further can then only replace held values with ones that
    /// are earlier still, which a time-ordered feed does not produce.
    pub fn is_settled(&self, tolerance: i64) -> bool {
        match (self.times.first(), self.times.last()) {
            (Some(first), Some(last)) if self.is_full() => last - first <= tolerance,
            _ => false,
        }
    }

    /// Maximum number of timestamps held
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of timestamps held
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Returns true if no timestamp has been accepted
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// The held timestamps, ascending
    pub fn as_slice(&self) -> &[i64] {
        &self.times
    }

    /// Consumes the set, returning the held timestamps
    pub fn into_vec(self) -> Vec<i64> {
        self.times
    }
}
