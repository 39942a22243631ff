//! One fetched feed buffer.

use bytes::Bytes;

/// An immutable, complete feed snapshot.
///
/// The fetch collaborator hands over either a whole buffer or nothing; a
/// `Snapshot` is never a prefix of a larger response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    data: Bytes,
}

impl Snapshot {
    /// Wraps a fetched buffer
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Wraps a buffer embedded in the binary
    pub fn from_static(data: &'static [u8]) -> Self {
        Self {
            data: Bytes::from_static(data),
        }
    }

    /// The raw snapshot bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Snapshot size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true for a zero-length snapshot
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for Snapshot {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl AsRef<[u8]> for Snapshot {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}
