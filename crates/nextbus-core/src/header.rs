//! Feed header extraction.
//!
//! The header is top-level field 1. Every attribute is optional: a missing
//! header, a missing field, or a header whose bytes do not decode all yield
//! `None` values rather than an error.

use crate::error::Result;
use crate::scanner::wire::{walk, Reader, Visit, WireType};
use crate::schema::{feed_header, feed_message};
use tracing::{debug, warn};

/// Metadata from the feed's header submessage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedHeader {
    /// `gtfs_realtime_version`, e.g. `"2.0"`
    pub version: Option<String>,
    /// Raw `incrementality` enum value (0 = full dataset, 1 = differential)
    pub incrementality: Option<u32>,
    /// Moment the feed was produced, POSIX seconds
    pub timestamp: Option<i64>,
}

impl FeedHeader {
    /// Returns true if the header was missing or carried no known field
    pub fn is_empty(&self) -> bool {
        self.version.is_none() && self.incrementality.is_none() && self.timestamp.is_none()
    }

    /// Seconds between the feed timestamp and `now`, never negative
    pub fn age_seconds(&self, now: i64) -> Option<i64> {
        self.timestamp.map(|ts| now.saturating_sub(ts).max(0))
    }
}

/// Decode the fields of a header submessage.
fn read_header(reader: Reader<'_>) -> Result<FeedHeader> {
    let mut header = FeedHeader::default();

    walk(reader, |tag, reader| {
        if tag.is(feed_header::GTFS_REALTIME_VERSION, WireType::Len) {
            header.version = Some(reader.read_utf8()?.into_owned());
        } else if tag.is(feed_header::INCREMENTALITY, WireType::Varint) {
            header.incrementality = Some(reader.read_varint()?);
        } else if tag.is(feed_header::TIMESTAMP, WireType::Varint) {
            header.timestamp = i64::try_from(reader.read_varint64()?).ok();
        } else {
            return Ok(Visit::Skip);
        }
        Ok(Visit::Consumed)
    })?;

    Ok(header)
}

/// Decode a header submessage, falling back to an empty header if its
/// bytes are corrupt.
///
/// The reader is already bounded to the header's declared length, so a bad
/// field inside it cannot desynchronise the enclosing feed.
pub(crate) fn read_header_contained(reader: Reader<'_>) -> FeedHeader {
    let base = reader.base();
    match read_header(reader) {
        Ok(header) => {
            debug!(
                "Feed header: version {:?}, incrementality {:?}, timestamp {:?}",
                header.version, header.incrementality, header.timestamp
            );
            header
        }
        Err(e) => {
            warn!("Ignoring corrupt feed header at offset {}: {}", base, e);
            FeedHeader::default()
        }
    }
}

/// Extract only the header of a feed snapshot.
///
/// Stops walking as soon as the header has been read. Errors are returned
/// only for corruption in the top-level field list itself.
pub fn parse_header(data: &[u8]) -> Result<FeedHeader> {
    let mut header = FeedHeader::default();

    walk(Reader::new(data), |tag, reader| {
        if tag.is(feed_message::HEADER, WireType::Len) {
            header = read_header_contained(reader.read_message()?);
            return Ok(Visit::Stop);
        }
        Ok(Visit::Skip)
    })?;

    Ok(header)
}

/// Feed freshness document served next to the departure board
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct FeedStatus {
    /// Always true for a decoded snapshot
    pub ok: bool,
    /// `gtfs_realtime_version` from the header
    pub gtfs_realtime_version: Option<String>,
    /// Raw incrementality value from the header
    pub incrementality: Option<u32>,
    /// Feed timestamp, POSIX seconds
    pub timestamp: Option<i64>,
    /// Seconds since the feed timestamp
    pub age_seconds: Option<i64>,
}

impl FeedStatus {
    /// Builds the status document for a header observed at `now`
    pub fn from_header(header: &FeedHeader, now: i64) -> Self {
        Self {
            ok: true,
            gtfs_realtime_version: header.version.clone(),
            incrementality: header.incrementality,
            timestamp: header.timestamp,
            age_seconds: header.age_seconds(now),
        }
    }
}
