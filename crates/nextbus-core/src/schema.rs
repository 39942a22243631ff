//! Pinned GTFS-Realtime field numbers.
//!
//! The scanner navigates the feed by field number alone, so these values
//! must match the schema revision the feed was encoded with. They follow the
//! published `gtfs-realtime.proto` (`transit_realtime` package, 2.0).
//! Snapshots encoded with other numberings (trip update at 4, stop id at 1,
//! event time at 1) are not detected and will simply yield no departures.
//! Only the fields the scanner reads are listed; everything else is skipped.

/// `FeedMessage`
pub mod feed_message {
    /// `FeedHeader header = 1`
    pub const HEADER: u32 = 1;
    /// `repeated FeedEntity entity = 2`
    pub const ENTITY: u32 = 2;
}

/// `FeedHeader`
pub mod feed_header {
    /// `string gtfs_realtime_version = 1`
    pub const GTFS_REALTIME_VERSION: u32 = 1;
    /// `Incrementality incrementality = 2`
    pub const INCREMENTALITY: u32 = 2;
    /// `uint64 timestamp = 3`
    pub const TIMESTAMP: u32 = 3;
}

/// `FeedEntity`
pub mod feed_entity {
    /// `TripUpdate trip_update = 3`
    pub const TRIP_UPDATE: u32 = 3;
}

/// `TripUpdate`
pub mod trip_update {
    /// `TripDescriptor trip = 1`
    pub const TRIP: u32 = 1;
    /// `repeated StopTimeUpdate stop_time_update = 2`
    pub const STOP_TIME_UPDATE: u32 = 2;
}

/// `TripDescriptor`
pub mod trip_descriptor {
    /// `string trip_id = 1`
    pub const TRIP_ID: u32 = 1;
    /// `string route_id = 5`
    pub const ROUTE_ID: u32 = 5;
}

/// `TripUpdate.StopTimeUpdate`
pub mod stop_time_update {
    /// `StopTimeEvent arrival = 2`
    pub const ARRIVAL: u32 = 2;
    /// `StopTimeEvent departure = 3`
    pub const DEPARTURE: u32 = 3;
    /// `string stop_id = 4`
    pub const STOP_ID: u32 = 4;
}

/// `TripUpdate.StopTimeEvent`
pub mod stop_time_event {
    /// `int64 time = 2`
    pub const TIME: u32 = 2;
}
