//! Synthetic feeds for tests.
//!
//! The messages below mirror the subset of `gtfs-realtime.proto` the scanner
//! reads, with the same field numbers as [`crate::schema`], and are encoded
//! by `prost` so the hand-written reader is checked against a real encoder.

#![allow(missing_docs, unreachable_pub)]

use prost::Message;

#[derive(Clone, PartialEq, Message)]
pub struct FeedMessage {
    #[prost(message, optional, tag = "1")]
    pub header: Option<FeedHeader>,
    #[prost(message, repeated, tag = "2")]
    pub entity: Vec<FeedEntity>,
}

#[derive(Clone, PartialEq, Message)]
pub struct FeedHeader {
    #[prost(string, optional, tag = "1")]
    pub gtfs_realtime_version: Option<String>,
    #[prost(uint32, optional, tag = "2")]
    pub incrementality: Option<u32>,
    #[prost(uint64, optional, tag = "3")]
    pub timestamp: Option<u64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct FeedEntity {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(message, optional, tag = "3")]
    pub trip_update: Option<TripUpdate>,
}

#[derive(Clone, PartialEq, Message)]
pub struct TripUpdate {
    #[prost(message, optional, tag = "1")]
    pub trip: Option<TripDescriptor>,
    #[prost(message, repeated, tag = "2")]
    pub stop_time_update: Vec<StopTimeUpdate>,
    #[prost(uint64, optional, tag = "4")]
    pub timestamp: Option<u64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct TripDescriptor {
    #[prost(string, optional, tag = "1")]
    pub trip_id: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub route_id: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct StopTimeUpdate {
    #[prost(uint32, optional, tag = "1")]
    pub stop_sequence: Option<u32>,
    #[prost(message, optional, tag = "2")]
    pub arrival: Option<StopTimeEvent>,
    #[prost(message, optional, tag = "3")]
    pub departure: Option<StopTimeEvent>,
    #[prost(string, optional, tag = "4")]
    pub stop_id: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct StopTimeEvent {
    #[prost(int32, optional, tag = "1")]
    pub delay: Option<i32>,
    #[prost(int64, optional, tag = "2")]
    pub time: Option<i64>,
    #[prost(int32, optional, tag = "3")]
    pub uncertainty: Option<i32>,
}

pub fn encode(message: &impl Message) -> Vec<u8> {
    message.encode_to_vec()
}

/// Append a length-delimited field to `buf`
pub fn put_len(buf: &mut Vec<u8>, field_number: u32, payload: &[u8]) {
    prost::encoding::encode_key(
        field_number,
        prost::encoding::WireType::LengthDelimited,
        buf,
    );
    prost::encoding::encode_varint(payload.len() as u64, buf);
    buf.extend_from_slice(payload);
}

pub fn header(timestamp: i64) -> FeedHeader {
    FeedHeader {
        gtfs_realtime_version: Some("2.0".to_string()),
        incrementality: Some(0),
        timestamp: Some(timestamp as u64),
    }
}

fn event(time: i64) -> StopTimeEvent {
    StopTimeEvent {
        delay: Some(0),
        time: Some(time),
        uncertainty: None,
    }
}

pub fn stop_time(stop_id: &str, arrival: Option<i64>, departure: Option<i64>) -> StopTimeUpdate {
    StopTimeUpdate {
        stop_sequence: Some(7),
        arrival: arrival.map(event),
        departure: departure.map(event),
        stop_id: Some(stop_id.to_string()),
    }
}

pub fn entity_with(
    route_id: Option<&str>,
    trip_id: Option<&str>,
    stop_time_update: Vec<StopTimeUpdate>,
) -> FeedEntity {
    FeedEntity {
        id: format!("{}-{}", route_id.unwrap_or("?"), trip_id.unwrap_or("?")),
        trip_update: Some(TripUpdate {
            trip: Some(TripDescriptor {
                trip_id: trip_id.map(str::to_string),
                route_id: route_id.map(str::to_string),
            }),
            stop_time_update,
            timestamp: Some(1),
        }),
    }
}

/// An entity whose stops all carry an arrival time
pub fn entity(route_id: Option<&str>, trip_id: Option<&str>, stops: &[(&str, i64)]) -> FeedEntity {
    entity_with(
        route_id,
        trip_id,
        stops
            .iter()
            .map(|&(stop_id, time)| stop_time(stop_id, Some(time), None))
            .collect(),
    )
}
