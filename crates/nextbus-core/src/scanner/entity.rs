//! Per-entity departure extraction.
//!
//! Each function here reads one nested message type through the shared
//! [`walk`] loop and recognises only the fields departure extraction needs.

use super::observer::ScanObserver;
use super::wire::{walk, Reader, Visit, WireType};
use crate::error::Result;
use crate::schema::{feed_entity, stop_time_event, stop_time_update, trip_descriptor, trip_update};
use crate::select::{Candidate, Query};

/// Identifiers read from a trip descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TripIds {
    trip_id: Option<String>,
    route_id: Option<String>,
}

/// The parts of a stop-time update that matter for departures
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct StopTime {
    stop_id: Option<String>,
    arrival: Option<i64>,
    departure: Option<i64>,
}

impl StopTime {
    /// Earliest of the predicted arrival and departure
    fn earliest(&self) -> Option<i64> {
        match (self.arrival, self.departure) {
            (Some(a), Some(d)) => Some(a.min(d)),
            (a, d) => a.or(d),
        }
    }

    /// Time at the target stop, if this update serves it at or after `now`
    fn qualifying_time(&self, query: &Query, now: i64) -> Option<i64> {
        let stop_id = self.stop_id.as_deref()?;
        if !query.matches_stop(stop_id) {
            return None;
        }
        self.earliest().filter(|&t| t >= now)
    }
}

/// Find the earliest qualifying stop time in one `FeedEntity`.
///
/// Only the first trip update of the entity is considered. Entities without
/// one yield `None`.
pub(crate) fn find_in_entity<O: ScanObserver + ?Sized>(
    entity: Reader<'_>,
    query: &Query,
    now: i64,
    observer: &mut O,
) -> Result<Option<Candidate>> {
    let mut found = None;

    walk(entity, |tag, reader| {
        if tag.is(feed_entity::TRIP_UPDATE, WireType::Len) {
            observer.trip_update();
            found = find_in_trip_update(reader.read_message()?, query, now, &mut *observer)?;
            return Ok(Visit::Stop);
        }
        Ok(Visit::Skip)
    })?;

    Ok(found)
}

fn find_in_trip_update<O: ScanObserver + ?Sized>(
    message: Reader<'_>,
    query: &Query,
    now: i64,
    observer: &mut O,
) -> Result<Option<Candidate>> {
    let mut trip = TripIds::default();
    let mut best: Option<(i64, Option<String>)> = None;

    walk(message, |tag, reader| {
        if tag.is(trip_update::TRIP, WireType::Len) {
            trip = read_trip_descriptor(reader.read_message()?)?;
        } else if tag.is(trip_update::STOP_TIME_UPDATE, WireType::Len) {
            let stop_time = read_stop_time_update(reader.read_message()?)?;
            observer.stop_time_update(stop_time.stop_id.as_deref());

            if let Some(t) = stop_time.qualifying_time(query, now) {
                if best.as_ref().map_or(true, |(held, _)| t < *held) {
                    best = Some((t, stop_time.stop_id));
                }
            }
        } else {
            return Ok(Visit::Skip);
        }
        Ok(Visit::Consumed)
    })?;

    Ok(best.map(|(timestamp, stop_id)| Candidate {
        timestamp,
        stop_id,
        route_id: trip.route_id,
        trip_id: trip.trip_id,
    }))
}

fn read_trip_descriptor(descriptor: Reader<'_>) -> Result<TripIds> {
    let mut ids = TripIds::default();

    walk(descriptor, |tag, reader| {
        if tag.is(trip_descriptor::TRIP_ID, WireType::Len) {
            ids.trip_id = Some(reader.read_utf8()?.into_owned());
        } else if tag.is(trip_descriptor::ROUTE_ID, WireType::Len) {
            ids.route_id = Some(reader.read_utf8()?.into_owned());
        } else {
            return Ok(Visit::Skip);
        }
        Ok(Visit::Consumed)
    })?;

    Ok(ids)
}

fn read_stop_time_update(update: Reader<'_>) -> Result<StopTime> {
    let mut stop_time = StopTime::default();

    walk(update, |tag, reader| {
        if tag.is(stop_time_update::STOP_ID, WireType::Len) {
            stop_time.stop_id = Some(reader.read_utf8()?.into_owned());
        } else if tag.is(stop_time_update::ARRIVAL, WireType::Len) {
            stop_time.arrival = read_event_time(reader.read_message()?)?;
        } else if tag.is(stop_time_update::DEPARTURE, WireType::Len) {
            stop_time.departure = read_event_time(reader.read_message()?)?;
        } else {
            return Ok(Visit::Skip);
        }
        Ok(Visit::Consumed)
    })?;

    Ok(stop_time)
}

fn read_event_time(event: Reader<'_>) -> Result<Option<i64>> {
    let mut time = None;

    walk(event, |tag, reader| {
        if tag.is(stop_time_event::TIME, WireType::Varint) {
            // int64 on the wire: two's complement in 64 bits
            time = Some(reader.read_varint64()? as i64);
            return Ok(Visit::Consumed);
        }
        Ok(Visit::Skip)
    })?;

    Ok(time)
}
