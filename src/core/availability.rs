//! Availability checker - guards a venue's calendar against double booking.
//!
//! Two windows conflict when their absolute slots overlap under the half-open rule,
//! so a booking ending at 11:00 does not block one starting at 11:00. Every booking
//! that is not cancelled blocks, including ones still waiting for payment.

use crate::{
    core::{
        booking::BookingStatus,
        schedule::{Slot, TimeWindow},
    },
    entities::{Booking, booking},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::prelude::*;
use tracing::debug;

/// Returns true when a non-cancelled booking of `venue_id` overlaps the window on `event_date`.
pub async fn has_conflict<C>(
    db: &C,
    venue_id: i64,
    event_date: NaiveDate,
    window: &TimeWindow,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let slot = window.slot_on(event_date);
    let blocking = count_overlapping(db, venue_id, slot).await?;
    debug!(venue_id, %event_date, slot_start = slot.start, slot_end = slot.end, blocking, "Availability checked");
    Ok(blocking > 0)
}

async fn count_overlapping<C>(db: &C, venue_id: i64, slot: Slot) -> Result<u64>
where
    C: ConnectionTrait,
{
    Booking::find()
        .filter(booking::Column::VenueId.eq(venue_id))
        .filter(booking::Column::Status.ne(BookingStatus::Cancelled.as_str()))
        .filter(booking::Column::SlotStart.lt(slot.end))
        .filter(booking::Column::SlotEnd.gt(slot.start))
        .count(db)
        .await
        .map_err(Into::into)
}
