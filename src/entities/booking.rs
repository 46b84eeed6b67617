//! Booking entity - The transactional record of a reserved venue slot.
//!
//! Calculated amounts and the package snapshot are written once at creation and
//! never updated; only `status`, `payment_session_id` and `updated_at` change.
//! `slot_start`/`slot_end` are absolute minutes (day number * 1440 + minute of day)
//! so overnight windows compare correctly across the date boundary.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Booking database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    /// Unique identifier for the booking
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Booked venue
    pub venue_id: i64,
    /// User who made the booking
    pub user_id: String,
    /// Calendar date the event starts on
    pub event_date: Date,
    /// Start time, `HH:mm`
    pub start_time: String,
    /// End time, `HH:mm`
    pub end_time: String,
    /// Whether the window ends on the following day
    pub spans_midnight: bool,
    /// Absolute start minute of the occupied slot
    pub slot_start: i64,
    /// Absolute end minute (exclusive) of the occupied slot
    pub slot_end: i64,
    /// Number of guests
    pub guest_count: i32,
    /// Packages and prices as they were at submission time
    pub selected_packages: Json,
    /// Venue rental fee in minor units
    pub calculated_venue_cost_cents: i64,
    /// Minimum-spend top-up in minor units
    pub calculated_min_spend_gap_cents: i64,
    /// Global extras in minor units
    pub calculated_extras_cost_cents: i64,
    /// Platform fee in minor units
    pub calculated_platform_fee_cents: i64,
    /// Amount charged in minor units
    pub total_amount_cents: i64,
    /// ISO currency code, lowercase
    pub currency: String,
    /// `pending_payment`, `confirmed`, `cancelled` or `completed`
    pub status: String,
    /// Checkout session issued by the payment provider
    pub payment_session_id: Option<String>,
    /// When the booking was created
    pub created_at: DateTimeUtc,
    /// When the status last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Booking and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each booking belongs to one venue
    #[sea_orm(
        belongs_to = "super::venue::Entity",
        from = "Column::VenueId",
        to = "super::venue::Column::Id"
    )]
    Venue,
}

impl Related<super::venue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Venue.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
