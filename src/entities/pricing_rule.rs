//! Pricing rule entity - How a venue charges on a given day of week.
//!
//! `(venue_id, day_of_week)` is unique; the index is created alongside the table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pricing rule database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pricing_rules")]
pub struct Model {
    /// Unique identifier for the rule
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Venue this rule belongs to
    pub venue_id: i64,
    /// Day of week the rule applies to, 0 = Sunday through 6 = Saturday
    pub day_of_week: i32,
    /// `"hourly"`, `"daily"` or `"per_person"`
    pub pricing_model: String,
    /// Base price in minor currency units
    pub base_price_cents: i64,
    /// Minimum venue spend in minor currency units
    pub minimum_spend_cents: i64,
    /// Minimum number of hours the host expects a booking to last
    pub min_hours: i32,
}

/// Defines relationships between `PricingRule` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each rule belongs to one venue
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
