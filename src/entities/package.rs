//! Package entity - A purchasable add-on for a booking.
//!
//! A package with a `venue_id` belongs to that venue's own offering and counts
//! toward the venue's minimum spend. A package with no `venue_id` is global,
//! managed by admins, offered on every venue, and billed as an extra.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Package database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "packages")]
pub struct Model {
    /// Unique identifier for the package
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning venue, None for global packages
    pub venue_id: Option<i64>,
    /// Display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Price in minor currency units
    pub price_cents: i64,
    /// `"fixed"` or `"per_person"`
    pub price_type: String,
    /// One of `food`, `beverage`, `staff`, `equipment`, `photography`, `dj`
    pub category: String,
    /// Inactive packages are hidden and cannot be selected
    pub is_active: bool,
    /// When the package was created
    pub created_at: DateTimeUtc,
    /// When the package was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Package and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Venue-scoped packages belong to one venue
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
