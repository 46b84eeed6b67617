//! Venue entity - A bookable space owned by a host.
//!
//! Venues are never hard-deleted; hosts and admins deactivate them through the
//! `is_active` flag so historical bookings keep a valid reference.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Venue database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "venues")]
pub struct Model {
    /// Unique identifier for the venue
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User ID of the owning host
    pub host_id: String,
    /// Display title
    pub title: String,
    /// URL-friendly unique handle
    #[sea_orm(unique)]
    pub slug: String,
    /// Optional long description
    pub description: Option<String>,
    /// Street line of the address
    pub address_street: String,
    /// Neighborhood of the address
    pub address_neighborhood: String,
    /// City of the address
    pub address_city: String,
    /// Maximum number of seated guests
    pub max_capacity_seated: i32,
    /// Maximum number of standing guests; upper bound for any booking's guest count
    pub max_capacity_standing: i32,
    /// Amenity labels as a JSON array of strings
    pub amenities: Json,
    /// Image URLs as a JSON array of strings
    pub images: Json,
    /// Inactive venues cannot be booked
    pub is_active: bool,
    /// When the venue was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Venue and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One venue has many pricing rules (at most one per day of week)
    #[sea_orm(has_many = "super::pricing_rule::Entity")]
    PricingRules,
    /// One venue has many venue-scoped packages
    #[sea_orm(has_many = "super::package::Entity")]
    Packages,
    /// One venue has many bookings
    #[sea_orm(has_many = "super::booking::Entity")]
    Bookings,
}

impl Related<super::pricing_rule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PricingRules.def()
    }
}

impl Related<super::package::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Packages.def()
    }
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bookings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
