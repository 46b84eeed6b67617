//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the persisted records and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod booking;
pub mod package;
pub mod package_item;
pub mod pricing_rule;
pub mod venue;

// Re-export specific types to avoid conflicts
pub use booking::{Column as BookingColumn, Entity as Booking, Model as BookingModel};
pub use package::{Column as PackageColumn, Entity as Package, Model as PackageModel};
pub use package_item::{
    Column as PackageItemColumn, Entity as PackageItem, Model as PackageItemModel,
};
pub use pricing_rule::{
    Column as PricingRuleColumn, Entity as PricingRule, Model as PricingRuleModel,
};
pub use venue::{Column as VenueColumn, Entity as Venue, Model as VenueModel};
