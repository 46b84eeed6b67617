//! Core business logic, independent of the HTTP layer.
//!
//! Pricing and scheduling are pure; everything else works against a sea-orm
//! connection and returns [`crate::errors::Result`].

/// Guest-facing conflict checks on a venue's calendar
pub mod availability;
/// Booking submission, payment confirmation and status changes
pub mod booking;
/// Currency and minor-unit conversion
pub mod money;
/// Packages, combos and booking-time snapshots
pub mod package;
/// The pricing engine
pub mod pricing;
/// Time windows, slots and days of week
pub mod schedule;
/// Start-up seeding from configuration
pub mod seed;
/// Venues and pricing rules
pub mod venue;
