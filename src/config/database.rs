//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Constraints the entities cannot express
//! (composite uniqueness, the booking overlap guard) are installed afterwards as raw SQL.

use crate::entities::{Booking, Package, PackageItem, PricingRule, Venue};
use crate::errors::{BOOKING_OVERLAP_MARKER, Result};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info};

/// Default location of the `SQLite` database file.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/venue_booking.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all tables and storage-level constraints if they do not exist yet.
///
/// Safe to call on every start-up.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    // Parents before children so foreign keys resolve
    create_table(db, &schema, Venue).await?;
    create_table(db, &schema, PricingRule).await?;
    create_table(db, &schema, Package).await?;
    create_table(db, &schema, PackageItem).await?;
    create_table(db, &schema, Booking).await?;

    create_constraints(db).await?;
    info!("Database tables and constraints ensured");
    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

async fn create_constraints(db: &DatabaseConnection) -> Result<()> {
    // At most one rule per venue and day of week
    db.execute_unprepared(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_pricing_rules_venue_day
            ON pricing_rules(venue_id, day_of_week)",
    )
    .await?;

    db.execute_unprepared(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_package_items_edge
            ON package_items(parent_package_id, child_package_id)",
    )
    .await?;

    db.execute_unprepared(
        "CREATE INDEX IF NOT EXISTS idx_bookings_venue_slot
            ON bookings(venue_id, slot_start, slot_end)",
    )
    .await?;

    // Exclusion constraint: concurrent submissions that both passed the
    // availability check cannot both land on the calendar.
    db.execute_unprepared(&format!(
        "CREATE TRIGGER IF NOT EXISTS trg_bookings_no_overlap
            BEFORE INSERT ON bookings
            WHEN NEW.status <> 'cancelled' AND EXISTS (
                SELECT 1 FROM bookings b
                WHERE b.venue_id = NEW.venue_id
                  AND b.status <> 'cancelled'
                  AND b.slot_start < NEW.slot_end
                  AND b.slot_end > NEW.slot_start
            )
        BEGIN
            SELECT RAISE(ABORT, '{BOOKING_OVERLAP_MARKER}');
        END"
    ))
    .await?;

    Ok(())
}
