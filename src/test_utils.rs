//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating venues, rules and packages with sensible defaults.

use crate::{
    api::AppState,
    auth::{AuthUser, InMemorySessions, Role},
    config::settings::BookingSettings,
    core::{
        package::{self, NewPackage},
        pricing::{PackageCategory, PriceType, PricingModel},
        venue::{self, NewPricingRule, NewVenue},
    },
    entities,
    errors::Result,
    payment::{PaymentProvider, SandboxPaymentProvider},
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Host that owns every test venue.
pub const HOST_ID: &str = "host-1";
/// Client that makes test bookings.
pub const CLIENT_ID: &str = "client-1";
/// Bearer token of [`CLIENT_ID`] in [`setup_app_state`].
pub const CLIENT_TOKEN: &str = "tok-client";
/// Bearer token of [`HOST_ID`] in [`setup_app_state`].
pub const HOST_TOKEN: &str = "tok-host";
/// Webhook secret used by [`setup_app_state`].
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test";

/// Installs a test-friendly tracing subscriber; safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// The owning host of test venues.
#[must_use]
pub fn host_user() -> AuthUser {
    AuthUser::new(HOST_ID, Role::Host)
}

/// A platform admin.
#[must_use]
pub fn admin_user() -> AuthUser {
    AuthUser::new("admin-1", Role::Admin)
}

/// A client making bookings.
#[must_use]
pub fn client_user() -> AuthUser {
    AuthUser::new(CLIENT_ID, Role::Client)
}

/// A Friday (2025-03-14).
#[must_use]
pub fn friday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).unwrap_or_default()
}

/// Venue fields with sensible defaults.
///
/// # Defaults
/// * seated capacity: 40
/// * standing capacity: 80
#[must_use]
pub fn test_new_venue(slug: &str) -> NewVenue {
    NewVenue {
        title: format!("Venue {slug}"),
        slug: slug.to_string(),
        description: None,
        address_street: "Rua Augusta, 100".to_string(),
        address_neighborhood: "Consolacao".to_string(),
        address_city: "Sao Paulo".to_string(),
        max_capacity_seated: 40,
        max_capacity_standing: 80,
        amenities: vec!["wifi".to_string()],
        images: vec![],
    }
}

/// Creates a test venue owned by [`HOST_ID`].
pub async fn create_test_venue(
    db: &DatabaseConnection,
    slug: &str,
) -> Result<entities::venue::Model> {
    venue::create_venue(db, &host_user(), test_new_venue(slug)).await
}

/// Creates an hourly pricing rule with min hours 5.
pub async fn create_hourly_rule(
    db: &DatabaseConnection,
    venue_id: i64,
    day_of_week: u32,
    base_price: f64,
    minimum_spend: f64,
) -> Result<entities::pricing_rule::Model> {
    venue::set_pricing_rule(
        db,
        &host_user(),
        venue_id,
        NewPricingRule {
            day_of_week,
            pricing_model: PricingModel::Hourly,
            base_price,
            minimum_spend,
            min_hours: 5,
        },
    )
    .await
}

/// Creates a test package. `venue_id` None creates a global package as admin.
pub async fn create_test_package(
    db: &DatabaseConnection,
    venue_id: Option<i64>,
    name: &str,
    price: f64,
    price_type: PriceType,
) -> Result<entities::package::Model> {
    let actor = if venue_id.is_some() {
        host_user()
    } else {
        admin_user()
    };
    package::create_package(
        db,
        &actor,
        NewPackage {
            venue_id,
            name: name.to_string(),
            description: None,
            price,
            price_type,
            category: PackageCategory::Food,
        },
    )
    .await
}

/// Sets up a venue with the reference Friday rule: hourly, 500/h, minimum spend 2000.
/// Returns (db, venue) for booking scenarios.
pub async fn setup_with_priced_venue() -> Result<(DatabaseConnection, entities::venue::Model)> {
    let db = setup_test_db().await?;
    let venue = create_test_venue(&db, "test-venue").await?;
    create_hourly_rule(&db, venue.id, 5, 500.0, 2000.0).await?;
    Ok((db, venue))
}

/// Builds HTTP state over [`setup_with_priced_venue`] with a sandbox payment provider
/// and two sessions: [`CLIENT_TOKEN`] and [`HOST_TOKEN`].
///
/// The provider is returned separately so tests can inspect requests or make it fail.
pub async fn setup_app_state() -> Result<(AppState, Arc<SandboxPaymentProvider>, entities::venue::Model)> {
    let (db, venue) = setup_with_priced_venue().await?;
    let payment = Arc::new(SandboxPaymentProvider::new("https://pay.example/checkout"));
    let sessions = InMemorySessions::new();
    sessions.insert(CLIENT_TOKEN, client_user()).await;
    sessions.insert(HOST_TOKEN, host_user()).await;

    let state = AppState {
        db,
        payment: Arc::clone(&payment) as Arc<dyn PaymentProvider>,
        sessions: Arc::new(sessions),
        settings: Arc::new(BookingSettings::default()),
        webhook_secret: Arc::from(TEST_WEBHOOK_SECRET),
    };
    Ok((state, payment, venue))
}
