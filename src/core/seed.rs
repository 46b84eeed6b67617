//! Seeds venues, pricing rules and packages from config.toml.
//!
//! Seeding is idempotent: venues are matched by slug and global packages by name,
//! and anything that already exists is skipped rather than overwritten.

use crate::{
    auth::{AuthUser, Role},
    config::settings::{AppConfig, PackageSeed, VenueSeed},
    core::{
        package::{NewPackage, create_package},
        venue::{NewPricingRule, NewVenue, create_venue, get_venue_by_slug, set_pricing_rule},
    },
    entities::{Package, package},
    errors::{Error, Result},
};
use sea_orm::{TransactionTrait, prelude::*};
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

/// Identity used when seeding global packages.
const SEED_ADMIN_ID: &str = "config-seed";

fn parse_seed_field<T>(value: &str, what: &str) -> Result<T>
where
    T: FromStr<Err = Error>,
{
    value.parse().map_err(|e: Error| Error::Config {
        message: format!("invalid {what} in config: {e}"),
    })
}

fn new_package(seed: &PackageSeed, venue_id: Option<i64>) -> Result<NewPackage> {
    Ok(NewPackage {
        venue_id,
        name: seed.name.clone(),
        description: seed.description.clone(),
        price: seed.price,
        price_type: parse_seed_field(&seed.price_type, "price_type")?,
        category: parse_seed_field(&seed.category, "category")?,
    })
}

/// Seeds one venue with its rules and packages, all or nothing.
async fn seed_venue(db: &DatabaseConnection, seed: &VenueSeed) -> Result<bool> {
    if get_venue_by_slug(db, &seed.slug).await?.is_some() {
        warn!("Venue '{}' already exists. Skipping.", seed.slug);
        return Ok(false);
    }

    let txn = db.begin().await?;
    let host = AuthUser::new(seed.host_id.clone(), Role::Host);
    let venue = create_venue(
        &txn,
        &host,
        NewVenue {
            title: seed.title.clone(),
            slug: seed.slug.clone(),
            description: seed.description.clone(),
            address_street: seed.address_street.clone(),
            address_neighborhood: seed.address_neighborhood.clone(),
            address_city: seed.address_city.clone(),
            max_capacity_seated: seed.max_capacity_seated,
            max_capacity_standing: seed.max_capacity_standing,
            amenities: seed.amenities.clone(),
            images: seed.images.clone(),
        },
    )
    .await?;

    for rule in &seed.pricing_rules {
        set_pricing_rule(
            &txn,
            &host,
            venue.id,
            NewPricingRule {
                day_of_week: rule.day_of_week,
                pricing_model: parse_seed_field(&rule.pricing_model, "pricing_model")?,
                base_price: rule.base_price,
                minimum_spend: rule.minimum_spend,
                min_hours: rule.min_hours,
            },
        )
        .await?;
    }

    for package in &seed.packages {
        create_package(&txn, &host, new_package(package, Some(venue.id))?).await?;
    }

    txn.commit().await?;

    debug!(
        venue_id = venue.id,
        rules = seed.pricing_rules.len(),
        packages = seed.packages.len(),
        "Venue seeded"
    );
    Ok(true)
}

async fn seed_global_package(db: &DatabaseConnection, seed: &PackageSeed) -> Result<bool> {
    let exists = Package::find()
        .filter(package::Column::VenueId.is_null())
        .filter(package::Column::Name.eq(seed.name.as_str()))
        .one(db)
        .await?
        .is_some();
    if exists {
        warn!("Global package '{}' already exists. Skipping.", seed.name);
        return Ok(false);
    }

    let admin = AuthUser::new(SEED_ADMIN_ID, Role::Admin);
    create_package(db, &admin, new_package(seed, None)?).await?;
    Ok(true)
}

/// Creates the venues and global packages listed in the configuration.
#[instrument(skip(db, config))]
pub async fn seed_from_config(db: &DatabaseConnection, config: &AppConfig) -> Result<()> {
    info!(
        "Seeding {} venues and {} global packages from config",
        config.venues.len(),
        config.packages.len()
    );

    let mut venues_created = 0;
    for venue in &config.venues {
        if seed_venue(db, venue).await? {
            venues_created += 1;
        }
    }

    let mut packages_created = 0;
    for package in &config.packages {
        if seed_global_package(db, package).await? {
            packages_created += 1;
        }
    }

    info!(venues_created, packages_created, "Finished seeding");
    Ok(())
}
