//! Venue business logic - venues and their per-day pricing rules.
//!
//! Venues are created by hosts and changed only by their owning host or an admin.
//! They are never deleted; deactivation hides them from booking. Each venue has at
//! most one pricing rule per day of week, backed by a unique index.

use crate::{
    auth::{AuthUser, Role},
    core::{
        money::parse_amount_to_minor,
        pricing::PricingModel,
        schedule::day_of_week,
    },
    entities::{PricingRule, Venue, pricing_rule, venue},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

/// Fields required to create a venue.
#[derive(Debug, Clone)]
pub struct NewVenue {
    /// Display title
    pub title: String,
    /// Unique slug
    pub slug: String,
    /// Optional description
    pub description: Option<String>,
    /// Street line
    pub address_street: String,
    /// Neighborhood
    pub address_neighborhood: String,
    /// City
    pub address_city: String,
    /// Seated capacity
    pub max_capacity_seated: i32,
    /// Standing capacity
    pub max_capacity_standing: i32,
    /// Amenity labels
    pub amenities: Vec<String>,
    /// Image URLs
    pub images: Vec<String>,
}

/// Fields of a pricing rule for one day of week.
#[derive(Debug, Clone)]
pub struct NewPricingRule {
    /// 0 = Sunday through 6 = Saturday
    pub day_of_week: u32,
    /// Pricing model
    pub pricing_model: PricingModel,
    /// Base price in currency units
    pub base_price: f64,
    /// Minimum spend in currency units
    pub minimum_spend: f64,
    /// Minimum hours
    pub min_hours: u32,
}

/// Creates a venue owned by `actor`. Hosts and admins may create venues.
pub async fn create_venue<C>(
    db: &C,
    actor: &AuthUser,
    new_venue: NewVenue,
) -> Result<venue::Model>
where
    C: ConnectionTrait,
{
    if actor.role == Role::Client {
        return Err(Error::forbidden("only hosts can create venues"));
    }
    if new_venue.title.trim().is_empty() {
        return Err(Error::validation("venue title cannot be empty"));
    }
    if new_venue.slug.trim().is_empty() {
        return Err(Error::validation("venue slug cannot be empty"));
    }
    if new_venue.max_capacity_standing <= 0 || new_venue.max_capacity_seated < 0 {
        return Err(Error::validation("venue capacity must be positive"));
    }

    let venue = venue::ActiveModel {
        host_id: Set(actor.user_id.clone()),
        title: Set(new_venue.title.trim().to_string()),
        slug: Set(new_venue.slug.trim().to_string()),
        description: Set(new_venue.description),
        address_street: Set(new_venue.address_street),
        address_neighborhood: Set(new_venue.address_neighborhood),
        address_city: Set(new_venue.address_city),
        max_capacity_seated: Set(new_venue.max_capacity_seated),
        max_capacity_standing: Set(new_venue.max_capacity_standing),
        amenities: Set(serde_json::json!(new_venue.amenities)),
        images: Set(serde_json::json!(new_venue.images)),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let venue = venue.insert(db).await?;
    info!(venue_id = venue.id, host_id = %venue.host_id, "Venue created");
    Ok(venue)
}

/// Finds a venue by ID, active or not.
pub async fn get_venue_by_id(
    db: &DatabaseConnection,
    venue_id: i64,
) -> Result<Option<venue::Model>> {
    Venue::find_by_id(venue_id).one(db).await.map_err(Into::into)
}

/// Finds a venue by slug, active or not.
pub async fn get_venue_by_slug<C>(
    db: &C,
    slug: &str,
) -> Result<Option<venue::Model>>
where
    C: ConnectionTrait,
{
    Venue::find()
        .filter(venue::Column::Slug.eq(slug))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists active venues ordered by title.
pub async fn list_active_venues(db: &DatabaseConnection) -> Result<Vec<venue::Model>> {
    Venue::find()
        .filter(venue::Column::IsActive.eq(true))
        .order_by_asc(venue::Column::Title)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads a venue that can be booked, rejecting missing and inactive venues.
pub async fn require_active_venue<C>(db: &C, venue_id: i64) -> Result<venue::Model>
where
    C: ConnectionTrait,
{
    let venue = Venue::find_by_id(venue_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Venue", venue_id))?;
    if !venue.is_active {
        return Err(Error::validation(format!(
            "venue {venue_id} is not accepting bookings"
        )));
    }
    Ok(venue)
}

/// Deactivates a venue. Only its host or an admin may do this.
pub async fn deactivate_venue(
    db: &DatabaseConnection,
    actor: &AuthUser,
    venue_id: i64,
) -> Result<venue::Model> {
    let venue = Venue::find_by_id(venue_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Venue", venue_id))?;
    ensure_can_manage(actor, &venue)?;

    let mut active: venue::ActiveModel = venue.into();
    active.is_active = Set(false);
    let venue = active.update(db).await?;
    info!(venue_id, "Venue deactivated");
    Ok(venue)
}

/// Fails unless `actor` is the venue's host or an admin.
pub fn ensure_can_manage(actor: &AuthUser, venue: &venue::Model) -> Result<()> {
    if actor.owns_or_admin(&venue.host_id) {
        Ok(())
    } else {
        Err(Error::forbidden(format!(
            "user {} does not manage venue {}",
            actor.user_id, venue.id
        )))
    }
}

/// Sets the pricing rule for one day of week, replacing any existing rule for that day.
pub async fn set_pricing_rule<C>(
    db: &C,
    actor: &AuthUser,
    venue_id: i64,
    rule: NewPricingRule,
) -> Result<pricing_rule::Model>
where
    C: ConnectionTrait,
{
    let venue = Venue::find_by_id(venue_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Venue", venue_id))?;
    ensure_can_manage(actor, &venue)?;

    if rule.day_of_week > 6 {
        return Err(Error::validation(format!(
            "day_of_week {} must be between 0 (Sunday) and 6 (Saturday)",
            rule.day_of_week
        )));
    }
    let base_price_cents = parse_amount_to_minor(rule.base_price)?;
    let minimum_spend_cents = parse_amount_to_minor(rule.minimum_spend)?;
    let min_hours = i32::try_from(rule.min_hours)
        .map_err(|_| Error::validation("min_hours is too large"))?;
    let day = i32::try_from(rule.day_of_week)
        .map_err(|_| Error::validation("day_of_week is out of range"))?;

    let existing = PricingRule::find()
        .filter(pricing_rule::Column::VenueId.eq(venue_id))
        .filter(pricing_rule::Column::DayOfWeek.eq(day))
        .one(db)
        .await?;

    let pricing_model = rule.pricing_model.as_str().to_string();
    let saved = match existing {
        Some(model) => {
            let mut active: pricing_rule::ActiveModel = model.into();
            active.pricing_model = Set(pricing_model);
            active.base_price_cents = Set(base_price_cents);
            active.minimum_spend_cents = Set(minimum_spend_cents);
            active.min_hours = Set(min_hours);
            active.update(db).await
        }
        None => {
            pricing_rule::ActiveModel {
                venue_id: Set(venue_id),
                day_of_week: Set(day),
                pricing_model: Set(pricing_model),
                base_price_cents: Set(base_price_cents),
                minimum_spend_cents: Set(minimum_spend_cents),
                min_hours: Set(min_hours),
                ..Default::default()
            }
            .insert(db)
            .await
        }
    }
    .map_err(|e| {
        if matches!(e.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) {
            Error::validation(format!(
                "venue {venue_id} already has a rule for day {}",
                rule.day_of_week
            ))
        } else {
            e.into()
        }
    })?;
    info!(venue_id, day_of_week = rule.day_of_week, "Pricing rule set");
    Ok(saved)
}

/// Lists a venue's pricing rules ordered by day of week.
pub async fn get_pricing_rules(
    db: &DatabaseConnection,
    venue_id: i64,
) -> Result<Vec<pricing_rule::Model>> {
    PricingRule::find()
        .filter(pricing_rule::Column::VenueId.eq(venue_id))
        .order_by_asc(pricing_rule::Column::DayOfWeek)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds the rule that applies to `date`, or None when the venue is closed that day.
pub async fn resolve_pricing_rule<C>(
    db: &C,
    venue_id: i64,
    date: NaiveDate,
) -> Result<Option<pricing_rule::Model>>
where
    C: ConnectionTrait,
{
    let day = i32::try_from(day_of_week(date)).unwrap_or_default();
    PricingRule::find()
        .filter(pricing_rule::Column::VenueId.eq(venue_id))
        .filter(pricing_rule::Column::DayOfWeek.eq(day))
        .one(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_venue_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let mut new_venue = test_new_venue("empty-title");
        new_venue.title = "  ".to_string();
        let result = create_venue(&db, &host_user(), new_venue).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let mut new_venue = test_new_venue("no-capacity");
        new_venue.max_capacity_standing = 0;
        let result = create_venue(&db, &host_user(), new_venue).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_venue(&db, &client_user(), test_new_venue("client")).await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));
        assert!(list_active_venues(&db).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_create_and_find_venue() -> Result<()> {
        let db = setup_test_db().await?;
        let venue = create_test_venue(&db, "salao-azul").await?;

        assert_eq!(venue.host_id, HOST_ID);
        assert!(venue.is_active);
        assert_eq!(get_venue_by_slug(&db, "salao-azul").await?.unwrap().id, venue.id);
        assert_eq!(list_active_venues(&db).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_deactivate_requires_owner() -> Result<()> {
        let db = setup_test_db().await?;
        let venue = create_test_venue(&db, "terraco").await?;

        let other_host = AuthUser::new("host-2", Role::Host);
        let result = deactivate_venue(&db, &other_host, venue.id).await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));

        let updated = deactivate_venue(&db, &admin_user(), venue.id).await?;
        assert!(!updated.is_active);
        assert!(list_active_venues(&db).await?.is_empty());

        let result = require_active_venue(&db, venue.id).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_set_pricing_rule_replaces_same_day() -> Result<()> {
        let db = setup_test_db().await?;
        let venue = create_test_venue(&db, "galpao").await?;

        let first = create_hourly_rule(&db, venue.id, 5, 500.0, 2000.0).await?;
        let second = create_hourly_rule(&db, venue.id, 5, 650.0, 3000.0).await?;

        assert_eq!(first.id, second.id);
        assert_eq!(second.base_price_cents, 65_000);
        assert_eq!(second.minimum_spend_cents, 300_000);
        assert_eq!(get_pricing_rules(&db, venue.id).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_set_pricing_rule_rejects_bad_day() -> Result<()> {
        let db = setup_test_db().await?;
        let venue = create_test_venue(&db, "loft").await?;

        let rule = NewPricingRule {
            day_of_week: 7,
            pricing_model: PricingModel::Daily,
            base_price: 100.0,
            minimum_spend: 0.0,
            min_hours: 0,
        };
        let result = set_pricing_rule(&db, &host_user(), venue.id, rule).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_storage_rejects_second_rule_for_same_day() -> Result<()> {
        let db = setup_test_db().await?;
        let venue = create_test_venue(&db, "sobrado").await?;
        create_hourly_rule(&db, venue.id, 2, 100.0, 0.0).await?;

        // Bypass set_pricing_rule to prove the index enforces the invariant
        let duplicate = pricing_rule::ActiveModel {
            venue_id: Set(venue.id),
            day_of_week: Set(2),
            pricing_model: Set("daily".to_string()),
            base_price_cents: Set(1),
            minimum_spend_cents: Set(0),
            min_hours: Set(0),
            ..Default::default()
        };
        assert!(duplicate.insert(&db).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_pricing_rule_by_weekday() -> Result<()> {
        let db = setup_test_db().await?;
        let venue = create_test_venue(&db, "varanda").await?;
        create_hourly_rule(&db, venue.id, 5, 500.0, 2000.0).await?;

        // 2025-03-14 is a Friday, 2025-03-15 a Saturday
        let friday = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let saturday = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        assert!(resolve_pricing_rule(&db, venue.id, friday).await?.is_some());
        assert!(resolve_pricing_rule(&db, venue.id, saturday).await?.is_none());
        Ok(())
    }
}
