//! Package business logic - add-ons, combos and booking-time snapshots.
//!
//! Global packages (no venue) are managed by admins; venue packages by the venue's
//! host or an admin. Packages are soft-deleted through `is_active`. A combo is a
//! package that contains other packages; the "contains" graph is kept acyclic at
//! write time.

use crate::{
    auth::AuthUser,
    core::{
        money::parse_amount_to_minor,
        pricing::{PackageCategory, PackageSnapshot, PriceType},
        venue::ensure_can_manage,
    },
    entities::{Package, PackageItem, Venue, package, package_item},
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Fields required to create a package.
#[derive(Debug, Clone)]
pub struct NewPackage {
    /// Owning venue, None for a global package
    pub venue_id: Option<i64>,
    /// Display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Price in currency units
    pub price: f64,
    /// How the price scales
    pub price_type: PriceType,
    /// Display category
    pub category: PackageCategory,
}

/// Editable package fields; the scope of a package never changes.
#[derive(Debug, Clone)]
pub struct PackageUpdate {
    /// Display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Price in currency units
    pub price: f64,
    /// How the price scales
    pub price_type: PriceType,
    /// Display category
    pub category: PackageCategory,
}

async fn ensure_can_manage_scope<C>(db: &C, actor: &AuthUser, venue_id: Option<i64>) -> Result<()>
where
    C: ConnectionTrait,
{
    match venue_id {
        None if actor.is_admin() => Ok(()),
        None => Err(Error::forbidden("only admins manage global packages")),
        Some(id) => {
            let venue = Venue::find_by_id(id)
                .one(db)
                .await?
                .ok_or_else(|| Error::not_found("Venue", id))?;
            ensure_can_manage(actor, &venue)
        }
    }
}

fn validate_fields(name: &str, price: f64) -> Result<i64> {
    if name.trim().is_empty() {
        return Err(Error::validation("package name cannot be empty"));
    }
    parse_amount_to_minor(price)
}

/// Creates a package after checking the actor may manage its scope.
pub async fn create_package<C>(
    db: &C,
    actor: &AuthUser,
    new_package: NewPackage,
) -> Result<package::Model>
where
    C: ConnectionTrait,
{
    let price_cents = validate_fields(&new_package.name, new_package.price)?;
    ensure_can_manage_scope(db, actor, new_package.venue_id).await?;

    let now = chrono::Utc::now();
    let package = package::ActiveModel {
        venue_id: Set(new_package.venue_id),
        name: Set(new_package.name.trim().to_string()),
        description: Set(new_package.description),
        price_cents: Set(price_cents),
        price_type: Set(new_package.price_type.as_str().to_string()),
        category: Set(new_package.category.as_str().to_string()),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let package = package.insert(db).await?;
    info!(package_id = package.id, venue_id = ?package.venue_id, "Package created");
    Ok(package)
}

async fn find_active_package<C>(db: &C, package_id: i64) -> Result<package::Model>
where
    C: ConnectionTrait,
{
    let package = Package::find_by_id(package_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Package", package_id))?;
    if package.is_active {
        Ok(package)
    } else {
        Err(Error::not_found("Package", package_id))
    }
}

/// Updates a package's name, price and type.
///
/// Bookings already made keep their snapshot; only future quotes see the change.
pub async fn update_package(
    db: &DatabaseConnection,
    actor: &AuthUser,
    package_id: i64,
    update: PackageUpdate,
) -> Result<package::Model> {
    let price_cents = validate_fields(&update.name, update.price)?;
    let package = find_active_package(db, package_id).await?;
    ensure_can_manage_scope(db, actor, package.venue_id).await?;

    let mut active: package::ActiveModel = package.into();
    active.name = Set(update.name.trim().to_string());
    active.description = Set(update.description);
    active.price_cents = Set(price_cents);
    active.price_type = Set(update.price_type.as_str().to_string());
    active.category = Set(update.category.as_str().to_string());
    active.updated_at = Set(chrono::Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Soft deletes a package so it can no longer be selected.
pub async fn deactivate_package(
    db: &DatabaseConnection,
    actor: &AuthUser,
    package_id: i64,
) -> Result<package::Model> {
    let package = find_active_package(db, package_id).await?;
    ensure_can_manage_scope(db, actor, package.venue_id).await?;

    let mut active: package::ActiveModel = package.into();
    active.is_active = Set(false);
    active.updated_at = Set(chrono::Utc::now());
    let package = active.update(db).await?;
    info!(package_id, "Package deactivated");
    Ok(package)
}

/// Lists the active packages offered on a venue: its own plus every global package.
pub async fn list_packages_for_venue(
    db: &DatabaseConnection,
    venue_id: i64,
) -> Result<Vec<package::Model>> {
    Package::find()
        .filter(package::Column::IsActive.eq(true))
        .filter(
            Condition::any()
                .add(package::Column::VenueId.eq(venue_id))
                .add(package::Column::VenueId.is_null()),
        )
        .order_by_asc(package::Column::Category)
        .order_by_asc(package::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists the packages directly contained in a combo.
pub async fn get_package_children(
    db: &DatabaseConnection,
    parent_id: i64,
) -> Result<Vec<package::Model>> {
    let child_ids: Vec<i64> = PackageItem::find()
        .filter(package_item::Column::ParentPackageId.eq(parent_id))
        .all(db)
        .await?
        .into_iter()
        .map(|item| item.child_package_id)
        .collect();

    Package::find()
        .filter(package::Column::Id.is_in(child_ids))
        .order_by_asc(package::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Replaces the children of a combo package.
///
/// Rejects self-containment, transitive cycles, and children outside the parent's
/// scope: a global combo may only contain global packages, a venue combo may contain
/// its own venue's packages and global ones.
pub async fn set_package_children(
    db: &DatabaseConnection,
    actor: &AuthUser,
    parent_id: i64,
    child_ids: &[i64],
) -> Result<Vec<package_item::Model>> {
    let txn = db.begin().await?;

    let parent = find_active_package(&txn, parent_id).await?;
    ensure_can_manage_scope(&txn, actor, parent.venue_id).await?;

    let unique_children: Vec<i64> = {
        let mut seen = HashSet::new();
        child_ids.iter().copied().filter(|id| seen.insert(*id)).collect()
    };

    for &child_id in &unique_children {
        if child_id == parent_id {
            return Err(Error::validation(format!(
                "package {parent_id} cannot contain itself"
            )));
        }
        let child = find_active_package(&txn, child_id).await?;
        let in_scope = match (parent.venue_id, child.venue_id) {
            (_, None) => true,
            (Some(parent_venue), Some(child_venue)) => parent_venue == child_venue,
            (None, Some(_)) => false,
        };
        if !in_scope {
            return Err(Error::validation(format!(
                "package {child_id} is not available to combo {parent_id}"
            )));
        }
    }

    // Graph without the parent's current edges, which are being replaced
    let mut graph: HashMap<i64, Vec<i64>> = HashMap::new();
    for edge in PackageItem::find().all(&txn).await? {
        if edge.parent_package_id != parent_id {
            graph
                .entry(edge.parent_package_id)
                .or_default()
                .push(edge.child_package_id);
        }
    }
    for &child_id in &unique_children {
        if reaches(&graph, child_id, parent_id) {
            return Err(Error::validation(format!(
                "adding package {child_id} to {parent_id} would create a cycle"
            )));
        }
    }

    PackageItem::delete_many()
        .filter(package_item::Column::ParentPackageId.eq(parent_id))
        .exec(&txn)
        .await?;

    let mut items = Vec::with_capacity(unique_children.len());
    for child_id in unique_children {
        let item = package_item::ActiveModel {
            parent_package_id: Set(parent_id),
            child_package_id: Set(child_id),
            ..Default::default()
        };
        items.push(item.insert(&txn).await?);
    }

    txn.commit().await?;
    info!(parent_id, children = items.len(), "Combo contents replaced");
    Ok(items)
}

/// Depth-first search: can `target` be reached from `from`?
fn reaches(graph: &HashMap<i64, Vec<i64>>, from: i64, target: i64) -> bool {
    let mut stack = vec![from];
    let mut visited = HashSet::new();
    while let Some(node) = stack.pop() {
        if node == target {
            return true;
        }
        if visited.insert(node) {
            if let Some(children) = graph.get(&node) {
                stack.extend(children.iter().copied());
            }
        }
    }
    false
}

/// Resolves selected package IDs into snapshots for a booking at `venue_id`.
///
/// Every ID must name an active package that is either global or owned by this
/// venue. Duplicate IDs are collapsed.
pub async fn snapshot_packages_for_venue<C>(
    db: &C,
    venue_id: i64,
    package_ids: &[i64],
) -> Result<Vec<PackageSnapshot>>
where
    C: ConnectionTrait,
{
    let mut seen = HashSet::new();
    let ids: Vec<i64> = package_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let found: HashMap<i64, package::Model> = Package::find()
        .filter(package::Column::Id.is_in(ids.clone()))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    ids.iter()
        .map(|id| {
            let package = found
                .get(id)
                .filter(|p| p.is_active)
                .ok_or_else(|| Error::validation(format!("package {id} is not available")))?;
            if package.venue_id.is_some_and(|owner| owner != venue_id) {
                return Err(Error::validation(format!(
                    "package {id} belongs to another venue"
                )));
            }
            PackageSnapshot::try_from(package)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_global_packages_require_admin() -> Result<()> {
        let db = setup_test_db().await?;
        let new_package = NewPackage {
            venue_id: None,
            name: "DJ".to_string(),
            description: None,
            price: 1200.0,
            price_type: PriceType::Fixed,
            category: PackageCategory::Dj,
        };

        let result = create_package(&db, &host_user(), new_package.clone()).await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));

        let created = create_package(&db, &admin_user(), new_package).await?;
        assert_eq!(created.venue_id, None);
        assert_eq!(created.price_cents, 120_000);
        assert_eq!(created.category, "dj");
        Ok(())
    }

    #[tokio::test]
    async fn test_create_package_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let venue = create_test_venue(&db, "pkg-validation").await?;

        let result = create_test_package(&db, Some(venue.id), " ", 10.0, PriceType::Fixed).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_test_package(&db, Some(venue.id), "Cake", -5.0, PriceType::Fixed).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_packages_for_venue_includes_global() -> Result<()> {
        let db = setup_test_db().await?;
        let venue = create_test_venue(&db, "list-a").await?;
        let other = create_test_venue(&db, "list-b").await?;

        create_test_package(&db, Some(venue.id), "Buffet", 80.0, PriceType::PerPerson).await?;
        create_test_package(&db, Some(other.id), "Other buffet", 70.0, PriceType::PerPerson).await?;
        let global = create_test_package(&db, None, "Photographer", 900.0, PriceType::Fixed).await?;
        deactivate_package(&db, &admin_user(), global.id).await?;
        create_test_package(&db, None, "Security", 300.0, PriceType::Fixed).await?;

        let names: Vec<String> = list_packages_for_venue(&db, venue.id)
            .await?
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Buffet".to_string(), "Security".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_package_does_not_touch_snapshots() -> Result<()> {
        let db = setup_test_db().await?;
        let venue = create_test_venue(&db, "snap").await?;
        let pkg = create_test_package(&db, Some(venue.id), "Buffet", 80.0, PriceType::PerPerson).await?;

        let before = snapshot_packages_for_venue(&db, venue.id, &[pkg.id]).await?;
        update_package(
            &db,
            &host_user(),
            pkg.id,
            PackageUpdate {
                name: "Buffet".to_string(),
                description: None,
                price: 95.0,
                price_type: PriceType::PerPerson,
                category: PackageCategory::Food,
            },
        )
        .await?;
        let after = snapshot_packages_for_venue(&db, venue.id, &[pkg.id]).await?;

        assert_eq!(before[0].price, dec!(80));
        assert_eq!(after[0].price, dec!(95));
        Ok(())
    }

    #[tokio::test]
    async fn test_snapshots_reject_foreign_and_inactive_packages() -> Result<()> {
        let db = setup_test_db().await?;
        let venue = create_test_venue(&db, "snap-a").await?;
        let other = create_test_venue(&db, "snap-b").await?;
        let foreign = create_test_package(&db, Some(other.id), "Theirs", 10.0, PriceType::Fixed).await?;
        let retired = create_test_package(&db, None, "Retired", 10.0, PriceType::Fixed).await?;
        deactivate_package(&db, &admin_user(), retired.id).await?;

        let result = snapshot_packages_for_venue(&db, venue.id, &[foreign.id]).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        let result = snapshot_packages_for_venue(&db, venue.id, &[retired.id]).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        let result = snapshot_packages_for_venue(&db, venue.id, &[9999]).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_snapshots_collapse_duplicates() -> Result<()> {
        let db = setup_test_db().await?;
        let venue = create_test_venue(&db, "dupes").await?;
        let pkg = create_test_package(&db, None, "Balloons", 50.0, PriceType::Fixed).await?;

        let snapshots = snapshot_packages_for_venue(&db, venue.id, &[pkg.id, pkg.id]).await?;
        assert_eq!(snapshots.len(), 1);
        assert!(!snapshots[0].is_venue_scoped());
        Ok(())
    }

    #[tokio::test]
    async fn test_combo_children_and_cycles() -> Result<()> {
        let db = setup_test_db().await?;
        let venue = create_test_venue(&db, "combo").await?;
        let a = create_test_package(&db, Some(venue.id), "Party combo", 500.0, PriceType::Fixed).await?;
        let b = create_test_package(&db, Some(venue.id), "Drinks combo", 200.0, PriceType::Fixed).await?;
        let c = create_test_package(&db, None, "Ice", 20.0, PriceType::Fixed).await?;

        set_package_children(&db, &host_user(), a.id, &[b.id, c.id]).await?;
        set_package_children(&db, &host_user(), b.id, &[c.id]).await?;

        let children = get_package_children(&db, a.id).await?;
        assert_eq!(children.len(), 2);

        // b -> a would close the loop a -> b -> a
        let result = set_package_children(&db, &host_user(), b.id, &[a.id]).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = set_package_children(&db, &host_user(), a.id, &[a.id]).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        // The rejected write left b's contents alone
        assert_eq!(get_package_children(&db, b.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_global_combo_cannot_contain_venue_package() -> Result<()> {
        let db = setup_test_db().await?;
        let venue = create_test_venue(&db, "scope").await?;
        let global = create_test_package(&db, None, "Global combo", 100.0, PriceType::Fixed).await?;
        let local = create_test_package(&db, Some(venue.id), "Local", 10.0, PriceType::Fixed).await?;

        let result = set_package_children(&db, &admin_user(), global.id, &[local.id]).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[test]
    fn test_reaches_follows_transitive_edges() {
        let graph = HashMap::from([(1, vec![2]), (2, vec![3]), (3, vec![])]);
        assert!(reaches(&graph, 1, 3));
        assert!(!reaches(&graph, 3, 1));
    }
}
