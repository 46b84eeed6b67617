//! Package item entity - "contains" edge between a combo package and a child package.
//!
//! The child keeps its own identity and price; the edge carries no ownership.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Package item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "package_items")]
pub struct Model {
    /// Unique identifier for the edge
    #[sea_orm(primary_key)]
    pub id: i64,
    /// The combo package
    pub parent_package_id: i64,
    /// The package contained in the combo
    pub child_package_id: i64,
}

/// Both ends of the edge reference `packages`
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The containing package
    #[sea_orm(
        belongs_to = "super::package::Entity",
        from = "Column::ParentPackageId",
        to = "super::package::Column::Id"
    )]
    Parent,
    /// The contained package
    #[sea_orm(
        belongs_to = "super::package::Entity",
        from = "Column::ChildPackageId",
        to = "super::package::Column::Id"
    )]
    Child,
}

impl ActiveModelBehavior for ActiveModel {}
