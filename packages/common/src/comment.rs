#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};

/// The two independent discussion threads attached to every project.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum CommentThread {
    /// First supervisor and assigned student.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "supervision"))]
    Supervision,
    /// Marker roster and admins.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "marking"))]
    Marking,
}
