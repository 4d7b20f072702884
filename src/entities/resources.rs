use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "resource_type")]
#[serde(rename_all = "camelCase")]
pub enum ResourceType {
    #[sea_orm(string_value = "workshop")]
    Workshop,
    #[sea_orm(string_value = "cohort")]
    Cohort,
    #[sea_orm(string_value = "section")]
    Section,
    #[sea_orm(string_value = "lesson")]
    Lesson,
    #[sea_orm(string_value = "exercise")]
    Exercise,
    #[sea_orm(string_value = "solution")]
    Solution,
    #[sea_orm(string_value = "videoResource")]
    VideoResource,
    #[sea_orm(string_value = "post")]
    Post,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Workshop => write!(f, "workshop"),
            ResourceType::Cohort => write!(f, "cohort"),
            ResourceType::Section => write!(f, "section"),
            ResourceType::Lesson => write!(f, "lesson"),
            ResourceType::Exercise => write!(f, "exercise"),
            ResourceType::Solution => write!(f, "solution"),
            ResourceType::VideoResource => write!(f, "videoResource"),
            ResourceType::Post => write!(f, "post"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "resource_visibility")]
#[serde(rename_all = "snake_case")]
pub enum ResourceVisibility {
    #[sea_orm(string_value = "public")]
    Public,
    #[sea_orm(string_value = "private")]
    Private,
    #[sea_orm(string_value = "unlisted")]
    Unlisted,
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "resource_state")]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "published")]
    Published,
    #[sea_orm(string_value = "review")]
    Review,
    #[sea_orm(string_value = "archived")]
    Archived,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "resources")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub resource_type: ResourceType,
    pub slug: String,
    pub created_by_id: Option<String>,
    pub visibility: ResourceVisibility,
    pub state: ResourceState,
    /// {"mode": "only_in" | "not_in", "countries": ["US", ...]}
    pub region_restriction: Option<Json>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
