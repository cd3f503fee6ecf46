use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo::{Category, Schedule};
use crate::auth::dto::PublicUser;

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<PublicUser>,
}

#[derive(Debug, Serialize)]
pub struct TeamsResponse {
    pub teams: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub break_types: Vec<String>,
    pub activities: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBreakTypesRequest {
    pub break_types: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateActivitiesRequest {
    pub activities: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SchedulesResponse {
    pub schedules: Vec<Schedule>,
}

/// Schedule fields as the settings panel submits them.
#[derive(Debug, Deserialize)]
pub struct ScheduleInput {
    pub name: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub break_types: Vec<String>,
    #[serde(default)]
    pub activities: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SaveScheduleRequest {
    pub schedule: ScheduleInput,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub schedule: Schedule,
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub subcategories: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryResponse {
    pub success: bool,
    pub category_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub subcategories: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
