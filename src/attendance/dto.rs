use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo::{AttendanceRecord, BreakRecord};
use crate::requests::repo::LeaveRequest;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockInRequest {
    pub activity: String,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default, rename = "deviceOS")]
    pub device_os: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockInResponse {
    pub success: bool,
    pub attendance_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBreakRequest {
    pub break_type: String,
    pub activity: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBreakResponse {
    pub success: bool,
    pub break_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndBreakRequest {
    pub break_id: Uuid,
    /// Activity to resume after the break.
    #[serde(default)]
    pub activity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateActivityRequest {
    pub activity: String,
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

#[derive(Debug, Serialize)]
pub struct CurrentAttendanceResponse {
    pub attendance: Option<AttendanceRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentBreakResponse {
    pub active_break: Option<BreakRecord>,
}

/// Month view: month's attendance plus the user's full break history and
/// approved leaves, as the calendar UI consumes them.
#[derive(Debug, Serialize)]
pub struct MonthAttendanceResponse {
    pub attendance: Vec<AttendanceRecord>,
    pub breaks: Vec<BreakRecord>,
    pub leaves: Vec<LeaveRequest>,
}
