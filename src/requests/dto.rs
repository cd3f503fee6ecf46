use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{LeaveRequest, TimeChangeKind, TimeChangeRequest};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeChangeForm {
    #[serde(rename = "type")]
    pub kind: TimeChangeKind,
    pub date: String,
    #[serde(with = "time::serde::rfc3339")]
    pub original_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub requested_time: OffsetDateTime,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveForm {
    pub start_date: String,
    pub end_date: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveForm {
    pub request_id: Uuid,
    pub approved: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedResponse {
    pub success: bool,
    pub request_id: Uuid,
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

/// Role-scoped pending view consumed by the requests panel.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequestsResponse {
    pub time_requests: Vec<TimeChangeRequest>,
    pub leave_requests: Vec<LeaveRequest>,
}
