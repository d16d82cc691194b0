use std::sync::Arc;

use actix_web::{HttpResponse, Responder, web};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::engine::error::EngineError;
use crate::engine::flow::FlowRequest;
use crate::engine::gate::{Camera, RequestAssertion, UploadedFrame};
use crate::engine::{AttendanceEvent, CancelToken};
use crate::model::attendance::{AttendanceStatus, CheckInMethod, NextAction};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusQuery {
    #[schema(example = "EMP-001")]
    pub staff_id: String,
}

#[derive(Serialize, ToSchema)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: AttendanceStatus,
    /// What the kiosk should offer next: check_in, check_out or day_closed.
    pub next_action: NextAction,
}

#[derive(Deserialize, ToSchema)]
pub struct CommitRequest {
    #[schema(example = "EMP-001")]
    pub staff_id: String,
    pub method: CheckInMethod,
    /// Base64 camera frame; required when the organization captures photos.
    #[schema(nullable = true)]
    pub photo: Option<String>,
    /// WebAuthn assertion; required when biometric verification is on.
    #[schema(nullable = true)]
    pub biometric_assertion: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CommitResponse {
    #[schema(example = "John Doe")]
    pub staff_name: String,
    pub is_late: Option<bool>,
    pub is_early: Option<bool>,
    pub status: AttendanceStatus,
}

/// Attendance status for a staff member's current day
#[utoipa::path(
    get,
    path = "/api/v1/orgs/{tenant_id}/attendance/status",
    params(
        ("tenant_id", Path, description = "Organization id"),
        ("staff_id", Query, description = "Tenant-scoped staff id")
    ),
    responses(
        (status = 200, description = "Current status (a day with no record is a valid status)", body = StatusResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn status(
    state: web::Data<AppState>,
    path: web::Path<u64>,
    query: web::Query<StatusQuery>,
) -> actix_web::Result<impl Responder, EngineError> {
    let tenant_id = path.into_inner();
    let settings = state.settings.settings(tenant_id).await?;
    let status = state
        .tracker()
        .status(&settings, tenant_id, &query.staff_id, Utc::now())
        .await?;
    let next_action = status.next_action();
    Ok(HttpResponse::Ok().json(StatusResponse {
        status,
        next_action,
    }))
}

/// Check-in
#[utoipa::path(
    post,
    path = "/api/v1/orgs/{tenant_id}/attendance/check-in",
    params(("tenant_id", Path, description = "Organization id")),
    request_body = CommitRequest,
    responses(
        (status = 200, description = "Checked in", body = CommitResponse),
        (status = 402, description = "Feature enabled but not in plan"),
        (status = 403, description = "Staff inactive or biometric credential missing"),
        (status = 404, description = "Staff not found"),
        (status = 409, description = "Already checked in today"),
        (status = 422, description = "Photo or biometric capture failed (retriable)"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<CommitRequest>,
) -> actix_web::Result<impl Responder, EngineError> {
    commit(state, path.into_inner(), payload.into_inner(), AttendanceEvent::CheckIn).await
}

/// Check-out
#[utoipa::path(
    post,
    path = "/api/v1/orgs/{tenant_id}/attendance/check-out",
    params(("tenant_id", Path, description = "Organization id")),
    request_body = CommitRequest,
    responses(
        (status = 200, description = "Checked out", body = CommitResponse),
        (status = 409, description = "No check-in today, or already checked out"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<CommitRequest>,
) -> actix_web::Result<impl Responder, EngineError> {
    commit(state, path.into_inner(), payload.into_inner(), AttendanceEvent::CheckOut).await
}

/// All four methods land here: one gate sequence, one commit path.
async fn commit(
    state: web::Data<AppState>,
    tenant_id: u64,
    payload: CommitRequest,
    event: AttendanceEvent,
) -> Result<HttpResponse, EngineError> {
    let settings = state.settings.settings(tenant_id).await?;

    let frame = payload
        .photo
        .as_deref()
        .map(|p| {
            BASE64
                .decode(strip_data_uri(p))
                .map(UploadedFrame::new)
                .map_err(|e| EngineError::CaptureFailed(format!("undecodable photo: {e}")))
        })
        .transpose()?;

    let biometric = Arc::new(RequestAssertion::new(payload.biometric_assertion.clone()));
    let flow = state.flow(biometric);
    let cancel = CancelToken::new();

    let receipt = flow
        .run(FlowRequest {
            tenant_id,
            staff_id: &payload.staff_id,
            event,
            method: payload.method,
            settings: &settings,
            camera: frame.as_ref().map(|f| f as &dyn Camera),
            cancel: &cancel,
            now: Utc::now(),
        })
        .await?;

    let status = AttendanceStatus::from_record(Some(&receipt.record), receipt.record.date);
    Ok(HttpResponse::Ok().json(CommitResponse {
        staff_name: receipt.staff_name,
        is_late: receipt.is_late,
        is_early: receipt.is_early,
        status,
    }))
}

fn strip_data_uri(payload: &str) -> &str {
    payload
        .rsplit_once("base64,")
        .map(|(_, tail)| tail)
        .unwrap_or(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_prefix_is_stripped() {
        assert_eq!(strip_data_uri("data:image/jpeg;base64,abcd"), "abcd");
        assert_eq!(strip_data_uri("abcd"), "abcd");
    }
}
