use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::engine::error::EngineError;
use crate::model::staff::Staff;
use crate::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct CreateStaff {
    #[schema(example = "EMP-001")]
    pub staff_id: String,
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = "Engineering", nullable = true)]
    pub department: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct SetActive {
    pub is_active: bool,
}

/// Register a staff member
#[utoipa::path(
    post,
    path = "/api/v1/orgs/{tenant_id}/staff",
    params(("tenant_id", Path, description = "Organization id")),
    request_body = CreateStaff,
    responses(
        (status = 200, description = "Staff created", body = Staff),
        (status = 500, description = "Internal server error")
    ),
    tag = "Staff"
)]
pub async fn create_staff(
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<CreateStaff>,
) -> actix_web::Result<impl Responder, EngineError> {
    let tenant_id = path.into_inner();
    let payload = payload.into_inner();
    let staff = state
        .staff
        .create(Staff {
            id: 0,
            tenant_id,
            staff_id: payload.staff_id,
            name: payload.name,
            department: payload.department,
            is_active: true,
        })
        .await?;
    Ok(HttpResponse::Ok().json(staff))
}

/// List staff for an organization
#[utoipa::path(
    get,
    path = "/api/v1/orgs/{tenant_id}/staff",
    params(("tenant_id", Path, description = "Organization id")),
    responses(
        (status = 200, description = "Staff list", body = [Staff]),
        (status = 500, description = "Internal server error")
    ),
    tag = "Staff"
)]
pub async fn list_staff(
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder, EngineError> {
    let staff = state.staff.list(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(staff))
}

/// Get one staff member
#[utoipa::path(
    get,
    path = "/api/v1/orgs/{tenant_id}/staff/{staff_id}",
    params(
        ("tenant_id", Path, description = "Organization id"),
        ("staff_id", Path, description = "Tenant-scoped staff id")
    ),
    responses(
        (status = 200, description = "Staff member", body = Staff),
        (status = 404, description = "Staff not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Staff"
)]
pub async fn get_staff(
    state: web::Data<AppState>,
    path: web::Path<(u64, String)>,
) -> actix_web::Result<impl Responder, EngineError> {
    let (tenant_id, staff_id) = path.into_inner();
    let staff = state
        .staff
        .resolve(tenant_id, &staff_id)
        .await?
        .ok_or(EngineError::StaffNotFound)?;
    Ok(HttpResponse::Ok().json(staff))
}

/// Activate or deactivate a staff member
#[utoipa::path(
    put,
    path = "/api/v1/orgs/{tenant_id}/staff/{staff_id}/active",
    params(
        ("tenant_id", Path, description = "Organization id"),
        ("staff_id", Path, description = "Tenant-scoped staff id")
    ),
    request_body = SetActive,
    responses(
        (status = 200, description = "Updated"),
        (status = 404, description = "Staff not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Staff"
)]
pub async fn set_active(
    state: web::Data<AppState>,
    path: web::Path<(u64, String)>,
    payload: web::Json<SetActive>,
) -> actix_web::Result<impl Responder, EngineError> {
    let (tenant_id, staff_id) = path.into_inner();
    state
        .staff
        .set_active(tenant_id, &staff_id, payload.is_active)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Staff updated"
    })))
}
