//! Employee-facing leave endpoints: list own requests, submit a new one
//! (optionally on behalf of a subordinate) and withdraw a pending one.

use actix_web::error::{ErrorForbidden, ErrorInternalServerError};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::model::leave::{LeaveRequest, LeaveType};
use crate::service::LeaveService;
use crate::settings::SettingsStore;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeave {
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: chrono::NaiveDate,
    #[schema(example = "2026-01-09", format = "date", value_type = String)]
    pub end_date: chrono::NaiveDate,
    #[serde(rename = "type", default)]
    #[schema(example = "paid")]
    pub leave_type: Option<LeaveType>,
    #[serde(default)]
    pub reason: Option<String>,
    /// Per-day granularity: an object mapping date to "full"/"am"/"pm", or
    /// an array of `{date, part}` items. Stored verbatim.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub day_parts: Option<Value>,
    /// Create the request for this uid instead of the caller (admins and
    /// the target's managers only).
    #[serde(default)]
    pub target_uid: Option<String>,
}

/// Swagger doc for list_leaves endpoint
#[utoipa::path(
    get,
    path = "/api/leaves",
    responses(
        (status = 200, description = "Caller's leave requests, newest first", body = Object,
         example = json!({"leaves": []})),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leaves"
)]
pub async fn list_leaves(
    auth: AuthUser,
    service: web::Data<LeaveService>,
) -> actix_web::Result<impl Responder> {
    let leaves: Vec<LeaveRequest> =
        service.leaves_for_user(&auth.uid).await.map_err(|e| {
            tracing::error!(error = %e, uid = %auth.uid, "Failed to list leaves");
            ErrorInternalServerError("Internal Server Error")
        })?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "leaves": leaves })))
}

/// Swagger doc for create_leave endpoint
#[utoipa::path(
    post,
    path = "/api/leaves",
    request_body(content = CreateLeave, content_type = "application/json"),
    responses(
        (status = 200, description = "Leave request created", body = Object,
         example = json!({"leave": {"id": 1, "status": "pending"}})),
        (status = 400, description = "start_date cannot be after end_date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not allowed to create for target uid")
    ),
    security(("bearer_auth" = [])),
    tag = "Leaves"
)]
pub async fn create_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    settings: web::Data<SettingsStore>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();

    if payload.start_date > payload.end_date {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "start_date cannot be after end_date"
        })));
    }

    let uid = match payload.target_uid.as_deref().filter(|t| !t.is_empty()) {
        Some(target) if target != auth.uid => {
            let admin_group = settings.admin_group().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to read admin group");
                ErrorInternalServerError("Internal Server Error")
            })?;
            let allowed = auth.is_app_admin(&admin_group)
                || service.is_manager_of(&auth.uid, target).await;
            if !allowed {
                return Err(ErrorForbidden("Not allowed to create for this user"));
            }
            target.to_string()
        }
        _ => auth.uid.clone(),
    };

    let day_parts = payload
        .day_parts
        .map(|v| v.to_string())
        .unwrap_or_default();
    let leave = service
        .create_leave(
            &uid,
            payload.start_date,
            payload.end_date,
            payload.leave_type.unwrap_or(LeaveType::Paid),
            payload.reason.as_deref().unwrap_or(""),
            &day_parts,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, uid = %uid, "Failed to create leave");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "leave": leave })))
}

/// Swagger doc for delete_leave endpoint
#[utoipa::path(
    delete,
    path = "/api/leaves/{id}",
    params(("id" = i64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Deletion outcome", body = Object,
         example = json!({"success": true})),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leaves"
)]
pub async fn delete_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();
    let ok = service.delete_leave(&auth.uid, id).await.map_err(|e| {
        tracing::error!(error = %e, leave = id, "Failed to delete leave");
        ErrorInternalServerError("Internal Server Error")
    })?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": ok })))
}
