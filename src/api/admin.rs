//! Admin endpoints: review every request (or the caller's subordinates'),
//! decide pending requests and run the chat diagnostic.

use actix_web::error::{ErrorForbidden, ErrorInternalServerError};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::integration::Integrations;
use crate::model::leave::LeaveStatus;
use crate::service::LeaveService;
use crate::settings::SettingsStore;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    #[schema(example = "approved")]
    pub status: LeaveStatus,
    #[serde(default)]
    pub admin_comment: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TalkTest {
    #[schema(example = "alice")]
    pub to_uid: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Swagger doc for list_all_leaves endpoint
#[utoipa::path(
    get,
    path = "/api/admin/leaves",
    responses(
        (status = 200, description = "All requests for admins, subordinates' requests for managers",
         body = Object, example = json!({"leaves": []})),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Neither admin nor manager")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_leaves(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    settings: web::Data<SettingsStore>,
) -> actix_web::Result<impl Responder> {
    let admin_group = settings.admin_group().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to read admin group");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let leaves = if auth.is_app_admin(&admin_group) {
        service.all_leaves().await
    } else {
        let subordinates = service.subordinates_of(&auth.uid).await;
        if subordinates.is_empty() {
            return Err(ErrorForbidden("Admin privileges required"));
        }
        service.leaves_for_uids(&subordinates).await
    }
    .map_err(|e| {
        tracing::error!(error = %e, uid = %auth.uid, "Failed to list leaves for review");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "leaves": leaves })))
}

/// Swagger doc for set_leave_status endpoint
#[utoipa::path(
    post,
    path = "/api/admin/leaves/{id}/status",
    params(("id" = i64, Path, description = "Leave request id")),
    request_body(content = StatusUpdate, content_type = "application/json"),
    responses(
        (status = 200, description = "False when the request was already decided", body = Object,
         example = json!({"success": true})),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn set_leave_status(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    settings: web::Data<SettingsStore>,
    path: web::Path<i64>,
    payload: web::Json<StatusUpdate>,
) -> actix_web::Result<impl Responder> {
    super::ensure_app_admin(&auth, &settings).await?;

    let id = path.into_inner();
    let payload = payload.into_inner();
    let ok = service
        .set_status(
            id,
            payload.status,
            payload.admin_comment.as_deref().unwrap_or(""),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, leave = id, "Failed to update leave status");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": ok })))
}

/// Swagger doc for test_talk endpoint
#[utoipa::path(
    post,
    path = "/api/admin/test/talk",
    request_body(content = TalkTest, content_type = "application/json"),
    responses(
        (status = 200, description = "Step-by-step trace of the direct-message attempt",
         body = crate::integration::talk::TalkProbe),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn test_talk(
    auth: AuthUser,
    settings: web::Data<SettingsStore>,
    integrations: web::Data<Integrations>,
    payload: web::Json<TalkTest>,
) -> actix_web::Result<impl Responder> {
    super::ensure_app_admin(&auth, &settings).await?;

    let payload = payload.into_inner();
    let fallback = format!("Message de test envoyé par {}.", auth.display_name);
    let message = payload
        .message
        .as_deref()
        .filter(|m| !m.is_empty())
        .unwrap_or(&fallback);
    let probe = integrations.chat.probe_direct(&payload.to_uid, message).await;
    Ok(HttpResponse::Ok().json(probe))
}
