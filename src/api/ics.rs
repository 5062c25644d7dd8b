//! Calendar-feed endpoints. Authenticated users fetch or rotate their feed
//! token; the feed itself is public and guarded only by that token, compared
//! in constant time.

use actix_web::error::{ErrorForbidden, ErrorInternalServerError};
use actix_web::{HttpResponse, Responder, web};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::config::Config;
use crate::ics;
use crate::settings::{ICS_TOKEN_KEY, SettingsStore};
use crate::store::LeaveStore;
use crate::utils::secure::constant_time_eq;

fn feed_url(config: &Config, uid: &str, token: &str) -> String {
    format!(
        "{}/ics/{}/{}",
        config.public_base_url.trim_end_matches('/'),
        uid,
        token
    )
}

/// Swagger doc for get_feed_token endpoint
#[utoipa::path(
    get,
    path = "/api/ics/token",
    responses(
        (status = 200, description = "Existing token, minted on first call", body = Object,
         example = json!({"uid": "alice", "token": "2f0c…", "url": "https://cloud.example.org/ics/alice/2f0c…"})),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Feed"
)]
pub async fn get_feed_token(
    auth: AuthUser,
    settings: web::Data<SettingsStore>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let mut token = settings
        .user_value(&auth.uid, ICS_TOKEN_KEY, "")
        .await
        .map_err(|e| {
            tracing::error!(error = %e, uid = %auth.uid, "Failed to read feed token");
            ErrorInternalServerError("Internal Server Error")
        })?;
    if token.is_empty() {
        token = Uuid::new_v4().simple().to_string();
        settings
            .set_user_value(&auth.uid, ICS_TOKEN_KEY, &token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, uid = %auth.uid, "Failed to store feed token");
                ErrorInternalServerError("Internal Server Error")
            })?;
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "uid": auth.uid,
        "token": token,
        "url": feed_url(&config, &auth.uid, &token),
    })))
}

/// Swagger doc for rotate_feed_token endpoint
#[utoipa::path(
    post,
    path = "/api/ics/token",
    responses(
        (status = 200, description = "Fresh token; the previous one stops working immediately",
         body = Object,
         example = json!({"uid": "alice", "token": "9b1d…", "url": "https://cloud.example.org/ics/alice/9b1d…"})),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Feed"
)]
pub async fn rotate_feed_token(
    auth: AuthUser,
    settings: web::Data<SettingsStore>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let token = Uuid::new_v4().simple().to_string();
    settings
        .set_user_value(&auth.uid, ICS_TOKEN_KEY, &token)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, uid = %auth.uid, "Failed to rotate feed token");
            ErrorInternalServerError("Internal Server Error")
        })?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "uid": auth.uid,
        "token": token,
        "url": feed_url(&config, &auth.uid, &token),
    })))
}

/// Swagger doc for serve_feed endpoint
#[utoipa::path(
    get,
    path = "/ics/{uid}/{token}",
    params(
        ("uid" = String, Path, description = "Feed owner"),
        ("token" = String, Path, description = "Feed token")
    ),
    responses(
        (status = 200, description = "Approved leaves as a VCALENDAR",
         content_type = "text/calendar"),
        (status = 403, description = "Invalid token")
    ),
    tag = "Feed"
)]
pub async fn serve_feed(
    path: web::Path<(String, String)>,
    settings: web::Data<SettingsStore>,
    store: web::Data<LeaveStore>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let (uid, token) = path.into_inner();
    let stored = settings
        .user_value(&uid, ICS_TOKEN_KEY, "")
        .await
        .map_err(|e| {
            tracing::error!(error = %e, uid = %uid, "Failed to read feed token");
            ErrorInternalServerError("Internal Server Error")
        })?;
    // A user with no token has no feed; never compare against the empty string.
    if stored.is_empty() || !constant_time_eq(stored.as_bytes(), token.as_bytes()) {
        return Err(ErrorForbidden("Invalid token"));
    }

    let leaves = store.list_approved_for_user(&uid).await.map_err(|e| {
        tracing::error!(error = %e, uid = %uid, "Failed to load approved leaves");
        ErrorInternalServerError("Internal Server Error")
    })?;
    let body = ics::feed(&leaves, &config.host);
    Ok(HttpResponse::Ok()
        .content_type("text/calendar; charset=utf-8")
        .body(body))
}
