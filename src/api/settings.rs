//! Admin settings endpoints: which group administers leaves, whether chat
//! notifications are enabled and which room receives the broadcast.

use actix_web::error::ErrorInternalServerError;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::integration::Integrations;
use crate::settings::{SettingsStore, TALK_CHANNEL_KEY};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupUpdate {
    #[schema(example = "hr")]
    pub group_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct TalkToggle {
    pub enabled: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct ChannelUpdate {
    /// Empty token disables the broadcast.
    #[serde(default)]
    pub token: String,
}

#[derive(Deserialize)]
pub struct MembersQuery {
    #[serde(rename = "groupId")]
    pub group_id: Option<String>,
}

fn internal<E: std::fmt::Display>(context: &str) -> impl Fn(E) -> actix_web::Error + '_ {
    move |e| {
        tracing::error!(error = %e, context, "settings endpoint failed");
        ErrorInternalServerError("Internal Server Error")
    }
}

/// Swagger doc for get_admin_group endpoint
#[utoipa::path(
    get,
    path = "/api/admin/settings/group",
    responses(
        (status = 200, body = Object, example = json!({"groupId": "admin"})),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn get_admin_group(
    auth: AuthUser,
    settings: web::Data<SettingsStore>,
) -> actix_web::Result<impl Responder> {
    let group = super::ensure_app_admin(&auth, &settings).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "groupId": group })))
}

/// Swagger doc for set_admin_group endpoint
#[utoipa::path(
    post,
    path = "/api/admin/settings/group",
    request_body(content = GroupUpdate, content_type = "application/json"),
    responses(
        (status = 200, body = Object, example = json!({"saved": true, "groupId": "hr"})),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn set_admin_group(
    auth: AuthUser,
    settings: web::Data<SettingsStore>,
    payload: web::Json<GroupUpdate>,
) -> actix_web::Result<impl Responder> {
    super::ensure_app_admin(&auth, &settings).await?;
    let group_id = payload.into_inner().group_id;
    settings
        .set_admin_group(&group_id)
        .await
        .map_err(internal("set admin group"))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "saved": true, "groupId": group_id })))
}

/// Swagger doc for list_groups endpoint
#[utoipa::path(
    get,
    path = "/api/admin/settings/groups",
    responses(
        (status = 200, body = Object,
         example = json!({"groups": [{"id": "admin", "displayName": "admin"}]})),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn list_groups(
    auth: AuthUser,
    settings: web::Data<SettingsStore>,
    integrations: web::Data<Integrations>,
) -> actix_web::Result<impl Responder> {
    super::ensure_app_admin(&auth, &settings).await?;
    let groups = integrations
        .directory
        .list_groups()
        .await
        .map_err(internal("list groups"))?;
    let groups: Vec<_> = groups
        .into_iter()
        .map(|g| serde_json::json!({ "id": g.id, "displayName": g.display_name }))
        .collect();
    Ok(HttpResponse::Ok().json(serde_json::json!({ "groups": groups })))
}

/// Swagger doc for group_members endpoint
#[utoipa::path(
    get,
    path = "/api/admin/settings/group/members",
    params(("groupId" = Option<String>, Query, description = "Defaults to the configured admin group")),
    responses(
        (status = 200, body = Object,
         example = json!({"groupId": "admin", "members": [{"uid": "bob", "displayName": "Bob"}]})),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn group_members(
    auth: AuthUser,
    settings: web::Data<SettingsStore>,
    integrations: web::Data<Integrations>,
    query: web::Query<MembersQuery>,
) -> actix_web::Result<impl Responder> {
    let admin_group = super::ensure_app_admin(&auth, &settings).await?;
    let group_id = query
        .into_inner()
        .group_id
        .filter(|g| !g.is_empty())
        .unwrap_or(admin_group);
    let members = integrations
        .directory
        .group_members(&group_id)
        .await
        .map_err(internal("group members"))?;
    let members: Vec<_> = members
        .into_iter()
        .map(|m| serde_json::json!({ "uid": m.uid, "displayName": m.display_name }))
        .collect();
    Ok(HttpResponse::Ok().json(serde_json::json!({ "groupId": group_id, "members": members })))
}

/// Swagger doc for get_talk_enabled endpoint
#[utoipa::path(
    get,
    path = "/api/admin/settings/talk",
    responses(
        (status = 200, body = Object, example = json!({"enabled": false})),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn get_talk_enabled(
    auth: AuthUser,
    settings: web::Data<SettingsStore>,
) -> actix_web::Result<impl Responder> {
    super::ensure_app_admin(&auth, &settings).await?;
    let enabled = settings
        .talk_enabled()
        .await
        .map_err(internal("read talk flag"))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "enabled": enabled })))
}

/// Swagger doc for set_talk_enabled endpoint
#[utoipa::path(
    post,
    path = "/api/admin/settings/talk",
    request_body(content = TalkToggle, content_type = "application/json"),
    responses(
        (status = 200, body = Object, example = json!({"enabled": true})),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn set_talk_enabled(
    auth: AuthUser,
    settings: web::Data<SettingsStore>,
    payload: web::Json<TalkToggle>,
) -> actix_web::Result<impl Responder> {
    super::ensure_app_admin(&auth, &settings).await?;
    let enabled = payload.into_inner().enabled;
    settings
        .set_talk_enabled(enabled)
        .await
        .map_err(internal("set talk flag"))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "enabled": enabled })))
}

/// Swagger doc for list_channels endpoint
#[utoipa::path(
    get,
    path = "/api/admin/settings/talk/channels",
    responses(
        (status = 200, description = "Joinable non-direct conversations", body = Object,
         example = json!({"channels": [{"token": "abc123", "name": "RH"}]})),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn list_channels(
    auth: AuthUser,
    settings: web::Data<SettingsStore>,
    integrations: web::Data<Integrations>,
) -> actix_web::Result<impl Responder> {
    super::ensure_app_admin(&auth, &settings).await?;
    let channels = integrations
        .chat
        .list_channels()
        .await
        .map_err(internal("list channels"))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "channels": channels })))
}

/// Swagger doc for get_channel endpoint
#[utoipa::path(
    get,
    path = "/api/admin/settings/talk/channel",
    responses(
        (status = 200, body = Object, example = json!({"token": ""})),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn get_channel(
    auth: AuthUser,
    settings: web::Data<SettingsStore>,
) -> actix_web::Result<impl Responder> {
    super::ensure_app_admin(&auth, &settings).await?;
    let token = settings
        .talk_channel_token()
        .await
        .map_err(internal("read channel token"))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "token": token })))
}

/// Swagger doc for set_channel endpoint
#[utoipa::path(
    post,
    path = "/api/admin/settings/talk/channel",
    request_body(content = ChannelUpdate, content_type = "application/json"),
    responses(
        (status = 200, body = Object, example = json!({"token": "abc123"})),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn set_channel(
    auth: AuthUser,
    settings: web::Data<SettingsStore>,
    payload: web::Json<ChannelUpdate>,
) -> actix_web::Result<impl Responder> {
    super::ensure_app_admin(&auth, &settings).await?;
    let token = payload.into_inner().token;
    settings
        .set_app_value(TALK_CHANNEL_KEY, &token)
        .await
        .map_err(internal("set channel token"))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "token": token })))
}
