pub mod admin;
pub mod ics;
pub mod leaves;
pub mod settings;

use actix_web::error::{ErrorForbidden, ErrorInternalServerError};

use crate::auth::AuthUser;
use crate::settings::SettingsStore;

/// Resolve the configured admin group and check the caller against it.
pub(crate) async fn ensure_app_admin(
    auth: &AuthUser,
    settings: &SettingsStore,
) -> actix_web::Result<String> {
    let admin_group = settings.admin_group().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to read admin group");
        ErrorInternalServerError("Internal Server Error")
    })?;
    if !auth.is_app_admin(&admin_group) {
        return Err(ErrorForbidden("Admin privileges required"));
    }
    Ok(admin_group)
}
