//! App-level and per-user configuration scalars: the admin group, the chat
//! notification flag, the broadcast channel, feed tokens and the per-user
//! manager fallback.

use sqlx::SqlitePool;

/// Members of this platform group are always treated as admins, on top of
/// the configurable group below.
pub const SUPER_ADMIN_GROUP: &str = "admin";

pub const ADMIN_GROUP_KEY: &str = "admin_group";
pub const TALK_ENABLED_KEY: &str = "talk_enabled";
pub const TALK_CHANNEL_KEY: &str = "talk_channel_token";
pub const ICS_TOKEN_KEY: &str = "ics_token";
pub const MANAGER_KEY: &str = "manager";

const DEFAULT_ADMIN_GROUP: &str = "admin";

#[derive(Clone)]
pub struct SettingsStore {
    pool: SqlitePool,
}

impl SettingsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn app_value(&self, key: &str, default: &str) -> sqlx::Result<String> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM app_settings WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.unwrap_or_else(|| default.to_string()))
    }

    pub async fn set_app_value(&self, key: &str, value: &str) -> sqlx::Result<()> {
        sqlx::query("INSERT OR REPLACE INTO app_settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn user_value(&self, uid: &str, key: &str, default: &str) -> sqlx::Result<String> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM user_settings WHERE uid = ? AND key = ?")
                .bind(uid)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.unwrap_or_else(|| default.to_string()))
    }

    pub async fn set_user_value(&self, uid: &str, key: &str, value: &str) -> sqlx::Result<()> {
        sqlx::query("INSERT OR REPLACE INTO user_settings (uid, key, value) VALUES (?, ?, ?)")
            .bind(uid)
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn admin_group(&self) -> sqlx::Result<String> {
        self.app_value(ADMIN_GROUP_KEY, DEFAULT_ADMIN_GROUP).await
    }

    pub async fn set_admin_group(&self, group_id: &str) -> sqlx::Result<()> {
        self.set_app_value(ADMIN_GROUP_KEY, group_id).await
    }

    pub async fn talk_enabled(&self) -> sqlx::Result<bool> {
        Ok(self.app_value(TALK_ENABLED_KEY, "0").await? == "1")
    }

    pub async fn set_talk_enabled(&self, enabled: bool) -> sqlx::Result<()> {
        self.set_app_value(TALK_ENABLED_KEY, if enabled { "1" } else { "0" })
            .await
    }

    pub async fn talk_channel_token(&self) -> sqlx::Result<String> {
        self.app_value(TALK_CHANNEL_KEY, "").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_pool;

    #[actix_web::test]
    async fn app_values_default_and_overwrite() {
        let settings = SettingsStore::new(test_pool().await);
        assert_eq!(settings.admin_group().await.unwrap(), "admin");
        settings.set_app_value(ADMIN_GROUP_KEY, "rh").await.unwrap();
        assert_eq!(settings.admin_group().await.unwrap(), "rh");

        assert!(!settings.talk_enabled().await.unwrap());
        settings.set_talk_enabled(true).await.unwrap();
        assert!(settings.talk_enabled().await.unwrap());
    }

    #[actix_web::test]
    async fn user_values_are_scoped_per_user() {
        let settings = SettingsStore::new(test_pool().await);
        settings.set_user_value("alice", ICS_TOKEN_KEY, "t1").await.unwrap();
        assert_eq!(settings.user_value("alice", ICS_TOKEN_KEY, "").await.unwrap(), "t1");
        assert_eq!(settings.user_value("bob", ICS_TOKEN_KEY, "").await.unwrap(), "");
    }
}
