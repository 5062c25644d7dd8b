//! In-platform notifications. One notification object per recipient; the
//! fan-out treats every send independently.

use async_trait::async_trait;
use tracing::debug;
use urlencoding::encode as urlencode;

use crate::error::IntegrationError;

#[async_trait]
pub trait PlatformNotifier: Send + Sync {
    async fn notify(
        &self,
        to_uid: &str,
        subject: &str,
        message: &str,
        link: &str,
    ) -> Result<(), IntegrationError>;
}

pub struct HttpNotifier {
    http: reqwest::Client,
    base_url: String,
    service_user: String,
    service_password: String,
}

impl HttpNotifier {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        service_user: &str,
        service_password: &str,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_user: service_user.to_string(),
            service_password: service_password.to_string(),
        }
    }
}

#[async_trait]
impl PlatformNotifier for HttpNotifier {
    async fn notify(
        &self,
        to_uid: &str,
        subject: &str,
        message: &str,
        link: &str,
    ) -> Result<(), IntegrationError> {
        let url = format!(
            "{}/ocs/v2.php/apps/admin_notifications/api/v1/notifications/{}",
            self.base_url,
            urlencode(to_uid)
        );
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.service_user, Some(&self.service_password))
            .header("OCS-APIRequest", "true")
            .header("Accept", "application/json")
            .query(&[("format", "json")])
            .form(&[
                ("shortMessage", subject),
                ("longMessage", message),
                ("link", link),
            ])
            .send()
            .await?;
        let status = response.status().as_u16();
        debug!(%url, status, "notification POST");
        if status >= 400 {
            return Err(IntegrationError::status(url, status));
        }
        Ok(())
    }
}
