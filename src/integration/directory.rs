//! User and group lookups against the platform's provisioning API.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use urlencoding::encode as urlencode;

use crate::error::IntegrationError;

#[derive(Debug, Clone, Serialize)]
pub struct UserRef {
    pub uid: String,
    pub display_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupRef {
    pub id: String,
    pub display_name: String,
}

/// A structured profile field, e.g. the "manager" property.
#[derive(Debug, Clone)]
pub struct ProfileProperty {
    pub name: String,
    pub value: String,
}

#[async_trait]
pub trait Directory: Send + Sync {
    async fn lookup(&self, uid: &str) -> Result<Option<UserRef>, IntegrationError>;
    async fn lookup_by_email(&self, email: &str) -> Result<Vec<UserRef>, IntegrationError>;
    async fn search_display_name(&self, name: &str) -> Result<Vec<UserRef>, IntegrationError>;
    async fn list_users(&self) -> Result<Vec<UserRef>, IntegrationError>;
    async fn list_groups(&self) -> Result<Vec<GroupRef>, IntegrationError>;
    async fn group_members(&self, gid: &str) -> Result<Vec<UserRef>, IntegrationError>;
    async fn profile_properties(&self, uid: &str) -> Result<Vec<ProfileProperty>, IntegrationError>;
}

pub struct HttpDirectory {
    http: reqwest::Client,
    base_url: String,
    service_user: String,
    service_password: String,
}

impl HttpDirectory {
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

    async fn ocs_get(&self, path: &str) -> Result<Value, IntegrationError> {
        let url = format!("{}/ocs/v2.php/cloud{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.service_user, Some(&self.service_password))
            .header("OCS-APIRequest", "true")
            .header("Accept", "application/json")
            .query(&[("format", "json")])
            .send()
            .await?;
        let status = response.status().as_u16();
        debug!(%url, status, "directory OCS GET");
        if status >= 400 {
            return Err(IntegrationError::status(url, status));
        }
        let json: Value = response.json().await?;
        Ok(json)
    }

    /// `/users/details?search=` payloads come back as either a uid-keyed
    /// object or a plain array depending on the platform version.
    async fn user_details(&self, search: &str) -> Result<Vec<UserRef>, IntegrationError> {
        let json = self
            .ocs_get(&format!("/users/details?search={}", urlencode(search)))
            .await?;
        let users = &json["ocs"]["data"]["users"];
        let mut out = Vec::new();
        match users {
            Value::Object(map) => {
                for (uid, detail) in map {
                    out.push(user_from_detail(uid, detail));
                }
            }
            Value::Array(items) => {
                for detail in items {
                    let uid = str_field(detail, "id");
                    if !uid.is_empty() {
                        out.push(user_from_detail(&uid, detail));
                    }
                }
            }
            _ => return Err(IntegrationError::Malformed("users/details".into())),
        }
        Ok(out)
    }
}

#[async_trait]
impl Directory for HttpDirectory {
    async fn lookup(&self, uid: &str) -> Result<Option<UserRef>, IntegrationError> {
        match self.ocs_get(&format!("/users/{}", urlencode(uid))).await {
            Ok(json) => {
                let detail = &json["ocs"]["data"];
                let found = str_field(detail, "id");
                if found.is_empty() {
                    return Ok(None);
                }
                Ok(Some(user_from_detail(&found, detail)))
            }
            Err(IntegrationError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn lookup_by_email(&self, email: &str) -> Result<Vec<UserRef>, IntegrationError> {
        let candidates = self.user_details(email).await?;
        Ok(candidates
            .into_iter()
            .filter(|u| u.email.eq_ignore_ascii_case(email))
            .collect())
    }

    async fn search_display_name(&self, name: &str) -> Result<Vec<UserRef>, IntegrationError> {
        self.user_details(name).await
    }

    async fn list_users(&self) -> Result<Vec<UserRef>, IntegrationError> {
        self.user_details("").await
    }

    async fn list_groups(&self) -> Result<Vec<GroupRef>, IntegrationError> {
        let json = self.ocs_get("/groups").await?;
        let groups = &json["ocs"]["data"]["groups"];
        let Value::Array(items) = groups else {
            return Err(IntegrationError::Malformed("groups".into()));
        };
        Ok(items
            .iter()
            .filter_map(|g| g.as_str())
            .map(|id| GroupRef {
                id: id.to_string(),
                display_name: id.to_string(),
            })
            .collect())
    }

    async fn group_members(&self, gid: &str) -> Result<Vec<UserRef>, IntegrationError> {
        let json = match self.ocs_get(&format!("/groups/{}", urlencode(gid))).await {
            Ok(json) => json,
            Err(IntegrationError::Status { status: 404, .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let users = &json["ocs"]["data"]["users"];
        let Value::Array(items) = users else {
            return Err(IntegrationError::Malformed("group members".into()));
        };
        Ok(items
            .iter()
            .filter_map(|u| u.as_str())
            .map(|uid| UserRef {
                uid: uid.to_string(),
                display_name: uid.to_string(),
                email: String::new(),
            })
            .collect())
    }

    async fn profile_properties(&self, uid: &str) -> Result<Vec<ProfileProperty>, IntegrationError> {
        let json = self.ocs_get(&format!("/users/{}", urlencode(uid))).await?;
        let detail = &json["ocs"]["data"];
        let Value::Object(map) = detail else {
            return Err(IntegrationError::Malformed("user detail".into()));
        };
        Ok(map
            .iter()
            .filter_map(|(name, value)| {
                value.as_str().map(|v| ProfileProperty {
                    name: name.clone(),
                    value: v.to_string(),
                })
            })
            .collect())
    }
}

fn user_from_detail(uid: &str, detail: &Value) -> UserRef {
    let display_name = {
        let d = str_field(detail, "displayname");
        if d.is_empty() { uid.to_string() } else { d }
    };
    UserRef {
        uid: uid.to_string(),
        display_name,
        email: str_field(detail, "email"),
    }
}

fn str_field(v: &Value, key: &str) -> String {
    v.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}
