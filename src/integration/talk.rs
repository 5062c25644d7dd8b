//! Chat integration (Talk). Room-creation quirks vary across platform
//! versions, so obtaining a one-to-one room is a three-step fallback:
//! create with the primary parameter encoding, retry with the alternate
//! encoding, then list all rooms and match the one-to-one conversation.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use urlencoding::encode as urlencode;
use utoipa::ToSchema;

use crate::error::IntegrationError;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChatChannel {
    pub token: String,
    pub name: String,
}

/// Diagnostic trace returned by the admin test endpoint.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct TalkProbe {
    pub to_uid: String,
    pub token: String,
    pub create_status: Option<u16>,
    pub create_body: Option<String>,
    pub rooms_scanned: Option<usize>,
    pub send_status: Option<u16>,
    pub send_body: Option<String>,
    pub retry_status: Option<u16>,
    pub retry_body: Option<String>,
    pub error: Option<String>,
}

#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send_direct(&self, to_uid: &str, message: &str) -> Result<(), IntegrationError>;
    async fn send_to_room(&self, token: &str, message: &str) -> Result<(), IntegrationError>;
    async fn list_channels(&self) -> Result<Vec<ChatChannel>, IntegrationError>;
    async fn probe_direct(&self, to_uid: &str, message: &str) -> TalkProbe;
}

pub struct TalkClient {
    http: reqwest::Client,
    base_url: String,
    service_user: String,
    service_password: String,
}

/// One-to-one conversations have this room type.
const ROOM_TYPE_DIRECT: i64 = 1;

impl TalkClient {
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

    fn v4(&self, path: &str) -> String {
        format!("{}/ocs/v2.php/apps/spreed/api/v4{path}", self.base_url)
    }

    fn v1(&self, path: &str) -> String {
        format!("{}/ocs/v2.php/apps/spreed/api/v1{path}", self.base_url)
    }

    async fn ocs_get(&self, url: &str) -> Result<(u16, Value), IntegrationError> {
        let response = self
            .http
            .get(url)
            .basic_auth(&self.service_user, Some(&self.service_password))
            .header("OCS-APIRequest", "true")
            .header("Accept", "application/json")
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        debug!(%url, status, "talk OCS GET");
        Ok((status, decode_json(&body)))
    }

    async fn ocs_post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<(u16, Value, String), IntegrationError> {
        let response = self
            .http
            .post(url)
            .basic_auth(&self.service_user, Some(&self.service_password))
            .header("OCS-APIRequest", "true")
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        debug!(%url, status, "talk OCS POST");
        if status >= 400 {
            debug!(body = %preview(&body), "talk OCS POST error body");
        }
        Ok((status, decode_json(&body), body))
    }

    async fn rooms(&self) -> Result<Value, IntegrationError> {
        let (status, json) = self.ocs_get(&format!("{}?format=json", self.v4("/room"))).await?;
        if status >= 400 {
            return Err(IntegrationError::status("talk room list", status));
        }
        Ok(json)
    }

    /// Open or reuse a one-to-one room with the target user.
    async fn direct_room_token(&self, other_uid: &str) -> Result<String, IntegrationError> {
        let primary = [
            ("roomType", "1"),
            ("invite", other_uid),
            ("source", "users"),
        ];
        if let Ok((_, json, _)) = self
            .ocs_post_form(&format!("{}?format=json", self.v4("/room")), &primary)
            .await
        {
            if let Some(token) = extract_token(&json) {
                return Ok(token);
            }
        }
        // Alternate parameter encoding accepted by some versions
        let alternate = [
            ("roomType", "1"),
            ("invite[]", other_uid),
            ("source", "users"),
        ];
        if let Ok((_, json, _)) = self.ocs_post_form(&self.v4("/room"), &alternate).await {
            if let Some(token) = extract_token(&json) {
                return Ok(token);
            }
        }
        // Last resort: scan the room list for an existing one-to-one room
        let rooms = self.rooms().await?;
        match_direct_room(&rooms, other_uid)
            .ok_or_else(|| IntegrationError::Unavailable(format!("direct room with {other_uid}")))
    }

    async fn post_message(&self, token: &str, message: &str) -> Result<(), IntegrationError> {
        let url = format!("{}?format=json", self.v1(&format!("/chat/{}", urlencode(token))));
        let (status, _, _) = self.ocs_post_form(&url, &[("message", message)]).await?;
        if status >= 400 {
            return Err(IntegrationError::status("talk chat post", status));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatGateway for TalkClient {
    async fn send_direct(&self, to_uid: &str, message: &str) -> Result<(), IntegrationError> {
        let token = self.direct_room_token(to_uid).await?;
        self.post_message(&token, message).await
    }

    async fn send_to_room(&self, token: &str, message: &str) -> Result<(), IntegrationError> {
        if token.trim().is_empty() {
            return Ok(());
        }
        self.post_message(token, message).await
    }

    async fn list_channels(&self) -> Result<Vec<ChatChannel>, IntegrationError> {
        let rooms = self.rooms().await?;
        let list = &rooms["ocs"]["data"];
        let mut out = Vec::new();
        if let Value::Array(items) = list {
            for room in items {
                if room.get("type").and_then(Value::as_i64) == Some(ROOM_TYPE_DIRECT) {
                    continue;
                }
                let token = room.get("token").and_then(Value::as_str).unwrap_or_default();
                if token.is_empty() {
                    continue;
                }
                let name = room
                    .get("displayName")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .or_else(|| room.get("name").and_then(Value::as_str))
                    .unwrap_or(token);
                out.push(ChatChannel {
                    token: token.to_string(),
                    name: name.to_string(),
                });
            }
        }
        out.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(out)
    }

    async fn probe_direct(&self, to_uid: &str, message: &str) -> TalkProbe {
        let mut probe = TalkProbe {
            to_uid: to_uid.to_string(),
            ..TalkProbe::default()
        };
        let primary = [("roomType", "1"), ("invite", to_uid), ("source", "users")];
        match self
            .ocs_post_form(&format!("{}?format=json", self.v4("/room")), &primary)
            .await
        {
            Ok((status, json, body)) => {
                probe.create_status = Some(status);
                probe.create_body = Some(preview(&body));
                if let Some(token) = extract_token(&json) {
                    probe.token = token;
                }
            }
            Err(e) => {
                probe.error = Some(e.to_string());
                return probe;
            }
        }
        if probe.token.is_empty() {
            match self.rooms().await {
                Ok(rooms) => {
                    probe.rooms_scanned = rooms["ocs"]["data"].as_array().map(|a| a.len());
                    if let Some(token) = match_direct_room(&rooms, to_uid) {
                        probe.token = token;
                    }
                }
                Err(e) => {
                    probe.error = Some(e.to_string());
                    return probe;
                }
            }
        }
        if probe.token.is_empty() {
            return probe;
        }
        let url = format!(
            "{}?format=json",
            self.v1(&format!("/chat/{}", urlencode(&probe.token)))
        );
        match self
            .ocs_post_form(&url, &[("message", message), ("silent", "0")])
            .await
        {
            Ok((status, _, body)) => {
                probe.send_status = Some(status);
                probe.send_body = Some(preview(&body));
                if status >= 400 {
                    // Retry with the minimal payload
                    match self.ocs_post_form(&url, &[("message", message)]).await {
                        Ok((status, _, body)) => {
                            probe.retry_status = Some(status);
                            probe.retry_body = Some(preview(&body));
                        }
                        Err(e) => probe.error = Some(e.to_string()),
                    }
                }
            }
            Err(e) => probe.error = Some(e.to_string()),
        }
        probe
    }
}

fn decode_json(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or(Value::Null)
}

fn preview(body: &str) -> String {
    body.chars().take(300).collect()
}

/// Pull a room token out of whatever envelope shape the platform returned.
fn extract_token(response: &Value) -> Option<String> {
    let data = response.get("ocs")?.get("data")?;
    if let Some(token) = data.get("token").and_then(Value::as_str) {
        return Some(token.to_string());
    }
    if let Some(token) = data
        .get("conversation")
        .and_then(|c| c.get("token"))
        .and_then(Value::as_str)
    {
        return Some(token.to_string());
    }
    // Depth-first scan for any "token" string
    let mut stack = vec![data];
    while let Some(current) = stack.pop() {
        match current {
            Value::Object(map) => {
                if let Some(token) = map.get("token").and_then(Value::as_str) {
                    return Some(token.to_string());
                }
                stack.extend(map.values());
            }
            Value::Array(items) => stack.extend(items),
            _ => {}
        }
    }
    None
}

/// One-to-one rooms carry the other participant's id as name/display name.
fn match_direct_room(rooms: &Value, other_uid: &str) -> Option<String> {
    let list = rooms.get("ocs")?.get("data")?.as_array()?;
    for room in list {
        if room.get("type").and_then(Value::as_i64) != Some(ROOM_TYPE_DIRECT) {
            continue;
        }
        let name = room.get("name").and_then(Value::as_str).unwrap_or_default();
        let display = room
            .get("displayName")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if name == other_uid || display == other_uid {
            return room
                .get("token")
                .and_then(Value::as_str)
                .map(str::to_string);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn token_is_extracted_from_common_envelopes() {
        let direct = json!({"ocs": {"data": {"token": "abc"}}});
        assert_eq!(extract_token(&direct).as_deref(), Some("abc"));

        let nested = json!({"ocs": {"data": {"conversation": {"token": "def"}}}});
        assert_eq!(extract_token(&nested).as_deref(), Some("def"));

        let buried = json!({"ocs": {"data": {"rooms": [{"meta": 1}, {"token": "ghi"}]}}});
        assert_eq!(extract_token(&buried).as_deref(), Some("ghi"));

        let empty = json!({"ocs": {"data": {}}});
        assert_eq!(extract_token(&empty), None);
    }

    #[test]
    fn direct_room_matching_requires_one_to_one_type() {
        let rooms = json!({"ocs": {"data": [
            {"type": 2, "name": "bob", "token": "group"},
            {"type": 1, "name": "bob", "token": "direct"},
        ]}});
        assert_eq!(match_direct_room(&rooms, "bob").as_deref(), Some("direct"));
        assert_eq!(match_direct_room(&rooms, "carol"), None);
    }
}
