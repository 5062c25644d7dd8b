//! Shared helpers for unit and integration tests: an in-memory database,
//! in-memory doubles for the platform integrations and a JWT mint.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use jsonwebtoken::{EncodingKey, Header, encode};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use crate::auth::Claims;
use crate::config::Config;
use crate::error::IntegrationError;
use crate::integration::caldav::{CalendarGateway, CalendarRef};
use crate::integration::directory::{Directory, GroupRef, ProfileProperty, UserRef};
use crate::integration::notify::PlatformNotifier;
use crate::integration::talk::{ChatChannel, ChatGateway, TalkProbe};
use crate::model::leave::LeaveRequest;

/// Fresh in-memory database with migrations applied. A single connection
/// keeps every query on the same in-memory instance.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("migrations");
    pool
}

pub fn test_config() -> Config {
    Config {
        server_addr: "127.0.0.1:0".to_string(),
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test-secret".to_string(),
        public_base_url: "https://cloud.example.org".to_string(),
        platform_base_url: "https://cloud.example.org".to_string(),
        platform_user: "svc".to_string(),
        platform_password: "svc".to_string(),
        rate_feed_per_min: 600,
        host: "cloud.example.org".to_string(),
    }
}

pub fn jwt_for(uid: &str, groups: &[&str], secret: &str) -> String {
    jwt_with_name(uid, "", groups, secret)
}

pub fn jwt_with_name(uid: &str, name: &str, groups: &[&str], secret: &str) -> String {
    let claims = Claims {
        sub: uid.to_string(),
        name: name.to_string(),
        groups: groups.iter().map(|g| g.to_string()).collect(),
        exp: 4_102_444_800, // 2100-01-01
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("token")
}

pub fn sample_leave(id: i64, uid: &str, start: &str, end: &str) -> LeaveRequest {
    LeaveRequest {
        id,
        uid: uid.to_string(),
        start_date: NaiveDate::parse_from_str(start, "%Y-%m-%d").expect("start date"),
        end_date: NaiveDate::parse_from_str(end, "%Y-%m-%d").expect("end date"),
        leave_type: "paid".to_string(),
        status: "pending".to_string(),
        reason: String::new(),
        admin_comment: String::new(),
        day_parts: String::new(),
        created_at: "2025-01-01 00:00:00".to_string(),
        updated_at: "2025-01-01 00:00:00".to_string(),
        calendar_object_uri: String::new(),
        calendar_component_uid: String::new(),
    }
}

/// In-memory directory double built up with the `with_*` methods.
#[derive(Default)]
pub struct MemoryDirectory {
    users: Vec<UserRef>,
    groups: HashMap<String, Vec<String>>,
    properties: HashMap<String, Vec<ProfileProperty>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, uid: &str, display_name: &str, email: &str) -> Self {
        self.users.push(UserRef {
            uid: uid.to_string(),
            display_name: display_name.to_string(),
            email: email.to_string(),
        });
        self
    }

    pub fn with_group(mut self, gid: &str, members: &[&str]) -> Self {
        self.groups.insert(
            gid.to_string(),
            members.iter().map(|m| m.to_string()).collect(),
        );
        self
    }

    pub fn with_property(mut self, uid: &str, name: &str, value: &str) -> Self {
        self.properties
            .entry(uid.to_string())
            .or_default()
            .push(ProfileProperty {
                name: name.to_string(),
                value: value.to_string(),
            });
        self
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn lookup(&self, uid: &str) -> Result<Option<UserRef>, IntegrationError> {
        Ok(self.users.iter().find(|u| u.uid == uid).cloned())
    }

    async fn lookup_by_email(&self, email: &str) -> Result<Vec<UserRef>, IntegrationError> {
        Ok(self
            .users
            .iter()
            .filter(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
            .collect())
    }

    async fn search_display_name(&self, name: &str) -> Result<Vec<UserRef>, IntegrationError> {
        let needle = name.to_lowercase();
        Ok(self
            .users
            .iter()
            .filter(|u| u.display_name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn list_users(&self) -> Result<Vec<UserRef>, IntegrationError> {
        Ok(self.users.clone())
    }

    async fn list_groups(&self) -> Result<Vec<GroupRef>, IntegrationError> {
        Ok(self
            .groups
            .keys()
            .map(|id| GroupRef {
                id: id.clone(),
                display_name: id.clone(),
            })
            .collect())
    }

    async fn group_members(&self, gid: &str) -> Result<Vec<UserRef>, IntegrationError> {
        let members = self.groups.get(gid).cloned().unwrap_or_default();
        Ok(members
            .into_iter()
            .map(|uid| UserRef {
                display_name: uid.clone(),
                email: String::new(),
                uid,
            })
            .collect())
    }

    async fn profile_properties(
        &self,
        uid: &str,
    ) -> Result<Vec<ProfileProperty>, IntegrationError> {
        Ok(self.properties.get(uid).cloned().unwrap_or_default())
    }
}

/// Records every notification; sends to `fail_for` fail.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String, String)>>,
    pub fail_for: Option<String>,
}

impl RecordingNotifier {
    pub fn failing_for(uid: &str) -> Self {
        Self {
            fail_for: Some(uid.to_string()),
            ..Self::default()
        }
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent
            .lock()
            .expect("notifier lock")
            .iter()
            .map(|(to, _, _)| to.clone())
            .collect()
    }
}

#[async_trait]
impl PlatformNotifier for RecordingNotifier {
    async fn notify(
        &self,
        to_uid: &str,
        subject: &str,
        message: &str,
        _link: &str,
    ) -> Result<(), IntegrationError> {
        if self.fail_for.as_deref() == Some(to_uid) {
            return Err(IntegrationError::status("notifier", 500));
        }
        self.sent.lock().expect("notifier lock").push((
            to_uid.to_string(),
            subject.to_string(),
            message.to_string(),
        ));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingChat {
    pub direct: Mutex<Vec<(String, String)>>,
    pub rooms: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ChatGateway for RecordingChat {
    async fn send_direct(&self, to_uid: &str, message: &str) -> Result<(), IntegrationError> {
        self.direct
            .lock()
            .expect("chat lock")
            .push((to_uid.to_string(), message.to_string()));
        Ok(())
    }

    async fn send_to_room(&self, token: &str, message: &str) -> Result<(), IntegrationError> {
        if token.trim().is_empty() {
            return Ok(());
        }
        self.rooms
            .lock()
            .expect("chat lock")
            .push((token.to_string(), message.to_string()));
        Ok(())
    }

    async fn list_channels(&self) -> Result<Vec<ChatChannel>, IntegrationError> {
        Ok(vec![ChatChannel {
            token: "room1".to_string(),
            name: "RH".to_string(),
        }])
    }

    async fn probe_direct(&self, to_uid: &str, message: &str) -> TalkProbe {
        TalkProbe {
            to_uid: to_uid.to_string(),
            token: "room1".to_string(),
            send_status: Some(201),
            send_body: Some(message.to_string()),
            ..TalkProbe::default()
        }
    }
}

/// Calendar double that accepts every event and records it.
#[derive(Default)]
pub struct CountingCalendar {
    pub events: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl CalendarGateway for CountingCalendar {
    async fn list_calendars(&self, _uid: &str) -> Result<Vec<CalendarRef>, IntegrationError> {
        Ok(vec![CalendarRef {
            uri: "personal".to_string(),
            display_name: "Personal".to_string(),
            writable: true,
        }])
    }

    async fn create_event(
        &self,
        uid: &str,
        _calendar_uri: &str,
        object_name: &str,
        ics: &str,
    ) -> Result<(), IntegrationError> {
        self.events.lock().expect("calendar lock").push((
            uid.to_string(),
            object_name.to_string(),
            ics.to_string(),
        ));
        Ok(())
    }
}
