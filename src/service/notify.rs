//! Notification fan-out: turns a lifecycle event into in-platform
//! notifications and, when enabled, chat messages. Every channel and every
//! recipient is independent; a failure is logged and the rest of the
//! fan-out continues.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::integration::directory::Directory;
use crate::integration::notify::PlatformNotifier;
use crate::integration::talk::ChatGateway;
use crate::model::leave::{LeaveRequest, LeaveStatus};
use crate::settings::{self, SettingsStore};
use crate::utils::dates;

/// Links embedded in notifications, relative to the host platform.
const ADMIN_PAGE_LINK: &str = "/apps/conges/page";
const EMPLOYEE_PAGE_LINK: &str = "/apps/conges/page/employee";

pub struct NotificationFanout {
    directory: Arc<dyn Directory>,
    notifier: Arc<dyn PlatformNotifier>,
    chat: Arc<dyn ChatGateway>,
    settings: SettingsStore,
}

impl NotificationFanout {
    pub fn new(
        directory: Arc<dyn Directory>,
        notifier: Arc<dyn PlatformNotifier>,
        chat: Arc<dyn ChatGateway>,
        settings: SettingsStore,
    ) -> Self {
        Self {
            directory,
            notifier,
            chat,
            settings,
        }
    }

    /// "leave_created": notify every app admin and platform admin except the
    /// requester, then the managers/channel over chat when enabled.
    pub async fn on_created(&self, leave: &LeaveRequest) {
        let (subject, message) = render_created(leave);
        for uid in self.admin_recipients(&leave.uid).await {
            if let Err(e) = self
                .notifier
                .notify(&uid, &subject, &message, ADMIN_PAGE_LINK)
                .await
            {
                warn!(error = %e, recipient = %uid, leave = leave.id, "leave_created notification failed");
            }
        }

        if !self.talk_enabled().await {
            return;
        }
        let md = self.format_new_leave_md(leave).await;
        for manager in self.manager_uids_for(&leave.uid).await {
            if manager.is_empty() || manager == leave.uid {
                continue;
            }
            if let Err(e) = self.chat.send_direct(&manager, &md).await {
                debug!(error = %e, manager = %manager, "talk send (create) failed");
            }
        }
        self.broadcast(&md).await;
    }

    /// "leave_status_changed": unicast to the owner, plus chat when enabled.
    pub async fn on_status_changed(&self, leave: &LeaveRequest) {
        let (subject, message) = render_status_changed(leave);
        if let Err(e) = self
            .notifier
            .notify(&leave.uid, &subject, &message, EMPLOYEE_PAGE_LINK)
            .await
        {
            warn!(error = %e, recipient = %leave.uid, leave = leave.id, "status notification failed");
        }

        if !self.talk_enabled().await {
            return;
        }
        let md = self.format_status_md(leave).await;
        if let Err(e) = self.chat.send_direct(&leave.uid, &md).await {
            debug!(error = %e, employee = %leave.uid, "talk send (status) failed");
        }
        self.broadcast(&md).await;
    }

    async fn talk_enabled(&self) -> bool {
        match self.settings.talk_enabled().await {
            Ok(enabled) => enabled,
            Err(e) => {
                warn!(error = %e, "could not read talk_enabled flag");
                false
            }
        }
    }

    async fn broadcast(&self, message: &str) {
        let token = match self.settings.talk_channel_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "could not read broadcast channel");
                return;
            }
        };
        if token.is_empty() {
            return;
        }
        if let Err(e) = self.chat.send_to_room(&token, message).await {
            debug!(error = %e, "talk broadcast failed");
        }
    }

    /// App admin group members plus platform super-admins, minus the
    /// requester. Directory failures shrink the set rather than aborting.
    async fn admin_recipients(&self, requester: &str) -> Vec<String> {
        let mut recipients = BTreeSet::new();
        let admin_group = match self.settings.admin_group().await {
            Ok(g) => g,
            Err(e) => {
                warn!(error = %e, "could not read admin group");
                settings::SUPER_ADMIN_GROUP.to_string()
            }
        };
        for gid in [admin_group.as_str(), settings::SUPER_ADMIN_GROUP] {
            match self.directory.group_members(gid).await {
                Ok(members) => {
                    recipients.extend(members.into_iter().map(|m| m.uid));
                }
                Err(e) => warn!(error = %e, group = %gid, "group member lookup failed"),
            }
        }
        recipients.remove(requester);
        recipients.into_iter().collect()
    }

    /// Manager resolution precedence: structured "manager" property, then
    /// "supervisor", then the per-user config value (JSON array or scalar),
    /// then a best-effort scan of any property named like manager or
    /// supervisor. Values that resolve to no user are dropped silently.
    pub async fn manager_uids_for(&self, employee_uid: &str) -> Vec<String> {
        let properties = self
            .directory
            .profile_properties(employee_uid)
            .await
            .unwrap_or_default();

        let mut uids: Vec<String> = Vec::new();
        for name in ["manager", "supervisor"] {
            if !uids.is_empty() {
                break;
            }
            if let Some(p) = properties
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(name))
            {
                if let Some(uid) = self.resolve_to_uid(&p.value).await {
                    uids.push(uid);
                }
            }
        }

        if uids.is_empty() {
            let raw = self
                .settings
                .user_value(employee_uid, settings::MANAGER_KEY, "")
                .await
                .unwrap_or_default();
            if !raw.is_empty() {
                match serde_json::from_str::<Value>(&raw) {
                    Ok(Value::Array(items)) => {
                        for item in items {
                            if let Some(value) = item.as_str() {
                                if let Some(uid) = self.resolve_to_uid(value).await {
                                    uids.push(uid);
                                }
                            }
                        }
                    }
                    _ => {
                        if let Some(uid) = self.resolve_to_uid(&raw).await {
                            uids.push(uid);
                        }
                    }
                }
            }
        }

        if uids.is_empty() {
            for p in &properties {
                let name = p.name.to_lowercase();
                if name.contains("manager") || name.contains("supervisor") {
                    if let Some(uid) = self.resolve_to_uid(&p.value).await {
                        uids.push(uid);
                    }
                }
            }
        }

        let mut seen = BTreeSet::new();
        uids.retain(|u| seen.insert(u.clone()));
        uids
    }

    /// Normalize a raw manager reference (uid, email, display name or
    /// `id@host` federated id) to a canonical uid.
    pub async fn resolve_to_uid(&self, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        if let Ok(Some(user)) = self.directory.lookup(value).await {
            return Some(user.uid);
        }
        if let Ok(matches) = self.directory.lookup_by_email(value).await {
            if let Some(user) = matches.into_iter().next() {
                return Some(user.uid);
            }
        }
        if let Ok(candidates) = self.directory.search_display_name(value).await {
            if let Some(user) = candidates
                .into_iter()
                .find(|c| c.display_name.eq_ignore_ascii_case(value))
            {
                return Some(user.uid);
            }
        }
        if let Some(at) = value.find('@') {
            if let Ok(Some(user)) = self.directory.lookup(&value[..at]).await {
                return Some(user.uid);
            }
        }
        None
    }

    /// Users whose manager resolution contains the given uid. Used for the
    /// manager-scoped admin listing and on-behalf-of creation.
    pub async fn subordinates_of(&self, manager_uid: &str) -> Vec<String> {
        let users = match self.directory.list_users().await {
            Ok(users) => users,
            Err(e) => {
                warn!(error = %e, "user listing failed while resolving subordinates");
                return Vec::new();
            }
        };
        let mut out = Vec::new();
        for user in users {
            if user.uid == manager_uid {
                continue;
            }
            if self
                .manager_uids_for(&user.uid)
                .await
                .iter()
                .any(|m| m == manager_uid)
            {
                out.push(user.uid);
            }
        }
        out
    }

    async fn display_line(&self, uid: &str) -> String {
        match self.directory.lookup(uid).await {
            Ok(Some(user)) if !user.display_name.is_empty() && user.display_name != uid => {
                format!("{} ({})", user.display_name, uid)
            }
            _ => uid.to_string(),
        }
    }

    pub async fn format_new_leave_md(&self, leave: &LeaveRequest) -> String {
        let who = self.display_line(&leave.uid).await;
        let start_long = dates::format_long_fr(&leave.start_date.to_string());
        let end_long = dates::format_long_fr(&leave.end_date.to_string());
        let mut md = String::from("__                                           __\n\n");
        md.push_str("### Nouvelle demande de congés\n\n");
        md.push_str(&format!("**Employé**\n{who}\n\n"));
        md.push_str(&format!("**Période**\n{start_long} → {end_long}\n"));
        let days = day_parts_markdown(&leave.day_parts);
        if !days.is_empty() {
            md.push_str(&format!("\n**Jours**\n{days}\n"));
        }
        let reason = leave.reason.trim();
        if !reason.is_empty() {
            md.push_str(&format!("\n**Motif**\n{reason}\n"));
        }
        md
    }

    pub async fn format_status_md(&self, leave: &LeaveRequest) -> String {
        let who = self.display_line(&leave.uid).await;
        let status_fr = LeaveStatus::label_fr(&leave.status);
        let mut md = String::from("__                                           __\n\n");
        md.push_str("### Statut de votre demande de congés\n\n");
        md.push_str(&format!(
            "**Période**\n{} → {}\n",
            leave.start_date, leave.end_date
        ));
        md.push_str(&format!("**Employé**\n{who}\n\n"));
        let days = day_parts_markdown(&leave.day_parts);
        if !days.is_empty() {
            md.push_str(&format!("\n**Jours**\n{days}\n"));
        }
        md.push_str(&format!("\n**Statut**\n{}.\n", dates::ucfirst(status_fr)));
        let comment = leave.admin_comment.trim();
        if !comment.is_empty() {
            md.push_str(&format!("\n**Commentaire**\n{comment}\n"));
        }
        md
    }
}

pub fn render_created(leave: &LeaveRequest) -> (String, String) {
    let subject = "Nouvelle demande de congés".to_string();
    let message = format!(
        "{} a créé une demande de congés du {} au {}.",
        leave.uid, leave.start_date, leave.end_date
    );
    (subject, message)
}

pub fn render_status_changed(leave: &LeaveRequest) -> (String, String) {
    let subject = "Statut de votre demande".to_string();
    let status_fr = LeaveStatus::label_fr(&leave.status);
    let mut message = format!(
        "Votre demande de congés ({} → {}) a été {}.",
        leave.start_date, leave.end_date, status_fr
    );
    let comment = leave.admin_comment.trim();
    if !comment.is_empty() {
        message.push_str(" Commentaire: ");
        message.push_str(comment);
    }
    (subject, message)
}

fn day_part_label(part: &str) -> &str {
    match part {
        "full" => "Journée complète",
        "am" => "Matin",
        "pm" => "Après-midi",
        other => other,
    }
}

/// Render the serialized day-part mapping as a Markdown list. Accepts the
/// historical shapes: an object of date → part, an array of
/// `{date, part}` items or bare date strings, or free-form text.
pub fn day_parts_markdown(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    let decoded = if raw.starts_with('{') || raw.starts_with('[') {
        serde_json::from_str::<Value>(raw).ok()
    } else {
        None
    };
    let mut lines = Vec::new();
    match decoded {
        Some(Value::Object(map)) => {
            for (date, part) in &map {
                let label = part
                    .as_str()
                    .map(day_part_label)
                    .unwrap_or_default()
                    .to_string();
                lines.push(format!("- {}: {}", dates::format_long_fr(date), label));
            }
        }
        Some(Value::Array(items)) => {
            for item in &items {
                match item {
                    Value::Object(entry) => {
                        let date = entry.get("date").and_then(Value::as_str).unwrap_or_default();
                        let part = entry.get("part").and_then(Value::as_str).unwrap_or_default();
                        if !date.is_empty() && !part.is_empty() {
                            lines.push(format!(
                                "- {}: {}",
                                dates::format_long_fr(date),
                                day_part_label(part)
                            ));
                        }
                    }
                    Value::String(date) => {
                        lines.push(format!("- {}", dates::format_long_fr(date)));
                    }
                    _ => {}
                }
            }
        }
        _ => lines.push(format!("- {}", dates::format_long_fr(raw))),
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        MemoryDirectory, RecordingChat, RecordingNotifier, sample_leave, test_pool,
    };

    async fn fanout_with(directory: MemoryDirectory) -> (NotificationFanout, SettingsStore) {
        let settings = SettingsStore::new(test_pool().await);
        let fanout = NotificationFanout::new(
            Arc::new(directory),
            Arc::new(RecordingNotifier::default()),
            Arc::new(RecordingChat::default()),
            settings.clone(),
        );
        (fanout, settings)
    }

    #[actix_web::test]
    async fn structured_manager_property_wins_over_config() {
        let directory = MemoryDirectory::new()
            .with_user("alice", "Alice Martin", "alice@example.com")
            .with_user("bob", "Bob Durand", "bob@example.com")
            .with_user("carol", "Carol Petit", "carol@example.com")
            .with_property("alice", "manager", "bob");
        let (fanout, settings) = fanout_with(directory).await;
        // conflicting config fallback that must not be used
        settings
            .set_user_value("alice", settings::MANAGER_KEY, "carol")
            .await
            .unwrap();

        assert_eq!(fanout.manager_uids_for("alice").await, vec!["bob"]);
    }

    #[actix_web::test]
    async fn config_fallback_applies_when_properties_are_absent() {
        let directory = MemoryDirectory::new()
            .with_user("alice", "Alice Martin", "alice@example.com")
            .with_user("bob", "Bob Durand", "bob@example.com")
            .with_user("carol", "Carol Petit", "carol@example.com");
        let (fanout, settings) = fanout_with(directory).await;
        settings
            .set_user_value("alice", settings::MANAGER_KEY, r#"["bob","carol"]"#)
            .await
            .unwrap();

        assert_eq!(fanout.manager_uids_for("alice").await, vec!["bob", "carol"]);
    }

    #[actix_web::test]
    async fn scalar_config_value_and_property_scan() {
        let directory = MemoryDirectory::new()
            .with_user("alice", "Alice Martin", "alice@example.com")
            .with_user("bob", "Bob Durand", "bob@example.com");
        let (fanout, settings) = fanout_with(directory).await;
        settings
            .set_user_value("alice", settings::MANAGER_KEY, "bob")
            .await
            .unwrap();
        assert_eq!(fanout.manager_uids_for("alice").await, vec!["bob"]);

        // property with a manager-like name is the last resort
        let directory = MemoryDirectory::new()
            .with_user("dave", "Dave", "dave@example.com")
            .with_user("erin", "Erin", "erin@example.com")
            .with_property("dave", "Line Manager", "erin");
        let (fanout, _) = fanout_with(directory).await;
        assert_eq!(fanout.manager_uids_for("dave").await, vec!["erin"]);
    }

    #[actix_web::test]
    async fn manager_values_resolve_through_every_strategy() {
        let directory = MemoryDirectory::new()
            .with_user("alice", "Alice Martin", "alice@example.com")
            .with_user("bob", "Bob Durand", "bob@example.com");
        let (fanout, _) = fanout_with(directory).await;

        assert_eq!(fanout.resolve_to_uid("bob").await.as_deref(), Some("bob"));
        assert_eq!(
            fanout.resolve_to_uid("bob@example.com").await.as_deref(),
            Some("bob")
        );
        assert_eq!(
            fanout.resolve_to_uid("bob durand").await.as_deref(),
            Some("bob")
        );
        // federated id falls back to the part before the @
        assert_eq!(
            fanout.resolve_to_uid("bob@cloud.example.org").await.as_deref(),
            Some("bob")
        );
        assert_eq!(fanout.resolve_to_uid("nobody").await, None);
        assert_eq!(fanout.resolve_to_uid("  ").await, None);
    }

    #[actix_web::test]
    async fn subordinates_are_users_managed_by_the_caller() {
        let directory = MemoryDirectory::new()
            .with_user("boss", "The Boss", "boss@example.com")
            .with_user("alice", "Alice", "alice@example.com")
            .with_user("bob", "Bob", "bob@example.com")
            .with_property("alice", "manager", "boss");
        let (fanout, _) = fanout_with(directory).await;

        assert_eq!(fanout.subordinates_of("boss").await, vec!["alice"]);
        assert!(fanout.subordinates_of("bob").await.is_empty());
    }

    #[test]
    fn day_parts_render_object_and_array_shapes() {
        let object = r#"{"2025-01-10":"am","2025-01-11":"full"}"#;
        let md = day_parts_markdown(object);
        assert!(md.contains("- Vendredi 10 janvier 2025: Matin"));
        assert!(md.contains("- Samedi 11 janvier 2025: Journée complète"));

        let array = r#"[{"date":"2025-01-10","part":"pm"}]"#;
        assert_eq!(
            day_parts_markdown(array),
            "- Vendredi 10 janvier 2025: Après-midi"
        );

        assert_eq!(day_parts_markdown(""), "");
        // free-form content is shown as-is
        assert_eq!(day_parts_markdown("demi-journée"), "- demi-journée");
    }

    #[test]
    fn rendered_notification_texts() {
        let leave = sample_leave(1, "alice", "2025-01-10", "2025-01-12");
        let (subject, message) = render_created(&leave);
        assert_eq!(subject, "Nouvelle demande de congés");
        assert_eq!(
            message,
            "alice a créé une demande de congés du 2025-01-10 au 2025-01-12."
        );

        let mut decided = leave.clone();
        decided.status = "approved".into();
        decided.admin_comment = "ok".into();
        let (_, message) = render_status_changed(&decided);
        assert_eq!(
            message,
            "Votre demande de congés (2025-01-10 → 2025-01-12) a été approuvée. Commentaire: ok"
        );
    }
}
