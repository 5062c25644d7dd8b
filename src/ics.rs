//! iCalendar (RFC5545) rendering for approved leaves: the single VEVENT
//! pushed to the owner's calendar on approval, and the token-gated feed
//! document.

use crate::model::leave::{LeaveRequest, type_label_fr};
use crate::utils::dates;

pub const PRODID: &str = "-//conges//Leave Requests//FR";

/// Escape commas, semicolons, backslashes and newlines per RFC5545.
pub fn escape_text(s: &str) -> String {
    let normalized = s.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(normalized.len());
    for c in normalized.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\,"),
            ';' => out.push_str("\\;"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}

/// Stable component UID, `leave-<id>@<host>`.
pub fn component_uid(id: i64, host: &str) -> String {
    format!("leave-{id}@{host}")
}

/// Stable object name so a pushed event can be referenced later.
pub fn object_name(id: i64) -> String {
    format!("leave-{id}.ics")
}

pub fn event_summary(leave: &LeaveRequest) -> String {
    let mut summary = String::from("Congé approuvé");
    if !leave.leave_type.is_empty() {
        summary.push_str(" · ");
        summary.push_str(type_label_fr(&leave.leave_type));
    }
    summary
}

pub fn event_description(leave: &LeaveRequest) -> String {
    let mut desc = String::new();
    let reason = leave.reason.trim();
    if !reason.is_empty() {
        desc.push_str("Raison: ");
        desc.push_str(reason);
    }
    let comment = leave.admin_comment.trim();
    if !comment.is_empty() {
        if !desc.is_empty() {
            desc.push('\n');
        }
        desc.push_str("Commentaire: ");
        desc.push_str(comment);
    }
    desc
}

fn vevent_lines(leave: &LeaveRequest, host: &str, dtstamp: &str) -> Vec<String> {
    let mut lines = vec![
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}", escape_text(&component_uid(leave.id, host))),
        format!("DTSTAMP:{dtstamp}"),
        format!("DTSTART;VALUE=DATE:{}", dates::compact(leave.start_date)),
        format!(
            "DTEND;VALUE=DATE:{}",
            dates::compact(dates::exclusive_end(leave.end_date))
        ),
        format!("SUMMARY:{}", escape_text(&event_summary(leave))),
    ];
    let desc = event_description(leave);
    if !desc.is_empty() {
        lines.push(format!("DESCRIPTION:{}", escape_text(&desc)));
    }
    lines.push("END:VEVENT".to_string());
    lines
}

/// A standalone VCALENDAR carrying the single all-day event for one leave,
/// suitable for a calendar-store PUT.
pub fn calendar_object(leave: &LeaveRequest, host: &str) -> String {
    let dtstamp = dates::dtstamp_utc();
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODID}"),
        "CALSCALE:GREGORIAN".to_string(),
    ];
    lines.extend(vevent_lines(leave, host, &dtstamp));
    lines.push("END:VCALENDAR".to_string());
    lines.join("\r\n")
}

/// The published feed: one VEVENT per approved leave, caller is expected to
/// pass them sorted by ascending start date.
pub fn feed(leaves: &[LeaveRequest], host: &str) -> String {
    let dtstamp = dates::dtstamp_utc();
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODID}"),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
    ];
    for leave in leaves {
        lines.extend(vevent_lines(leave, host, &dtstamp));
    }
    lines.push("END:VCALENDAR".to_string());
    lines.join("\r\n")
}
