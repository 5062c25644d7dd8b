use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LeaveType {
    Paid,
    Unpaid,
    Sick,
}

impl LeaveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveType::Paid => "paid",
            LeaveType::Unpaid => "unpaid",
            LeaveType::Sick => "sick",
        }
    }
}

/// French label for a stored type value. Unknown values fall back to the
/// historical third label, matching what existing rows may contain.
pub fn type_label_fr(raw: &str) -> &'static str {
    match raw {
        "paid" => "Soldé",
        "unpaid" => "Sans Solde",
        _ => "Anticipé",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
        }
    }

    /// French past participle used in notifications ("mise à jour" for a
    /// status that stayed pending).
    pub fn label_fr(raw: &str) -> &'static str {
        match raw {
            "approved" => "approuvée",
            "rejected" => "refusée",
            _ => "mise à jour",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: i64,
    /// Owning user id
    #[schema(example = "alice")]
    pub uid: String,
    #[schema(example = "2025-01-10", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2025-01-12", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    #[schema(example = "paid", value_type = String)]
    pub leave_type: String,
    #[schema(example = "pending", value_type = String)]
    pub status: String,
    pub reason: String,
    pub admin_comment: String,
    /// Serialized date → full/am/pm mapping, empty when the whole range is
    /// full days
    pub day_parts: String,
    pub created_at: String,
    pub updated_at: String,
    /// Back-reference to the pushed calendar object; non-empty means
    /// "do not push again"
    pub calendar_object_uri: String,
    pub calendar_component_uid: String,
}

impl LeaveRequest {
    pub fn is_pending(&self) -> bool {
        self.status == LeaveStatus::Pending.as_str()
    }

    pub fn is_approved(&self) -> bool {
        self.status == LeaveStatus::Approved.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_labels_cover_the_three_values() {
        assert_eq!(type_label_fr("paid"), "Soldé");
        assert_eq!(type_label_fr("unpaid"), "Sans Solde");
        assert_eq!(type_label_fr("sick"), "Anticipé");
        // legacy rows with unexpected values keep the historical label
        assert_eq!(type_label_fr("anticipated"), "Anticipé");
    }

    #[test]
    fn status_labels() {
        assert_eq!(LeaveStatus::label_fr("approved"), "approuvée");
        assert_eq!(LeaveStatus::label_fr("rejected"), "refusée");
        assert_eq!(LeaveStatus::label_fr("pending"), "mise à jour");
    }
}
