//! Leave request lifecycle. Requests start pending; a single decision moves
//! them to approved or rejected, and an approval is what triggers the
//! calendar push. The decision is guarded by a conditional update so two
//! concurrent admins cannot both win.

use anyhow::Context;
use chrono::NaiveDate;
use tracing::debug;

use crate::model::leave::{LeaveRequest, LeaveStatus, LeaveType};
use crate::service::calendar::CalendarPush;
use crate::service::notify::NotificationFanout;
use crate::store::LeaveStore;

pub struct LeaveService {
    store: LeaveStore,
    fanout: NotificationFanout,
    calendar: CalendarPush,
}

impl LeaveService {
    pub fn new(store: LeaveStore, fanout: NotificationFanout, calendar: CalendarPush) -> Self {
        Self {
            store,
            fanout,
            calendar,
        }
    }

    pub fn store(&self) -> &LeaveStore {
        &self.store
    }

    /// Insert a new pending request and fan out the creation notifications.
    /// Date ordering is validated by the API layer before this is reached.
    pub async fn create_leave(
        &self,
        uid: &str,
        start: NaiveDate,
        end: NaiveDate,
        leave_type: LeaveType,
        reason: &str,
        day_parts: &str,
    ) -> anyhow::Result<LeaveRequest> {
        let id = self
            .store
            .insert(uid, start, end, leave_type.as_str(), reason, day_parts)
            .await?;
        let leave = self
            .store
            .get_by_id(id)
            .await?
            .context("leave vanished right after insert")?;
        self.fanout.on_created(&leave).await;
        Ok(leave)
    }

    /// Owners may withdraw their own request while it is still pending.
    /// Returns false when the request is missing, owned by someone else or
    /// already decided; the check and the delete are one statement, so a
    /// concurrent decision cannot be overridden by a withdrawal.
    pub async fn delete_leave(&self, requester: &str, id: i64) -> anyhow::Result<bool> {
        Ok(self.store.delete_if_pending(id, requester).await?)
    }

    /// Decide a pending request. Returns false when the request was already
    /// decided (or does not exist); the losing admin of a race sees false.
    pub async fn set_status(
        &self,
        id: i64,
        status: LeaveStatus,
        admin_comment: &str,
    ) -> anyhow::Result<bool> {
        let updated = self
            .store
            .set_status_if_pending(id, status.as_str(), admin_comment)
            .await?;
        if !updated {
            return Ok(false);
        }
        let Some(leave) = self.store.get_by_id(id).await? else {
            return Ok(false);
        };
        self.fanout.on_status_changed(&leave).await;
        if leave.is_approved() {
            let report = self.calendar.push(&leave).await;
            debug!(leave = id, pushed = report.pushed, trace = ?report.trace, "calendar push");
        }
        Ok(true)
    }

    pub async fn leaves_for_user(&self, uid: &str) -> anyhow::Result<Vec<LeaveRequest>> {
        Ok(self.store.list_for_user(uid).await?)
    }

    pub async fn all_leaves(&self) -> anyhow::Result<Vec<LeaveRequest>> {
        Ok(self.store.list_all().await?)
    }

    /// All requests belonging to any of the given uids, newest first.
    pub async fn leaves_for_uids(&self, uids: &[String]) -> anyhow::Result<Vec<LeaveRequest>> {
        let all = self.store.list_all().await?;
        Ok(all
            .into_iter()
            .filter(|l| uids.iter().any(|u| u == &l.uid))
            .collect())
    }

    pub async fn is_manager_of(&self, manager_uid: &str, employee_uid: &str) -> bool {
        self.fanout
            .manager_uids_for(employee_uid)
            .await
            .iter()
            .any(|m| m == manager_uid)
    }

    pub async fn subordinates_of(&self, manager_uid: &str) -> Vec<String> {
        self.fanout.subordinates_of(manager_uid).await
    }
}
