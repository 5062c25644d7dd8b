//! Persistence of leave rows. Every operation is a single-row effect; the
//! only multi-row reads are the listings.

use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::model::leave::LeaveRequest;
use crate::utils::dates;

const COLUMNS: &str = "id, uid, start_date, end_date, type, status, reason, admin_comment, \
                       day_parts, created_at, updated_at, calendar_object_uri, calendar_component_uid";

#[derive(Clone)]
pub struct LeaveStore {
    pool: SqlitePool,
}

impl LeaveStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        uid: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        leave_type: &str,
        reason: &str,
        day_parts: &str,
    ) -> sqlx::Result<i64> {
        let now = dates::now_stamp();
        let result = sqlx::query(
            r#"
            INSERT INTO leaves
                (uid, start_date, end_date, type, reason, day_parts,
                 status, admin_comment, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 'pending', '', ?, ?)
            "#,
        )
        .bind(uid)
        .bind(start_date)
        .bind(end_date)
        .bind(leave_type)
        .bind(reason)
        .bind(day_parts)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_by_id(&self, id: i64) -> sqlx::Result<Option<LeaveRequest>> {
        sqlx::query_as::<_, LeaveRequest>(&format!(
            "SELECT {COLUMNS} FROM leaves WHERE id = ? LIMIT 1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Newest-created first; id breaks ties within the same second.
    pub async fn list_for_user(&self, uid: &str) -> sqlx::Result<Vec<LeaveRequest>> {
        sqlx::query_as::<_, LeaveRequest>(&format!(
            "SELECT {COLUMNS} FROM leaves WHERE uid = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(uid)
        .fetch_all(&self.pool)
        .await
    }

    /// Ascending start date, the order the ICS feed publishes.
    pub async fn list_approved_for_user(&self, uid: &str) -> sqlx::Result<Vec<LeaveRequest>> {
        sqlx::query_as::<_, LeaveRequest>(&format!(
            "SELECT {COLUMNS} FROM leaves WHERE uid = ? AND status = 'approved' \
             ORDER BY start_date ASC, id ASC"
        ))
        .bind(uid)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_all(&self) -> sqlx::Result<Vec<LeaveRequest>> {
        sqlx::query_as::<_, LeaveRequest>(&format!(
            "SELECT {COLUMNS} FROM leaves ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    /// Atomic conditional update: the decision lands only while the row is
    /// still pending, so two concurrent decisions cannot both win.
    pub async fn set_status_if_pending(
        &self,
        id: i64,
        status: &str,
        admin_comment: &str,
    ) -> sqlx::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE leaves
            SET status = ?, admin_comment = ?, updated_at = ?
            WHERE id = ?
            AND status = 'pending'
            "#,
        )
        .bind(status)
        .bind(admin_comment)
        .bind(dates::now_stamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn save_calendar_ref(
        &self,
        id: i64,
        object_uri: &str,
        component_uid: &str,
    ) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            UPDATE leaves
            SET calendar_object_uri = ?, calendar_component_uid = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(object_uri)
        .bind(component_uid)
        .bind(dates::now_stamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Conditional delete mirroring `set_status_if_pending`: the row goes
    /// away only while it is still pending and owned by the caller, so a
    /// decision landing concurrently wins over the withdrawal.
    pub async fn delete_if_pending(&self, id: i64, uid: &str) -> sqlx::Result<bool> {
        let result = sqlx::query(
            "DELETE FROM leaves WHERE id = ? AND uid = ? AND status = 'pending'",
        )
        .bind(id)
        .bind(uid)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
