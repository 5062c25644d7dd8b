//! Pushes an approved leave into the employee's calendar. The gateway path
//! enumerates the user's collections and writes through it; when that fails
//! the blind DAV fallback PUTs against conventional collection names. Once
//! an object reference is persisted the push never repeats.

use std::sync::Arc;

use tracing::warn;

use crate::integration::caldav::{CalendarGateway, DavClient, FALLBACK_COLLECTIONS};
use crate::ics;
use crate::model::leave::LeaveRequest;
use crate::store::LeaveStore;

/// Outcome of one push attempt, with a human-readable trace for diagnostics.
#[derive(Debug, Default)]
pub struct PushReport {
    pub pushed: bool,
    pub trace: Vec<String>,
}

impl PushReport {
    fn note(&mut self, line: impl Into<String>) {
        self.trace.push(line.into());
    }
}

pub struct CalendarPush {
    gateway: Option<Arc<dyn CalendarGateway>>,
    dav: DavClient,
    store: LeaveStore,
    host: String,
}

impl CalendarPush {
    pub fn new(
        gateway: Option<Arc<dyn CalendarGateway>>,
        dav: DavClient,
        store: LeaveStore,
        host: &str,
    ) -> Self {
        Self {
            gateway,
            dav,
            store,
            host: host.to_string(),
        }
    }

    pub async fn push(&self, leave: &LeaveRequest) -> PushReport {
        let mut report = PushReport::default();
        if !leave.calendar_object_uri.is_empty() {
            report.note("skip: already has calendar_object_uri");
            return report;
        }

        let object_name = ics::object_name(leave.id);
        let component_uid = ics::component_uid(leave.id, &self.host);
        let body = ics::calendar_object(leave, &self.host);

        if let Some(gateway) = &self.gateway {
            match gateway.list_calendars(&leave.uid).await {
                Ok(calendars) => {
                    report.note(format!("gateway calendars count={}", calendars.len()));
                    let target = calendars
                        .iter()
                        .find(|c| c.writable && c.uri.eq_ignore_ascii_case("personal"))
                        .or_else(|| calendars.iter().find(|c| c.writable));
                    if let Some(cal) = target {
                        report.note(format!("selected calendar uri={}", cal.uri));
                        match gateway
                            .create_event(&leave.uid, &cal.uri, &object_name, &body)
                            .await
                        {
                            Ok(()) => {
                                let uri = format!("{}/{}", cal.uri, object_name);
                                self.persist_ref(leave.id, &uri, &component_uid, &mut report)
                                    .await;
                                report.pushed = true;
                                return report;
                            }
                            Err(e) => report.note(format!("gateway create failed: {e}")),
                        }
                    } else {
                        report.note("no writable calendar via gateway");
                    }
                }
                Err(e) => report.note(format!("gateway listing failed: {e}")),
            }
        }

        for collection in FALLBACK_COLLECTIONS {
            match self
                .dav
                .put_event(&leave.uid, collection, &object_name, &body)
                .await
            {
                Ok(status) => {
                    report.note(format!("DAV PUT {collection} status={status}"));
                    if (200..300).contains(&status) {
                        let uri = format!("{collection}/{object_name}");
                        self.persist_ref(leave.id, &uri, &component_uid, &mut report)
                            .await;
                        report.pushed = true;
                        return report;
                    }
                }
                Err(e) => report.note(format!("DAV PUT {collection} error: {e}")),
            }
        }

        report.note("no calendar accepted the event");
        report
    }

    async fn persist_ref(
        &self,
        leave_id: i64,
        object_uri: &str,
        component_uid: &str,
        report: &mut PushReport,
    ) {
        match self
            .store
            .save_calendar_ref(leave_id, object_uri, component_uid)
            .await
        {
            Ok(()) => report.note(format!("saved calendar_object_uri={object_uri}")),
            Err(e) => {
                warn!(error = %e, leave = leave_id, "could not persist calendar reference");
                report.note(format!("persist failed: {e}"));
            }
        }
    }
}
