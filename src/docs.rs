use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

use crate::api::admin::{StatusUpdate, TalkTest};
use crate::api::leaves::CreateLeave;
use crate::api::settings::{ChannelUpdate, GroupUpdate, TalkToggle};
use crate::integration::talk::{ChatChannel, TalkProbe};
use crate::model::leave::{LeaveRequest, LeaveStatus, LeaveType};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Congés API",
        version = "1.0.0",
        description = r#"
## Leave request management

Employees submit leave requests; the configured admin group reviews them.
Approvals land in the employee's calendar and everyone involved is notified,
optionally over chat.

### Key features
- **Requests**: create, list and withdraw pending leave requests
- **Review**: approve or reject with an optional comment
- **Calendar**: approved leaves are pushed to the employee's calendar and
  exposed as a token-gated ICS feed
- **Notifications**: admin fan-out on creation, owner notification on
  decision, optional chat messages to managers and a broadcast room

### Security
All `/api` endpoints require **JWT Bearer authentication**. The ICS feed is
public but gated by a per-user secret token.
"#,
    ),
    paths(
        crate::api::leaves::list_leaves,
        crate::api::leaves::create_leave,
        crate::api::leaves::delete_leave,

        crate::api::admin::list_all_leaves,
        crate::api::admin::set_leave_status,
        crate::api::admin::test_talk,

        crate::api::settings::get_admin_group,
        crate::api::settings::set_admin_group,
        crate::api::settings::list_groups,
        crate::api::settings::group_members,
        crate::api::settings::get_talk_enabled,
        crate::api::settings::set_talk_enabled,
        crate::api::settings::list_channels,
        crate::api::settings::get_channel,
        crate::api::settings::set_channel,

        crate::api::ics::get_feed_token,
        crate::api::ics::rotate_feed_token,
        crate::api::ics::serve_feed
    ),
    components(
        schemas(
            LeaveRequest,
            LeaveType,
            LeaveStatus,
            CreateLeave,
            StatusUpdate,
            TalkTest,
            TalkProbe,
            ChatChannel,
            GroupUpdate,
            TalkToggle,
            ChannelUpdate
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leaves", description = "Employee leave request APIs"),
        (name = "Admin", description = "Review and diagnostics APIs"),
        (name = "Settings", description = "Admin configuration APIs"),
        (name = "Feed", description = "ICS calendar feed APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
