//! Clients for the host groupware platform. Each concern is a trait so the
//! services can be exercised against in-memory doubles; the HTTP
//! implementations talk to the platform's OCS/DAV endpoints.

pub mod caldav;
pub mod directory;
pub mod notify;
pub mod talk;

use std::sync::Arc;

pub use crate::error::IntegrationError;

/// Handles the API layer needs directly (settings endpoints, diagnostics).
pub struct Integrations {
    pub directory: Arc<dyn directory::Directory>,
    pub chat: Arc<dyn talk::ChatGateway>,
}
