use thiserror::Error;

/// Failure of a call into the host platform (directory, notifications,
/// chat, calendar). Always caught and logged at the component boundary;
/// never propagated past the notification/calendar components.
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {context}")]
    Status { context: String, status: u16 },

    #[error("{0} unavailable")]
    Unavailable(String),

    #[error("malformed response from {0}")]
    Malformed(String),
}

impl IntegrationError {
    pub fn status(context: impl Into<String>, status: u16) -> Self {
        IntegrationError::Status {
            context: context.into(),
            status,
        }
    }
}
