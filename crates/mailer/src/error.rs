use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Invalid event JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Event is missing required field: {0}")]
    MissingField(&'static str),
}

/// Failure reported by the mail-sending capability itself.
///
/// Mailgun rejecting a message and the request never reaching Mailgun are kept
/// apart so callers can tell a bad credential from a network outage.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mailgun API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Invalid request: {0}")]
    Request(String),
}

impl MailError {
    pub fn is_retryable(&self) -> bool {
        match self {
            MailError::Api { status, .. } => *status == 429 || *status >= 500,
            MailError::Transport(_) => true,
            MailError::Request(_) => false,
        }
    }
}

/// Errors that abort a notification instead of producing a `DeliveryOutcome`.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to construct mail client: {0}")]
    Client(#[from] MailError),
    #[error("Send task aborted: {0}")]
    Aborted(String),
}
