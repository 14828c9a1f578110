use thiserror::Error;

use crate::database::error::RepositoryError;

/// Errors raised while talking to the mailing-list service.
#[derive(Debug, Error)]
pub enum MailChimpError {
    /// The service answered with an embedded `{code, error}` object.
    #[error("MailChimp error {code}: {message}")]
    Remote { message: String, code: i64 },

    #[error("Grouping not found: '{0}'")]
    GroupingNotFound(String),

    #[error("Email address not found in list: '{0}'")]
    EmailNotFound(String),

    /// Reserved; nothing currently checks for an unsubscribed member.
    #[error("Email address is unsubscribed")]
    EmailUnsubscribed,

    #[error("Improperly configured: {0}")]
    Configuration(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl MailChimpError {
    /// Remote error code, if this error came from the service itself.
    pub fn code(&self) -> Option<i64> {
        match self {
            MailChimpError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}
