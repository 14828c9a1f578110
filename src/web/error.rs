use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use crate::{database::error::RepositoryError, groups::FormError, mailchimp::MailChimpError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    MailChimp(#[from] MailChimpError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("Malformed query: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ApiError::MailChimp(err) => match err {
                MailChimpError::GroupingNotFound(_) | MailChimpError::EmailNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                MailChimpError::Remote { .. }
                | MailChimpError::Http(_)
                | MailChimpError::Decode(_) => StatusCode::BAD_GATEWAY,
                MailChimpError::EmailUnsubscribed => StatusCode::CONFLICT,
                MailChimpError::Configuration(_) | MailChimpError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Form(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
