//! Text encoding of the merge vars parked on a pending subscription.

use crate::{database::error::RepositoryError, mailchimp::client::MergeVars};

/// Encodes merge vars as a JSON object for the `merge_vars` column.
pub fn store(merge_vars: &MergeVars) -> Result<String, RepositoryError> {
    serde_json::to_string(merge_vars).map_err(|e| RepositoryError::InvalidData(e.to_string()))
}

/// Decodes the `merge_vars` column; anything but a JSON object is rejected.
pub fn load(text: &str) -> Result<MergeVars, RepositoryError> {
    serde_json::from_str(text).map_err(|e| {
        tracing::error!("Invalid merge vars column: {e}");
        RepositoryError::InvalidData(e.to_string())
    })
}
