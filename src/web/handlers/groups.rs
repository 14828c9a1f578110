use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    groups::{groups_form_for, CleanedGroups, GroupsForm},
    utils::state::AppState,
    web::error::ApiError,
};

#[derive(Debug, Default, Deserialize)]
pub struct FormQuery {
    pub email: Option<String>,
    pub grouping: Option<String>,
    pub list_id: Option<String>,
}

/// Submitted interest-group form.
#[derive(Debug, Default, Deserialize)]
pub struct FormSubmission {
    #[serde(flatten)]
    pub query: FormQuery,
    #[serde(default)]
    pub data: HashMap<String, String>,
}

impl FormQuery {
    async fn build(&self, state: &AppState) -> Result<GroupsForm, ApiError> {
        let form = groups_form_for(
            state,
            self.email.as_deref().filter(|e| !e.is_empty()),
            self.grouping.as_deref().filter(|g| !g.is_empty()),
            self.list_id.as_deref(),
        )
        .await?;
        Ok(form)
    }
}

pub async fn get_groups_form(
    State(state): State<AppState>,
    Query(query): Query<FormQuery>,
) -> Result<Json<GroupsForm>, ApiError> {
    Ok(Json(query.build(&state).await?))
}

pub async fn submit_groups_form(
    State(state): State<AppState>,
    Json(submission): Json<FormSubmission>,
) -> Result<Json<CleanedGroups>, ApiError> {
    let form = submission.query.build(&state).await?;
    let cleaned = form.clean(&submission.data)?;
    Ok(Json(cleaned))
}
