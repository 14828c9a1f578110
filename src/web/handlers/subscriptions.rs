use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    admin::{apply_action, ActionOutcome, AdminAction},
    database::repository::SubscriptionFilter,
    models::{SubscriptionRecord, SubscriptionStatus},
    utils::state::AppState,
    web::error::ApiError,
};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    /// Email search
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub action: AdminAction,
    pub user_ids: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub action: AdminAction,
    pub outcomes: Vec<ActionOutcome>,
}

pub async fn list_subscriptions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SubscriptionRecord>>, ApiError> {
    let status = query
        .status
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<SubscriptionStatus>())
        .transpose()
        .map_err(ApiError::BadRequest)?;
    let filter = SubscriptionFilter {
        status,
        email_contains: query.q.filter(|q| !q.is_empty()),
        user_ids: None,
    };

    let records = state.repository.find_subscriptions(&filter).await?;
    Ok(Json(records))
}

pub async fn run_action(
    State(state): State<AppState>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    tracing::info!(
        "Running {:?} over {} subscriptions",
        request.action,
        request.user_ids.len()
    );
    let filter = SubscriptionFilter::by_user_ids(request.user_ids);
    let outcomes = apply_action(&state, request.action, &filter).await?;

    Ok(Json(ActionResponse {
        action: request.action,
        outcomes,
    }))
}
