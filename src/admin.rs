//! Bulk actions over selected subscription records.

use serde::{Deserialize, Serialize};

use crate::{
    database::{error::RepositoryError, repository::SubscriptionFilter},
    mailchimp::{
        client::{SubscribeOptions, UnsubscribeOptions},
        MailChimpError,
    },
    models::{SubscriptionRecord, SubscriptionStatus},
    utils::state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    Sync,
    Subscribe,
    /// Subscribe without double opt-in.
    ForceSubscribe,
    Unsubscribe,
    /// Unsubscribe and delete the member, without goodbye or notification mails.
    DeleteMember,
}

impl AdminAction {
    pub async fn apply(
        self,
        state: &AppState,
        record: &mut SubscriptionRecord,
    ) -> Result<(), MailChimpError> {
        match self {
            AdminAction::Sync => {
                record.sync(state, true).await?;
            }
            AdminAction::Subscribe => {
                record.subscribe(state, SubscribeOptions::default()).await?;
            }
            AdminAction::ForceSubscribe => {
                let options = SubscribeOptions {
                    double_optin: Some(false),
                    ..Default::default()
                };
                record.subscribe(state, options).await?;
            }
            AdminAction::Unsubscribe => {
                record
                    .unsubscribe(state, UnsubscribeOptions::default())
                    .await?;
            }
            AdminAction::DeleteMember => {
                let options = UnsubscribeOptions {
                    delete_member: Some(true),
                    send_goodbye: Some(false),
                    send_notify: Some(false),
                };
                record.unsubscribe(state, options).await?;
            }
        }
        Ok(())
    }
}

/// Result of an action for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub user_id: i32,
    pub email: String,
    pub status: SubscriptionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs `action` over every record matching `filter`, one at a time.
///
/// A failing record is logged and reported in its outcome; the remaining
/// records are still processed.
pub async fn apply_action(
    state: &AppState,
    action: AdminAction,
    filter: &SubscriptionFilter,
) -> Result<Vec<ActionOutcome>, RepositoryError> {
    let records = state.repository.find_subscriptions(filter).await?;
    let mut outcomes = Vec::with_capacity(records.len());

    for mut record in records {
        let error = match action.apply(state, &mut record).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("{action:?} failed for {}: {e}", record.user.email);
                Some(e.to_string())
            }
        };
        outcomes.push(ActionOutcome {
            user_id: record.user.id,
            email: record.user.email,
            status: record.status,
            error,
        });
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_account, test_app_state, MockListService};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_force_subscribe_then_delete_member() {
        let list = Arc::new(MockListService::new());
        let state = test_app_state(list.clone());
        let a = create_test_account(&state, "a@example.com").await;
        let b = create_test_account(&state, "b@example.com").await;
        let filter = SubscriptionFilter::by_user_ids(vec![a.id, b.id]);

        let outcomes = apply_action(&state, AdminAction::ForceSubscribe, &filter)
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes
            .iter()
            .all(|o| o.status == SubscriptionStatus::Subscribed && o.error.is_none()));

        let outcomes = apply_action(&state, AdminAction::DeleteMember, &filter)
            .await
            .unwrap();
        assert!(outcomes
            .iter()
            .all(|o| o.status == SubscriptionStatus::NotSubscribed));

        let (method, params) = list.recorded_calls().pop().unwrap();
        assert_eq!(method, "listUnsubscribe");
        assert_eq!(params["delete_member"], true);
        assert_eq!(params["send_goodbye"], false);
        assert_eq!(params["send_notify"], false);
    }

    #[tokio::test]
    async fn test_failing_row_does_not_abort_batch() {
        let list = Arc::new(MockListService::new());
        let state = test_app_state(list.clone());
        let a = create_test_account(&state, "a@example.com").await;
        let b = create_test_account(&state, "b@example.com").await;
        let filter = SubscriptionFilter::by_user_ids(vec![a.id, b.id]);
        apply_action(
            &state,
            AdminAction::Subscribe,
            &SubscriptionFilter::by_user_ids(vec![b.id]),
        )
        .await
        .unwrap();

        // a is not on the list, so unsubscribing it fails
        let outcomes = apply_action(&state, AdminAction::Unsubscribe, &filter)
            .await
            .unwrap();

        assert_eq!(outcomes[0].user_id, a.id);
        assert!(outcomes[0].error.is_some());
        assert_eq!(outcomes[0].status, SubscriptionStatus::Unknown);
        assert_eq!(outcomes[1].user_id, b.id);
        assert!(outcomes[1].error.is_none());
        assert_eq!(outcomes[1].status, SubscriptionStatus::Unsubscribed);
    }

    #[tokio::test]
    async fn test_sync_action() {
        let list = Arc::new(MockListService::new());
        let state = test_app_state(list.clone());
        let a = create_test_account(&state, "a@example.com").await;

        let outcomes = apply_action(
            &state,
            AdminAction::Sync,
            &SubscriptionFilter::by_user_ids(vec![a.id]),
        )
        .await
        .unwrap();

        assert_eq!(outcomes[0].status, SubscriptionStatus::NotSubscribed);
    }

    #[test]
    fn test_action_names() {
        let action: AdminAction = serde_json::from_str("\"force_subscribe\"").unwrap();
        assert_eq!(action, AdminAction::ForceSubscribe);
        let action: AdminAction = serde_json::from_str("\"delete_member\"").unwrap();
        assert_eq!(action, AdminAction::DeleteMember);
    }
}
