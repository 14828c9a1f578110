//! Account registration.

use crate::{
    database::error::RepositoryError,
    models::{Account, NewAccount, SubscriptionRecord},
    utils::state::AppState,
};

/// Creates the account and then its default `Unknown` subscription record.
///
/// Every account creation path goes through here so that no account
/// exists without a subscription record.
pub async fn register_account(
    state: &AppState,
    account: NewAccount,
) -> Result<Account, RepositoryError> {
    let account = state.repository.create_account(account).await?;
    state
        .repository
        .save_subscription(&SubscriptionRecord::new(account.clone()))
        .await?;

    tracing::info!("Registered account {} ({})", account.id, account.email);
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::SubscriptionStatus,
        test_utils::{test_app_state, MockListService},
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn test_register_creates_unknown_subscription() {
        let list = Arc::new(MockListService::new());
        let state = test_app_state(list.clone());

        let account = register_account(
            &state,
            NewAccount {
                email: "a@example.com".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                is_active: true,
            },
        )
        .await
        .unwrap();

        let record = state
            .repository
            .find_subscription(account.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, SubscriptionStatus::Unknown);
        assert!(record.optin_time.is_none());
        assert!(record.optin_ip.is_none());
        assert_eq!(record.user, account);
        // registration never touches the list
        assert!(list.recorded_calls().is_empty());
    }
}
