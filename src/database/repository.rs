use async_trait::async_trait;

use crate::{
    database::error::RepositoryError,
    models::{
        Account, NewAccount, PendingSubscriptionRecord, SubscriptionRecord, SubscriptionStatus,
    },
};

/// Criteria for listing subscription records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionFilter {
    pub status: Option<SubscriptionStatus>,
    /// Case-insensitive substring of the account email.
    pub email_contains: Option<String>,
    pub user_ids: Option<Vec<i32>>,
}

impl SubscriptionFilter {
    pub fn by_user_ids(user_ids: Vec<i32>) -> Self {
        Self {
            user_ids: Some(user_ids),
            ..Default::default()
        }
    }

    pub fn matches(&self, record: &SubscriptionRecord) -> bool {
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(needle) = &self.email_contains {
            if !record
                .user
                .email
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        if let Some(ids) = &self.user_ids {
            if !ids.contains(&record.user.id) {
                return false;
            }
        }
        true
    }
}

/// Persistence for accounts and their (pending) subscription records.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Inserts a new account and returns it with its assigned id.
    async fn create_account(&self, account: NewAccount) -> Result<Account, RepositoryError>;
    async fn find_account(&self, user_id: i32) -> Result<Option<Account>, RepositoryError>;
    async fn active_accounts(&self) -> Result<Vec<Account>, RepositoryError>;

    async fn find_subscription(
        &self,
        user_id: i32,
    ) -> Result<Option<SubscriptionRecord>, RepositoryError>;
    /// Records ordered by user id.
    async fn find_subscriptions(
        &self,
        filter: &SubscriptionFilter,
    ) -> Result<Vec<SubscriptionRecord>, RepositoryError>;
    /// Inserts or overwrites the record keyed by its user id.
    async fn save_subscription(&self, record: &SubscriptionRecord) -> Result<(), RepositoryError>;

    async fn find_pending(
        &self,
        user_id: i32,
    ) -> Result<Option<PendingSubscriptionRecord>, RepositoryError>;
    async fn save_pending(&self, record: &PendingSubscriptionRecord)
        -> Result<(), RepositoryError>;
    async fn delete_pending(&self, user_id: i32) -> Result<bool, RepositoryError>;

    /// Loads the account's record, creating an `Unknown` one if none exists.
    async fn get_or_create_subscription(
        &self,
        user: &Account,
    ) -> Result<SubscriptionRecord, RepositoryError> {
        if let Some(record) = self.find_subscription(user.id).await? {
            return Ok(record);
        }
        tracing::info!("Creating subscription record for {}", user.email);
        let record = SubscriptionRecord::new(user.clone());
        self.save_subscription(&record).await?;
        Ok(record)
    }
}
