use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc, RwLock,
    },
};

use async_trait::async_trait;
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr, OnConflict},
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

use super::{
    error::RepositoryError,
    repository::{SubscriptionFilter, SubscriptionRepository},
};
use crate::{
    models::{
        pending_user_subscriptions, user_subscriptions, users, Account, NewAccount,
        PendingSubscriptionRecord, SubscriptionRecord,
    },
    subscription::merge_vars,
};

/// Postgres-backed repository.
#[derive(Clone)]
pub struct SeaOrmStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubscriptionRepository for SeaOrmStore {
    async fn create_account(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let user = users::ActiveModel::from(account)
            .insert(&*self.db)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert account: {e:?}");
                RepositoryError::StoreError
            })?;
        Ok(Account::from(user))
    }

    async fn find_account(&self, user_id: i32) -> Result<Option<Account>, RepositoryError> {
        let user = users::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch account {user_id}: {e:?}");
                RepositoryError::FetchError
            })?;
        Ok(user.map(Account::from))
    }

    async fn active_accounts(&self) -> Result<Vec<Account>, RepositoryError> {
        let users = users::Entity::find()
            .filter(users::Column::IsActive.eq(true))
            .order_by_asc(users::Column::Id)
            .all(&*self.db)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch active accounts: {e:?}");
                RepositoryError::FetchError
            })?;
        Ok(users.into_iter().map(Account::from).collect())
    }

    async fn find_subscription(
        &self,
        user_id: i32,
    ) -> Result<Option<SubscriptionRecord>, RepositoryError> {
        let Some(model) = user_subscriptions::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch subscription {user_id}: {e:?}");
                RepositoryError::FetchError
            })?
        else {
            return Ok(None);
        };

        let Some(user) = self.find_account(user_id).await? else {
            return Ok(None);
        };
        Ok(Some(SubscriptionRecord::from_model(model, user)))
    }

    async fn find_subscriptions(
        &self,
        filter: &SubscriptionFilter,
    ) -> Result<Vec<SubscriptionRecord>, RepositoryError> {
        let mut query = user_subscriptions::Entity::find().find_also_related(users::Entity);

        if let Some(status) = filter.status {
            query = query.filter(user_subscriptions::Column::Status.eq(status));
        }
        if let Some(needle) = &filter.email_contains {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col((users::Entity, users::Column::Email))))
                    .like(LikeExpr::new(contains_pattern(needle)).escape('\\')),
            );
        }
        if let Some(ids) = &filter.user_ids {
            query = query.filter(user_subscriptions::Column::UserId.is_in(ids.clone()));
        }

        let rows = query
            .order_by_asc(user_subscriptions::Column::UserId)
            .all(&*self.db)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list subscriptions: {e:?}");
                RepositoryError::FetchError
            })?;

        Ok(rows
            .into_iter()
            .filter_map(|(model, user)| {
                user.map(|user| SubscriptionRecord::from_model(model, user.into()))
            })
            .collect())
    }

    async fn save_subscription(&self, record: &SubscriptionRecord) -> Result<(), RepositoryError> {
        user_subscriptions::Entity::insert(user_subscriptions::ActiveModel::from(record))
            .on_conflict(
                OnConflict::column(user_subscriptions::Column::UserId)
                    .update_columns([
                        user_subscriptions::Column::Status,
                        user_subscriptions::Column::OptinTime,
                        user_subscriptions::Column::OptinIp,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await
            .map_err(|e| {
                tracing::error!("Failed to save subscription for {}: {e:?}", record.user.email);
                RepositoryError::UpdateError
            })?;
        Ok(())
    }

    async fn find_pending(
        &self,
        user_id: i32,
    ) -> Result<Option<PendingSubscriptionRecord>, RepositoryError> {
        let Some(model) = pending_user_subscriptions::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch pending subscription {user_id}: {e:?}");
                RepositoryError::FetchError
            })?
        else {
            return Ok(None);
        };

        let Some(user) = self.find_account(user_id).await? else {
            return Ok(None);
        };
        let merge_vars = model
            .merge_vars
            .as_deref()
            .map(merge_vars::load)
            .transpose()?;

        Ok(Some(PendingSubscriptionRecord { user, merge_vars }))
    }

    async fn save_pending(
        &self,
        record: &PendingSubscriptionRecord,
    ) -> Result<(), RepositoryError> {
        let encoded = record
            .merge_vars
            .as_ref()
            .map(merge_vars::store)
            .transpose()?;
        let model = pending_user_subscriptions::ActiveModel {
            user_id: sea_orm::ActiveValue::Set(record.user.id),
            merge_vars: sea_orm::ActiveValue::Set(encoded),
        };

        pending_user_subscriptions::Entity::insert(model)
            .on_conflict(
                OnConflict::column(pending_user_subscriptions::Column::UserId)
                    .update_column(pending_user_subscriptions::Column::MergeVars)
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await
            .map_err(|e| {
                tracing::error!("Failed to save pending subscription: {e:?}");
                RepositoryError::StoreError
            })?;
        Ok(())
    }

    async fn delete_pending(&self, user_id: i32) -> Result<bool, RepositoryError> {
        let result = pending_user_subscriptions::Entity::delete_by_id(user_id)
            .exec(&*self.db)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete pending subscription {user_id}: {e:?}");
                RepositoryError::DeleteError
            })?;
        Ok(result.rows_affected > 0)
    }
}

/// Case-insensitive `LIKE` pattern matching `needle` literally anywhere.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// In-memory repository used by tests and local tooling.
#[derive(Default)]
pub struct MockStore {
    next_id: AtomicI32,
    accounts: RwLock<HashMap<i32, Account>>,
    subscriptions: RwLock<HashMap<i32, SubscriptionRecord>>,
    pending: RwLock<HashMap<i32, PendingSubscriptionRecord>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionRepository for MockStore {
    async fn create_account(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let account = Account {
            id,
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
            is_active: account.is_active,
        };
        self.accounts
            .write()
            .unwrap()
            .insert(id, account.clone());
        Ok(account)
    }

    async fn find_account(&self, user_id: i32) -> Result<Option<Account>, RepositoryError> {
        Ok(self.accounts.read().unwrap().get(&user_id).cloned())
    }

    async fn active_accounts(&self) -> Result<Vec<Account>, RepositoryError> {
        let mut accounts: Vec<_> = self
            .accounts
            .read()
            .unwrap()
            .values()
            .filter(|a| a.is_active)
            .cloned()
            .collect();
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }

    async fn find_subscription(
        &self,
        user_id: i32,
    ) -> Result<Option<SubscriptionRecord>, RepositoryError> {
        Ok(self.subscriptions.read().unwrap().get(&user_id).cloned())
    }

    async fn find_subscriptions(
        &self,
        filter: &SubscriptionFilter,
    ) -> Result<Vec<SubscriptionRecord>, RepositoryError> {
        let mut records: Vec<_> = self
            .subscriptions
            .read()
            .unwrap()
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.user.id);
        Ok(records)
    }

    async fn save_subscription(&self, record: &SubscriptionRecord) -> Result<(), RepositoryError> {
        self.subscriptions
            .write()
            .unwrap()
            .insert(record.user.id, record.clone());
        Ok(())
    }

    async fn find_pending(
        &self,
        user_id: i32,
    ) -> Result<Option<PendingSubscriptionRecord>, RepositoryError> {
        Ok(self.pending.read().unwrap().get(&user_id).cloned())
    }

    async fn save_pending(
        &self,
        record: &PendingSubscriptionRecord,
    ) -> Result<(), RepositoryError> {
        self.pending
            .write()
            .unwrap()
            .insert(record.user.id, record.clone());
        Ok(())
    }

    async fn delete_pending(&self, user_id: i32) -> Result<bool, RepositoryError> {
        Ok(self.pending.write().unwrap().remove(&user_id).is_some())
    }
}
