use std::sync::Arc;

use color_eyre::eyre::Context;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use secrecy::ExposeSecret;

use crate::{
    config::{require_list_id, Config},
    database::{queries::SeaOrmStore, repository::SubscriptionRepository},
    mailchimp::{ListClient, MailChimpClient, MailChimpError},
};

/// Shared handles passed to every operation that talks to the list or the database.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn SubscriptionRepository>,
    pub list_client: Arc<dyn ListClient>,
    pub list_id: Option<String>,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        list_client: Arc<dyn ListClient>,
        list_id: Option<String>,
    ) -> Self {
        Self {
            repository,
            list_client,
            list_id,
        }
    }

    /// The configured list id; fails before any remote call when unset.
    pub fn list_id(&self) -> Result<&str, MailChimpError> {
        require_list_id(self.list_id.as_deref())
    }
}

pub async fn setup(config: &Config) -> color_eyre::Result<AppState> {
    let db: DatabaseConnection = Database::connect(config.database.url.expose_secret())
        .await
        .wrap_err("Failed to connect to database")?;

    crate::database::Migrator::up(&db, None)
        .await
        .wrap_err("Failed to apply migrations")?;

    let client =
        MailChimpClient::new(&config.mailchimp).wrap_err("Failed to build MailChimp client")?;
    let list_id = match config.mailchimp.list_id() {
        Ok(id) => Some(id.to_string()),
        Err(err) => {
            tracing::warn!("{err}; list operations will fail");
            None
        }
    };

    Ok(AppState::new(
        Arc::new(SeaOrmStore::new(Arc::new(db))),
        Arc::new(client),
        list_id,
    ))
}
