use serde_json::Value;

use crate::{
    mailchimp::{
        client::{MergeVars, SubscribeOptions},
        MailChimpError,
    },
    models::{Account, PendingSubscriptionRecord},
    utils::state::AppState,
};

impl PendingSubscriptionRecord {
    pub fn new(user: Account, merge_vars: Option<MergeVars>) -> Self {
        Self { user, merge_vars }
    }

    /// Sends the parked subscription to the list.
    ///
    /// Stored merge vars replace any passed in `options`. The pending record
    /// is not deleted here; callers remove it once they are done with it.
    pub async fn subscribe(
        &self,
        state: &AppState,
        mut options: SubscribeOptions,
    ) -> Result<Value, MailChimpError> {
        let mut subscription = state
            .repository
            .get_or_create_subscription(&self.user)
            .await?;

        if let Some(merge_vars) = self.merge_vars.as_ref().filter(|m| !m.is_empty()) {
            options.merge_vars = merge_vars.clone();
        }

        subscription.subscribe(state, options).await
    }
}
