use serde_json::Value;

use super::status::{apply_member_info, parse_timestamp};
use crate::{
    mailchimp::{
        client::{
            MergeVars, SubscribeOptions, SubscribeRequest, UnsubscribeOptions,
            UnsubscribeRequest, UpdateMemberRequest, UpdateOptions,
        },
        response::{is_truthy, raise_if_error},
        MailChimpError,
    },
    models::{SubscriptionRecord, SubscriptionStatus},
    utils::state::AppState,
};

impl SubscriptionRecord {
    pub fn is_subscribed(&self) -> bool {
        self.status == SubscriptionStatus::Subscribed
    }

    /// Refreshes status and optin fields from `listMemberInfo`.
    ///
    /// Returns the member data, or `None` when the address is not on the list.
    /// The record is persisted only when `save` is set.
    pub async fn sync(
        &mut self,
        state: &AppState,
        save: bool,
    ) -> Result<Option<Value>, MailChimpError> {
        let list_id = state.list_id()?;
        let response = state
            .list_client
            .member_info(list_id, &self.user.email)
            .await?;
        raise_if_error(&response)?;

        let data = apply_member_info(self, &response)?;
        tracing::info!("Synced {}: {}", self.user.email, self.status);

        if save {
            state.repository.save_subscription(self).await?;
        }
        Ok(data)
    }

    /// Wraps `listSubscribe` for this user.
    ///
    /// `email_address`, the list id and the `FNAME`/`LNAME` merge vars are
    /// always taken from the account. The status becomes `Subscribed` when
    /// `double_optin` is explicitly `false`, `Pending` otherwise.
    pub async fn subscribe(
        &mut self,
        state: &AppState,
        mut options: SubscribeOptions,
    ) -> Result<Value, MailChimpError> {
        let list_id = state.list_id()?.to_string();
        self.insert_name_merge_vars(&mut options.merge_vars);
        let request = SubscribeRequest {
            id: list_id,
            email_address: self.user.email.clone(),
            options,
        };

        let response = state.list_client.subscribe(&request).await?;
        raise_if_error(&response)?;

        if is_truthy(&response) {
            let merge_vars = &request.options.merge_vars;
            if let Some(ip) = merge_vars.get("OPTIN_IP") {
                self.optin_ip = ip_from_merge_var(ip);
            }
            if let Some(time) = merge_vars.get("OPTIN_TIME") {
                self.optin_time = match time {
                    Value::Null => None,
                    Value::String(s) => match parse_timestamp(s) {
                        Some(time) => Some(time),
                        None => {
                            tracing::warn!("Ignoring unparseable OPTIN_TIME {s:?}");
                            self.optin_time
                        }
                    },
                    other => {
                        tracing::warn!("Ignoring non-string OPTIN_TIME {other}");
                        self.optin_time
                    }
                };
            }

            self.status = if request.options.double_optin == Some(false) {
                SubscriptionStatus::Subscribed
            } else {
                SubscriptionStatus::Pending
            };
            tracing::info!("Subscribed {}: {}", self.user.email, self.status);
            state.repository.save_subscription(self).await?;
        }

        Ok(response)
    }

    /// Wraps `listUpdateMember`; the local record is left as is.
    pub async fn update(
        &self,
        state: &AppState,
        mut options: UpdateOptions,
    ) -> Result<Value, MailChimpError> {
        let list_id = state.list_id()?.to_string();
        self.insert_name_merge_vars(&mut options.merge_vars);
        let request = UpdateMemberRequest {
            id: list_id,
            email_address: self.user.email.clone(),
            options,
        };

        let response = state.list_client.update_member(&request).await?;
        raise_if_error(&response)?;
        tracing::info!("Updated list member {}", self.user.email);
        Ok(response)
    }

    /// Wraps `listUnsubscribe`; `delete_member` leaves the record `NotSubscribed`.
    pub async fn unsubscribe(
        &mut self,
        state: &AppState,
        options: UnsubscribeOptions,
    ) -> Result<Value, MailChimpError> {
        let list_id = state.list_id()?.to_string();
        let request = UnsubscribeRequest {
            id: list_id,
            email_address: self.user.email.clone(),
            options,
        };

        let response = state.list_client.unsubscribe(&request).await?;
        raise_if_error(&response)?;

        if is_truthy(&response) {
            self.status = if request.options.delete_member == Some(true) {
                SubscriptionStatus::NotSubscribed
            } else {
                SubscriptionStatus::Unsubscribed
            };
            tracing::info!("Unsubscribed {}: {}", self.user.email, self.status);
            state.repository.save_subscription(self).await?;
        }

        Ok(response)
    }

    fn insert_name_merge_vars(&self, merge_vars: &mut MergeVars) {
        merge_vars.insert(
            "FNAME".to_string(),
            Value::String(self.user.first_name.clone()),
        );
        merge_vars.insert(
            "LNAME".to_string(),
            Value::String(self.user.last_name.clone()),
        );
    }
}

fn ip_from_merge_var(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
