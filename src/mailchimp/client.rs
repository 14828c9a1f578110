use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::MailChimpError;
use crate::config::MailChimpConfig;

/// Merge vars attached to subscribe/update calls (`FNAME`, `GROUPINGS`, ...).
pub type MergeVars = serde_json::Map<String, Value>;

/// Caller-supplied options for `listSubscribe`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscribeOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub double_optin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_existing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace_interests: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_welcome: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_type: Option<String>,
    pub merge_vars: MergeVars,
}

/// Caller-supplied options for `listUpdateMember`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace_interests: Option<bool>,
    pub merge_vars: MergeVars,
}

/// Caller-supplied options for `listUnsubscribe`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnsubscribeOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_member: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_goodbye: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_notify: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscribeRequest {
    pub id: String,
    pub email_address: String,
    #[serde(flatten)]
    pub options: SubscribeOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateMemberRequest {
    pub id: String,
    pub email_address: String,
    #[serde(flatten)]
    pub options: UpdateOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnsubscribeRequest {
    pub id: String,
    pub email_address: String,
    #[serde(flatten)]
    pub options: UnsubscribeOptions,
}

/// The list-member and list-metadata operations of the mailing-list service.
///
/// Every method returns the raw JSON response; callers are expected to run
/// [`raise_if_error`](super::response::raise_if_error) on it.
#[async_trait]
pub trait ListClient: Send + Sync {
    /// `listMemberInfo`: `{success, errors, data: [{status, ip_opt, timestamp, merges, email_type, ..}]}`
    async fn member_info(&self, list_id: &str, email: &str) -> Result<Value, MailChimpError>;
    /// `listSubscribe`: `true` on success
    async fn subscribe(&self, request: &SubscribeRequest) -> Result<Value, MailChimpError>;
    /// `listUpdateMember`: `true` on success
    async fn update_member(&self, request: &UpdateMemberRequest) -> Result<Value, MailChimpError>;
    /// `listUnsubscribe`: `true` on success
    async fn unsubscribe(&self, request: &UnsubscribeRequest) -> Result<Value, MailChimpError>;
    /// `listInterestGroupings`: `[{name, form_field, groups: [{bit, name}]}]`
    async fn interest_groupings(&self, list_id: &str) -> Result<Value, MailChimpError>;
}

/// HTTP client for the MailChimp 1.3 JSON API.
#[derive(Clone)]
pub struct MailChimpClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
}

impl MailChimpClient {
    pub fn new(config: &MailChimpConfig) -> Result<Self, MailChimpError> {
        if config.api_key.expose_secret().is_empty() {
            return Err(MailChimpError::Configuration(
                "mailchimp.api_key must be set (APP_MAILCHIMP__API_KEY)".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint(),
            api_key: config.api_key.clone(),
        })
    }

    async fn call<P>(&self, method: &str, params: &P) -> Result<Value, MailChimpError>
    where
        P: Serialize + Sync + ?Sized,
    {
        let mut body =
            serde_json::to_value(params).map_err(|e| MailChimpError::Decode(e.to_string()))?;
        let Some(fields) = body.as_object_mut() else {
            return Err(MailChimpError::Decode(format!(
                "parameters for {method} must serialize to an object"
            )));
        };
        fields.insert(
            "apikey".to_string(),
            Value::String(self.api_key.expose_secret().to_string()),
        );

        tracing::debug!(method, endpoint = %self.endpoint, "Calling MailChimp API");
        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("method", method), ("output", "json")])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("MailChimp request {method} failed: {e}");
                e
            })?;

        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl ListClient for MailChimpClient {
    async fn member_info(&self, list_id: &str, email: &str) -> Result<Value, MailChimpError> {
        self.call(
            "listMemberInfo",
            &json!({ "id": list_id, "email_address": [email] }),
        )
        .await
    }

    async fn subscribe(&self, request: &SubscribeRequest) -> Result<Value, MailChimpError> {
        self.call("listSubscribe", request).await
    }

    async fn update_member(&self, request: &UpdateMemberRequest) -> Result<Value, MailChimpError> {
        self.call("listUpdateMember", request).await
    }

    async fn unsubscribe(&self, request: &UnsubscribeRequest) -> Result<Value, MailChimpError> {
        self.call("listUnsubscribe", request).await
    }

    async fn interest_groupings(&self, list_id: &str) -> Result<Value, MailChimpError> {
        self.call("listInterestGroupings", &json!({ "id": list_id }))
            .await
    }
}
