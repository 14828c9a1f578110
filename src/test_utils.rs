use std::{
    collections::HashMap,
    sync::{Arc, Mutex, RwLock},
};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{
    accounts::register_account,
    database::queries::MockStore,
    mailchimp::{
        client::{
            ListClient, MergeVars, SubscribeRequest, UnsubscribeRequest, UpdateMemberRequest,
        },
        MailChimpError,
    },
    models::{Account, NewAccount},
    utils::state::AppState,
};

pub const TEST_LIST_ID: &str = "list123";

/// Error code the 1.3 API uses for "not a list member".
const NOT_A_MEMBER: i64 = 232;

#[derive(Debug, Clone, Default)]
pub struct MockMember {
    pub status: String,
    pub ip_opt: Option<String>,
    pub timestamp: Option<String>,
    pub email_type: String,
    pub merges: MergeVars,
}

/// In-memory stand-in for the mailing-list service.
///
/// Keeps member state between calls so subscribe/sync round trips behave
/// like the real list. Every received call is recorded in `calls`.
#[derive(Default)]
pub struct MockListService {
    members: RwLock<HashMap<String, MockMember>>,
    groupings: RwLock<Value>,
    canned: RwLock<Option<Value>>,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl MockListService {
    pub fn new() -> Self {
        Self {
            groupings: RwLock::new(json!([])),
            ..Default::default()
        }
    }

    pub fn with_groupings(self, groupings: Value) -> Self {
        *self.groupings.write().unwrap() = groupings;
        self
    }

    pub fn with_member(self, email: &str, member: MockMember) -> Self {
        self.members
            .write()
            .unwrap()
            .insert(email.to_string(), member);
        self
    }

    /// Makes every following call answer with `{code, error}`.
    pub fn fail_with(&self, code: i64, message: &str) {
        self.respond_with(json!({"code": code, "error": message}));
    }

    /// Makes every following call answer with `response`, leaving members as they are.
    pub fn respond_with(&self, response: Value) {
        *self.canned.write().unwrap() = Some(response);
    }

    pub fn member(&self, email: &str) -> Option<MockMember> {
        self.members.read().unwrap().get(email).cloned()
    }

    pub fn recorded_calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, method: &str, params: Value) -> Option<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params));
        self.canned.read().unwrap().clone()
    }

    fn not_a_member(email: &str) -> Value {
        json!({
            "code": NOT_A_MEMBER,
            "error": format!("{email} is not a list member")
        })
    }
}

#[async_trait]
impl ListClient for MockListService {
    async fn member_info(&self, list_id: &str, email: &str) -> Result<Value, MailChimpError> {
        if let Some(canned) = self.record(
            "listMemberInfo",
            json!({"id": list_id, "email_address": [email]}),
        ) {
            return Ok(canned);
        }

        let response = match self.member(email) {
            Some(member) => json!({
                "success": 1,
                "errors": 0,
                "data": [{
                    "email": email,
                    "status": member.status,
                    "ip_opt": member.ip_opt,
                    "timestamp": member.timestamp,
                    "email_type": member.email_type,
                    "merges": member.merges,
                }]
            }),
            None => json!({
                "success": 0,
                "errors": 1,
                "data": [{"email": email, "error": "not found", "code": NOT_A_MEMBER}]
            }),
        };
        Ok(response)
    }

    async fn subscribe(&self, request: &SubscribeRequest) -> Result<Value, MailChimpError> {
        if let Some(canned) = self.record("listSubscribe", serde_json::to_value(request).unwrap()) {
            return Ok(canned);
        }

        let options = &request.options;
        let status = if options.double_optin == Some(false) {
            "subscribed"
        } else {
            "pending"
        };
        let member = MockMember {
            status: status.to_string(),
            ip_opt: options
                .merge_vars
                .get("OPTIN_IP")
                .and_then(Value::as_str)
                .map(str::to_string),
            timestamp: options
                .merge_vars
                .get("OPTIN_TIME")
                .and_then(Value::as_str)
                .map(str::to_string),
            email_type: options.email_type.clone().unwrap_or_else(|| "html".to_string()),
            merges: options.merge_vars.clone(),
        };
        self.members
            .write()
            .unwrap()
            .insert(request.email_address.clone(), member);
        Ok(json!(true))
    }

    async fn update_member(&self, request: &UpdateMemberRequest) -> Result<Value, MailChimpError> {
        if let Some(canned) =
            self.record("listUpdateMember", serde_json::to_value(request).unwrap())
        {
            return Ok(canned);
        }

        let mut members = self.members.write().unwrap();
        let Some(member) = members.get_mut(&request.email_address) else {
            return Ok(Self::not_a_member(&request.email_address));
        };
        if let Some(email_type) = &request.options.email_type {
            member.email_type = email_type.clone();
        }
        for (key, value) in &request.options.merge_vars {
            member.merges.insert(key.clone(), value.clone());
        }
        Ok(json!(true))
    }

    async fn unsubscribe(&self, request: &UnsubscribeRequest) -> Result<Value, MailChimpError> {
        if let Some(canned) = self.record("listUnsubscribe", serde_json::to_value(request).unwrap())
        {
            return Ok(canned);
        }

        let mut members = self.members.write().unwrap();
        if !members.contains_key(&request.email_address) {
            return Ok(Self::not_a_member(&request.email_address));
        }
        if request.options.delete_member == Some(true) {
            members.remove(&request.email_address);
        } else if let Some(member) = members.get_mut(&request.email_address) {
            member.status = "unsubscribed".to_string();
        }
        Ok(json!(true))
    }

    async fn interest_groupings(&self, list_id: &str) -> Result<Value, MailChimpError> {
        if let Some(canned) = self.record("listInterestGroupings", json!({"id": list_id})) {
            return Ok(canned);
        }
        Ok(self.groupings.read().unwrap().clone())
    }
}

/// App state over an in-memory store and the given mock list.
pub fn test_app_state(list: Arc<MockListService>) -> AppState {
    AppState::new(
        Arc::new(MockStore::new()),
        list,
        Some(TEST_LIST_ID.to_string()),
    )
}

/// Registers an active "Ada Lovelace" account with its default subscription record.
pub async fn create_test_account(state: &AppState, email: &str) -> Account {
    register_account(
        state,
        NewAccount {
            email: email.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            is_active: true,
        },
    )
    .await
    .expect("Failed to create test account")
}

/// Grouping payload shaped like `listInterestGroupings`.
pub fn checkbox_grouping(name: &str, groups: &[&str]) -> Value {
    grouping(name, "checkboxes", groups)
}

pub fn grouping(name: &str, form_field: &str, groups: &[&str]) -> Value {
    let groups: Vec<Value> = groups
        .iter()
        .enumerate()
        .map(|(i, group)| json!({"bit": (1u32 << i).to_string(), "name": group}))
        .collect();
    json!({"id": 1, "name": name, "form_field": form_field, "groups": groups})
}
