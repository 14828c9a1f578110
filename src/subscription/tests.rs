use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::json;

use crate::{
    mailchimp::{
        client::{MergeVars, SubscribeOptions, UnsubscribeOptions, UpdateOptions},
        MailChimpError,
    },
    models::{PendingSubscriptionRecord, SubscriptionStatus},
    test_utils::{
        create_test_account, test_app_state, MockListService, MockMember, TEST_LIST_ID,
    },
    utils::state::AppState,
};

fn force_subscribe() -> SubscribeOptions {
    SubscribeOptions {
        double_optin: Some(false),
        ..Default::default()
    }
}

async fn record_for(state: &AppState, email: &str) -> crate::models::SubscriptionRecord {
    let account = create_test_account(state, email).await;
    state
        .repository
        .find_subscription(account.id)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_sync_unknown_member_is_not_subscribed() {
    let list = Arc::new(MockListService::new());
    let state = test_app_state(list.clone());
    let mut record = record_for(&state, "a@example.com").await;

    let data = record.sync(&state, true).await.unwrap();

    assert!(data.is_none());
    assert_eq!(record.status, SubscriptionStatus::NotSubscribed);
    let stored = state.repository.find_subscription(record.user.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SubscriptionStatus::NotSubscribed);
}

#[tokio::test]
async fn test_sync_copies_member_state() {
    let list = Arc::new(MockListService::new().with_member(
        "a@example.com",
        MockMember {
            status: "cleaned".to_string(),
            ip_opt: Some("10.0.0.1".to_string()),
            timestamp: Some("2012-01-01 10:00:00".to_string()),
            email_type: "html".to_string(),
            ..Default::default()
        },
    ));
    let state = test_app_state(list.clone());
    let mut record = record_for(&state, "a@example.com").await;

    let data = record.sync(&state, true).await.unwrap().unwrap();

    assert_eq!(data["status"], "cleaned");
    assert_eq!(record.status, SubscriptionStatus::Cleaned);
    assert_eq!(record.optin_ip.as_deref(), Some("10.0.0.1"));
    assert_eq!(
        record.optin_time,
        Some(Utc.with_ymd_and_hms(2012, 1, 1, 10, 0, 0).unwrap())
    );
}

#[tokio::test]
async fn test_sync_without_save_leaves_store_untouched() {
    let list = Arc::new(MockListService::new());
    let state = test_app_state(list.clone());
    let mut record = record_for(&state, "a@example.com").await;

    record.sync(&state, false).await.unwrap();

    assert_eq!(record.status, SubscriptionStatus::NotSubscribed);
    let stored = state.repository.find_subscription(record.user.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Unknown);
}

#[tokio::test]
async fn test_sync_raises_on_error_object() {
    let list = Arc::new(MockListService::new());
    let state = test_app_state(list.clone());
    let mut record = record_for(&state, "a@example.com").await;
    list.fail_with(104, "Invalid MailChimp API Key");

    let err = record.sync(&state, true).await.unwrap_err();

    assert_eq!(err.code(), Some(104));
    assert_eq!(record.status, SubscriptionStatus::Unknown);
}

#[tokio::test]
async fn test_force_subscribe_then_sync_is_subscribed() {
    let list = Arc::new(MockListService::new());
    let state = test_app_state(list.clone());
    let mut record = record_for(&state, "a@example.com").await;

    let response = record.subscribe(&state, force_subscribe()).await.unwrap();
    assert_eq!(response, json!(true));
    assert_eq!(record.status, SubscriptionStatus::Subscribed);
    assert!(record.is_subscribed());

    record.sync(&state, true).await.unwrap();
    assert_eq!(record.status, SubscriptionStatus::Subscribed);
}

#[tokio::test]
async fn test_double_optin_subscribe_is_pending() {
    let list = Arc::new(MockListService::new());
    let state = test_app_state(list.clone());
    let mut record = record_for(&state, "a@example.com").await;

    record
        .subscribe(&state, SubscribeOptions::default())
        .await
        .unwrap();
    assert_eq!(record.status, SubscriptionStatus::Pending);

    let mut record = record_for(&state, "b@example.com").await;
    record
        .subscribe(
            &state,
            SubscribeOptions {
                double_optin: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(record.status, SubscriptionStatus::Pending);

    record.sync(&state, true).await.unwrap();
    assert_eq!(record.status, SubscriptionStatus::Pending);
}

#[tokio::test]
async fn test_subscribe_forces_identity_fields() {
    let list = Arc::new(MockListService::new());
    let state = test_app_state(list.clone());
    let mut record = record_for(&state, "a@example.com").await;

    let mut merge_vars = MergeVars::new();
    merge_vars.insert("FNAME".to_string(), json!("Mallory"));
    merge_vars.insert("ZIP".to_string(), json!("12345"));
    record
        .subscribe(
            &state,
            SubscribeOptions {
                merge_vars,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let calls = list.recorded_calls();
    let (method, params) = calls.last().unwrap();
    assert_eq!(method, "listSubscribe");
    assert_eq!(params["id"], TEST_LIST_ID);
    assert_eq!(params["email_address"], "a@example.com");
    assert_eq!(params["merge_vars"]["FNAME"], "Ada");
    assert_eq!(params["merge_vars"]["LNAME"], "Lovelace");
    assert_eq!(params["merge_vars"]["ZIP"], "12345");
}

#[tokio::test]
async fn test_subscribe_copies_optin_merge_vars() {
    let list = Arc::new(MockListService::new());
    let state = test_app_state(list.clone());
    let mut record = record_for(&state, "a@example.com").await;

    let mut merge_vars = MergeVars::new();
    merge_vars.insert("OPTIN_IP".to_string(), json!("172.16.0.4"));
    merge_vars.insert("OPTIN_TIME".to_string(), json!("2012-03-04 05:06:07"));
    record
        .subscribe(
            &state,
            SubscribeOptions {
                double_optin: Some(false),
                merge_vars,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let stored = state.repository.find_subscription(record.user.id).await.unwrap().unwrap();
    assert_eq!(stored.optin_ip.as_deref(), Some("172.16.0.4"));
    assert_eq!(
        stored.optin_time,
        Some(Utc.with_ymd_and_hms(2012, 3, 4, 5, 6, 7).unwrap())
    );
}

#[tokio::test]
async fn test_unsubscribe_transitions() {
    let list = Arc::new(MockListService::new());
    let state = test_app_state(list.clone());

    let mut record = record_for(&state, "a@example.com").await;
    record.subscribe(&state, force_subscribe()).await.unwrap();
    record
        .unsubscribe(&state, UnsubscribeOptions::default())
        .await
        .unwrap();
    assert_eq!(record.status, SubscriptionStatus::Unsubscribed);
    record.sync(&state, true).await.unwrap();
    assert_eq!(record.status, SubscriptionStatus::Unsubscribed);

    let mut record = record_for(&state, "b@example.com").await;
    record.subscribe(&state, force_subscribe()).await.unwrap();
    record
        .unsubscribe(
            &state,
            UnsubscribeOptions {
                delete_member: Some(true),
                send_goodbye: Some(false),
                send_notify: Some(false),
            },
        )
        .await
        .unwrap();
    assert_eq!(record.status, SubscriptionStatus::NotSubscribed);
    record.sync(&state, true).await.unwrap();
    assert_eq!(record.status, SubscriptionStatus::NotSubscribed);
}

#[tokio::test]
async fn test_update_email_type_is_visible_after_sync() {
    let list = Arc::new(MockListService::new());
    let state = test_app_state(list.clone());
    let mut record = record_for(&state, "a@example.com").await;
    record.subscribe(&state, force_subscribe()).await.unwrap();

    record
        .update(
            &state,
            UpdateOptions {
                email_type: Some("text".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(record.status, SubscriptionStatus::Subscribed);

    let data = record.sync(&state, true).await.unwrap().unwrap();
    assert_eq!(data["email_type"], "text");
}

#[tokio::test]
async fn test_update_unknown_member_raises() {
    let list = Arc::new(MockListService::new());
    let state = test_app_state(list.clone());
    let record = record_for(&state, "a@example.com").await;

    let err = record
        .update(&state, UpdateOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(232));
}

#[tokio::test]
async fn test_error_response_leaves_fields_untouched() {
    let list = Arc::new(MockListService::new());
    let state = test_app_state(list.clone());
    let mut record = record_for(&state, "a@example.com").await;
    record.subscribe(&state, force_subscribe()).await.unwrap();
    let before = record.clone();
    list.fail_with(214, "already subscribed");

    let mut merge_vars = MergeVars::new();
    merge_vars.insert("OPTIN_IP".to_string(), json!("1.2.3.4"));
    let err = record
        .subscribe(
            &state,
            SubscribeOptions {
                merge_vars,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MailChimpError::Remote { code: 214, .. }));
    assert_eq!(record, before);

    let err = record
        .update(&state, UpdateOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(214));

    let err = record
        .unsubscribe(&state, UnsubscribeOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(214));
    assert_eq!(record, before);

    let stored = state.repository.find_subscription(record.user.id).await.unwrap().unwrap();
    assert_eq!(stored, before);
}

#[tokio::test]
async fn test_falsy_response_leaves_record_unsaved() {
    let list = Arc::new(MockListService::new());
    let state = test_app_state(list.clone());
    let mut record = record_for(&state, "a@example.com").await;
    let before = record.clone();
    list.respond_with(json!(false));

    let mut merge_vars = MergeVars::new();
    merge_vars.insert("OPTIN_IP".to_string(), json!("1.2.3.4"));
    let response = record
        .subscribe(
            &state,
            SubscribeOptions {
                double_optin: Some(false),
                merge_vars,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(response, json!(false));
    assert_eq!(record, before);

    let response = record
        .unsubscribe(
            &state,
            UnsubscribeOptions {
                delete_member: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(response, json!(false));
    assert_eq!(record.status, SubscriptionStatus::Unknown);
    assert!(record.optin_ip.is_none());

    let stored = state.repository.find_subscription(record.user.id).await.unwrap().unwrap();
    assert_eq!(stored, before);
}

#[tokio::test]
async fn test_missing_list_id_fails_before_remote_call() {
    let list = Arc::new(MockListService::new());
    let mut state = test_app_state(list.clone());
    let mut record = record_for(&state, "a@example.com").await;
    state.list_id = None;

    assert!(matches!(
        record.subscribe(&state, force_subscribe()).await,
        Err(MailChimpError::Configuration(_))
    ));
    assert!(matches!(
        record.sync(&state, true).await,
        Err(MailChimpError::Configuration(_))
    ));
    assert!(list.recorded_calls().is_empty());
}

#[tokio::test]
async fn test_pending_subscribe_uses_stored_merge_vars() {
    let list = Arc::new(MockListService::new());
    let state = test_app_state(list.clone());
    let account = create_test_account(&state, "a@example.com").await;

    let mut stored = MergeVars::new();
    stored.insert("OPTIN_IP".to_string(), json!("10.1.1.1"));
    let pending = PendingSubscriptionRecord::new(account.clone(), Some(stored));
    state.repository.save_pending(&pending).await.unwrap();

    let mut ignored = MergeVars::new();
    ignored.insert("ZIP".to_string(), json!("99999"));
    pending
        .subscribe(
            &state,
            SubscribeOptions {
                double_optin: Some(false),
                merge_vars: ignored,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let record = state.repository.find_subscription(account.id).await.unwrap().unwrap();
    assert_eq!(record.status, SubscriptionStatus::Subscribed);
    assert_eq!(record.optin_ip.as_deref(), Some("10.1.1.1"));

    let member = list.member("a@example.com").unwrap();
    assert!(member.merges.get("ZIP").is_none());
    assert_eq!(member.merges["FNAME"], "Ada");

    // the caller owns the cleanup
    assert!(state.repository.find_pending(account.id).await.unwrap().is_some());
    assert!(state.repository.delete_pending(account.id).await.unwrap());
}

#[tokio::test]
async fn test_pending_subscribe_creates_missing_record() {
    let list = Arc::new(MockListService::new());
    let state = test_app_state(list.clone());
    let account = crate::models::Account {
        id: 42,
        email: "late@example.com".to_string(),
        first_name: "Late".to_string(),
        last_name: "Comer".to_string(),
        is_active: true,
    };
    let pending = PendingSubscriptionRecord::new(account.clone(), None);

    pending
        .subscribe(&state, SubscribeOptions::default())
        .await
        .unwrap();

    let record = state.repository.find_subscription(42).await.unwrap().unwrap();
    assert_eq!(record.status, SubscriptionStatus::Pending);
    assert_eq!(record.user, account);
}
