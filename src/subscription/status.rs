//! Maps `listMemberInfo` responses onto the local subscription fields.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::{
    mailchimp::{
        response::{is_truthy, truthy_str},
        MailChimpError,
    },
    models::{SubscriptionRecord, SubscriptionStatus},
};

/// Timestamp layout used by the 1.3 API.
const REMOTE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Exact-match mapping of the remote member status.
pub fn status_from_remote(status: Option<&str>) -> SubscriptionStatus {
    match status {
        Some("unsubscribed") => SubscriptionStatus::Unsubscribed,
        Some("pending") => SubscriptionStatus::Pending,
        Some("cleaned") => SubscriptionStatus::Cleaned,
        Some("subscribed") => SubscriptionStatus::Subscribed,
        _ => SubscriptionStatus::Unknown,
    }
}

/// Parses `2012-01-01 10:00:00` (taken as UTC) or an RFC 3339 timestamp.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), REMOTE_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(value.trim()).map(|dt| dt.with_timezone(&Utc)))
        .ok()
}

/// Applies a member lookup to `record` and returns the member data, if any.
///
/// A lookup without `success` marks the record `NotSubscribed` and clears
/// the optin fields. Otherwise optin IP and time are only overwritten by
/// truthy remote values.
pub fn apply_member_info(
    record: &mut SubscriptionRecord,
    response: &Value,
) -> Result<Option<Value>, MailChimpError> {
    let found = response.get("success").is_some_and(is_truthy);
    if !found {
        record.status = SubscriptionStatus::NotSubscribed;
        record.optin_time = None;
        record.optin_ip = None;
        return Ok(None);
    }

    let data = response
        .get("data")
        .and_then(|d| d.get(0))
        .cloned()
        .ok_or_else(|| MailChimpError::Decode("member info without data".to_string()))?;

    record.status = status_from_remote(data.get("status").and_then(Value::as_str));

    if let Some(ip) = truthy_str(&data, "ip_opt") {
        record.optin_ip = Some(ip.to_string());
    }
    if let Some(timestamp) = truthy_str(&data, "timestamp") {
        match parse_timestamp(timestamp) {
            Some(time) => record.optin_time = Some(time),
            None => tracing::warn!(
                "Ignoring unparseable timestamp {timestamp:?} for {}",
                record.user.email
            ),
        }
    }

    Ok(Some(data))
}
