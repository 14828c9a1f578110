use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

use crate::mailchimp::client::MergeVars;

/// Local mirror of a member's state on the mailing list.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    #[sea_orm(num_value = 0)]
    Unknown,
    #[sea_orm(num_value = 1)]
    NotSubscribed,
    #[sea_orm(num_value = 2)]
    Unsubscribed,
    #[sea_orm(num_value = 3)]
    Subscribed,
    #[sea_orm(num_value = 4)]
    Pending,
    #[sea_orm(num_value = 5)]
    Cleaned,
}

impl SubscriptionStatus {
    /// Human readable name, as shown in listings and the sync command.
    pub fn display_name(&self) -> &'static str {
        match self {
            SubscriptionStatus::Unknown => "Unknown",
            SubscriptionStatus::NotSubscribed => "Not Subscribed",
            SubscriptionStatus::Unsubscribed => "Unsubscribed",
            SubscriptionStatus::Subscribed => "Subscribed",
            SubscriptionStatus::Pending => "Pending",
            SubscriptionStatus::Cleaned => "Cleaned",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unknown" => Ok(SubscriptionStatus::Unknown),
            "not_subscribed" | "not subscribed" => Ok(SubscriptionStatus::NotSubscribed),
            "unsubscribed" => Ok(SubscriptionStatus::Unsubscribed),
            "subscribed" => Ok(SubscriptionStatus::Subscribed),
            "pending" => Ok(SubscriptionStatus::Pending),
            "cleaned" => Ok(SubscriptionStatus::Cleaned),
            _ => Err(format!("Unknown subscription status: {s}")),
        }
    }
}

// SeaORM Entities
pub mod users {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub email: String,
        pub first_name: String,
        pub last_name: String,
        pub is_active: bool,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod user_subscriptions {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "mailchimp_user_subscription")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub user_id: i32,
        pub status: SubscriptionStatus,
        pub optin_time: Option<DateTimeUtc>,
        pub optin_ip: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::users::Entity",
            from = "Column::UserId",
            to = "super::users::Column::Id",
            on_delete = "Cascade"
        )]
        User,
    }

    impl Related<super::users::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::User.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod pending_user_subscriptions {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "mailchimp_pending_user_subscription")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub user_id: i32,
        #[sea_orm(column_type = "Text", nullable)]
        pub merge_vars: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::users::Entity",
            from = "Column::UserId",
            to = "super::users::Column::Id",
            on_delete = "Cascade"
        )]
        User,
    }

    impl Related<super::users::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::User.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// A local user account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
}

/// Data needed to register a new account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl From<users::Model> for Account {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            is_active: model.is_active,
        }
    }
}

impl From<NewAccount> for users::ActiveModel {
    fn from(account: NewAccount) -> Self {
        Self {
            id: Default::default(),
            email: Set(account.email),
            first_name: Set(account.first_name),
            last_name: Set(account.last_name),
            is_active: Set(account.is_active),
        }
    }
}

/// A user's subscription state, with the owning account loaded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub user: Account,
    pub status: SubscriptionStatus,
    pub optin_time: Option<DateTime<Utc>>,
    pub optin_ip: Option<String>,
}

impl SubscriptionRecord {
    /// A fresh record in the `Unknown` state.
    pub fn new(user: Account) -> Self {
        Self {
            user,
            status: SubscriptionStatus::Unknown,
            optin_time: None,
            optin_ip: None,
        }
    }

    pub fn from_model(model: user_subscriptions::Model, user: Account) -> Self {
        Self {
            user,
            status: model.status,
            optin_time: model.optin_time,
            optin_ip: model.optin_ip,
        }
    }
}

impl From<&SubscriptionRecord> for user_subscriptions::ActiveModel {
    fn from(record: &SubscriptionRecord) -> Self {
        Self {
            user_id: Set(record.user.id),
            status: Set(record.status),
            optin_time: Set(record.optin_time),
            optin_ip: Set(record.optin_ip.clone()),
        }
    }
}

/// Merge vars parked for an account until it is activated locally.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingSubscriptionRecord {
    pub user: Account,
    pub merge_vars: Option<MergeVars>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_names() {
        assert_eq!(SubscriptionStatus::NotSubscribed.to_string(), "Not Subscribed");
        assert_eq!(SubscriptionStatus::default(), SubscriptionStatus::Unknown);
    }

    #[test]
    fn test_status_parses_display_names() {
        for status in [
            SubscriptionStatus::Unknown,
            SubscriptionStatus::NotSubscribed,
            SubscriptionStatus::Unsubscribed,
            SubscriptionStatus::Subscribed,
            SubscriptionStatus::Pending,
            SubscriptionStatus::Cleaned,
        ] {
            assert_eq!(status.to_string().parse::<SubscriptionStatus>(), Ok(status));
        }
        assert_eq!(
            "not_subscribed".parse::<SubscriptionStatus>(),
            Ok(SubscriptionStatus::NotSubscribed)
        );
        assert!("sleeping".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(
            "not_subscribed".parse::<SubscriptionStatus>().unwrap(),
            SubscriptionStatus::NotSubscribed
        );
        assert_eq!(
            "Cleaned".parse::<SubscriptionStatus>().unwrap(),
            SubscriptionStatus::Cleaned
        );
        assert!("bogus".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn test_status_numeric_values() {
        use sea_orm::ActiveEnum;
        assert_eq!(SubscriptionStatus::Unknown.to_value(), 0);
        assert_eq!(SubscriptionStatus::Cleaned.to_value(), 5);
        assert_eq!(
            SubscriptionStatus::try_from_value(&3).unwrap(),
            SubscriptionStatus::Subscribed
        );
    }
}
