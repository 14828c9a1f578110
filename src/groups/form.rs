use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_string_from_number;
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    config::require_list_id,
    mailchimp::{
        client::{ListClient, MergeVars},
        response::{is_truthy, raise_if_error},
        MailChimpError,
    },
    utils::state::AppState,
};

/// Key prefix of the per-group boolean fields; the group bit follows.
pub const CHECKBOX_FIELD_PREFIX: &str = "mailchimp_group_";
/// Key of the single choice field used for radio and dropdown groupings.
pub const CHOICE_FIELD_NAME: &str = "mailchimp_group";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormFieldKind {
    Checkboxes,
    Radio,
    Dropdown,
    Hidden,
    /// Any kind this crate does not know about; rendered as a dropdown.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(deserialize_with = "deserialize_string_from_number")]
    pub bit: String,
    pub name: String,
}

/// One entry of `listInterestGroupings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grouping {
    pub name: String,
    pub form_field: FormFieldKind,
    #[serde(default)]
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChoiceWidget {
    Radio,
    Select,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Boolean {
        initial: bool,
    },
    Choice {
        widget: ChoiceWidget,
        choices: Vec<Choice>,
        initial: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// Value for the `GROUPINGS` merge var.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingMergeValue {
    pub name: String,
    pub groups: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanedGroups {
    pub selected_groups: Vec<String>,
    pub grouping_merge_value: GroupingMergeValue,
}

impl CleanedGroups {
    /// Sets the `GROUPINGS` merge var for a subscribe or update call.
    pub fn apply_to(&self, merge_vars: &mut MergeVars) {
        merge_vars.insert(
            "GROUPINGS".to_string(),
            json!([{
                "name": self.grouping_merge_value.name,
                "groups": self.grouping_merge_value.groups,
            }]),
        );
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("field '{0}' is required")]
    Required(String),
    #[error("'{0}' is not one of the available choices")]
    InvalidChoice(String),
}

/// Form schema for one grouping, with initial values for a member if requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupsForm {
    pub grouping: Grouping,
    pub fields: Vec<FormField>,
}

impl GroupsForm {
    /// Builds the field set for `grouping`.
    ///
    /// `membership` is the member's comma-joined group string; a group counts
    /// as selected when its name occurs anywhere in it.
    pub fn new(grouping: Grouping, membership: Option<&str>) -> Self {
        let is_member = |name: &str| membership.is_some_and(|m| m.contains(name));

        let fields = match grouping.form_field {
            FormFieldKind::Checkboxes => grouping
                .groups
                .iter()
                .map(|group| FormField {
                    name: format!("{CHECKBOX_FIELD_PREFIX}{}", group.bit),
                    label: group.name.clone(),
                    kind: FieldKind::Boolean {
                        initial: is_member(&group.name),
                    },
                })
                .collect(),
            kind => {
                let widget = if kind == FormFieldKind::Radio {
                    ChoiceWidget::Radio
                } else {
                    ChoiceWidget::Select
                };
                let choices = grouping
                    .groups
                    .iter()
                    .map(|group| Choice {
                        value: group.bit.clone(),
                        label: group.name.clone(),
                    })
                    .collect();
                let initial = grouping
                    .groups
                    .iter()
                    .find(|group| is_member(&group.name))
                    .map(|group| group.bit.clone());

                vec![FormField {
                    name: CHOICE_FIELD_NAME.to_string(),
                    label: grouping.name.clone(),
                    kind: FieldKind::Choice {
                        widget,
                        choices,
                        initial,
                    },
                }]
            }
        };

        Self { grouping, fields }
    }

    /// Validates submitted form data.
    ///
    /// Checkbox fields count as checked for `on`, `true`, `1` or `yes`.
    pub fn clean(&self, data: &HashMap<String, String>) -> Result<CleanedGroups, FormError> {
        let mut selected_groups = Vec::new();

        for field in &self.fields {
            match &field.kind {
                FieldKind::Boolean { .. } => {
                    if data.get(&field.name).is_some_and(|v| is_checked(v)) {
                        selected_groups.push(field.label.clone());
                    }
                }
                FieldKind::Choice { choices, .. } => {
                    let value = data
                        .get(&field.name)
                        .map(|v| v.trim())
                        .filter(|v| !v.is_empty())
                        .ok_or_else(|| FormError::Required(field.name.clone()))?;
                    let choice = choices
                        .iter()
                        .find(|c| c.value == value)
                        .ok_or_else(|| FormError::InvalidChoice(value.to_string()))?;
                    selected_groups.push(choice.label.clone());
                }
            }
        }

        let groups = selected_groups
            .iter()
            .map(|group| group.replace(',', "\\,"))
            .collect::<Vec<_>>()
            .join(",");

        Ok(CleanedGroups {
            selected_groups,
            grouping_merge_value: GroupingMergeValue {
                name: self.grouping.name.clone(),
                groups,
            },
        })
    }
}

fn is_checked(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "on" | "true" | "1" | "yes"
    )
}

/// Builds the form for `grouping_name` (or the list's first grouping).
///
/// When `email` is given the member's current groups become the initial
/// values; an address that is not on the list is an error.
pub async fn groups_form(
    client: &dyn ListClient,
    list_id: &str,
    email: Option<&str>,
    grouping_name: Option<&str>,
) -> Result<GroupsForm, MailChimpError> {
    let response = client.interest_groupings(list_id).await?;
    raise_if_error(&response)?;
    let groupings: Vec<Grouping> = serde_json::from_value(response)
        .map_err(|e| MailChimpError::Decode(format!("interest groupings: {e}")))?;

    let grouping = match grouping_name {
        Some(name) => groupings.into_iter().find(|g| g.name == name),
        None => groupings.into_iter().next(),
    }
    .ok_or_else(|| MailChimpError::GroupingNotFound(grouping_name.unwrap_or_default().to_string()))?;

    let membership = match email {
        Some(email) => Some(member_groups(client, list_id, email, &grouping.name).await?),
        None => None,
    };

    tracing::debug!(
        grouping = %grouping.name,
        groups = grouping.groups.len(),
        "Built interest group form"
    );
    Ok(GroupsForm::new(grouping, membership.as_deref()))
}

/// [`groups_form`] against the state's client, defaulting to the configured list.
pub async fn groups_form_for(
    state: &AppState,
    email: Option<&str>,
    grouping_name: Option<&str>,
    list_id: Option<&str>,
) -> Result<GroupsForm, MailChimpError> {
    let list_id = match list_id.filter(|id| !id.is_empty()) {
        Some(list_id) => list_id,
        None => require_list_id(state.list_id.as_deref())?,
    };
    groups_form(state.list_client.as_ref(), list_id, email, grouping_name).await
}

/// The member's group string for `grouping_name`, empty when not in any.
async fn member_groups(
    client: &dyn ListClient,
    list_id: &str,
    email: &str,
    grouping_name: &str,
) -> Result<String, MailChimpError> {
    let response = client.member_info(list_id, email).await?;
    raise_if_error(&response)?;
    if !response.get("success").is_some_and(is_truthy) {
        return Err(MailChimpError::EmailNotFound(email.to_string()));
    }

    let groups = response
        .pointer("/data/0/merges/GROUPINGS")
        .and_then(Value::as_array)
        .and_then(|groupings| {
            groupings
                .iter()
                .find(|g| g.get("name").and_then(Value::as_str) == Some(grouping_name))
        })
        .and_then(|g| g.get("groups"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    Ok(groups.to_string())
}
