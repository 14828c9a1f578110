//! Interest-group selection forms built from the list's grouping metadata.

mod form;

pub use form::{
    groups_form, groups_form_for, Choice, ChoiceWidget, CleanedGroups, FieldKind, FormError,
    FormField, FormFieldKind, Group, Grouping, GroupingMergeValue, GroupsForm,
    CHECKBOX_FIELD_PREFIX, CHOICE_FIELD_NAME,
};
