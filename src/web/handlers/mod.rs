pub mod groups;
pub mod subscriptions;

pub use groups::{get_groups_form, submit_groups_form};
pub use subscriptions::{list_subscriptions, run_action};
