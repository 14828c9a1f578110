pub mod client;
pub mod error;
pub mod response;

pub use client::{ListClient, MailChimpClient};
pub use error::MailChimpError;

/// Data center used when the API key carries no `-<dc>` suffix.
pub const DEFAULT_DATA_CENTER: &str = "us1";
