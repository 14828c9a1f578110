pub mod accounts;
pub mod admin;
pub mod commands;
pub mod config;
pub mod database;
pub mod groups;
pub mod mailchimp;
pub mod models;
pub mod startup;
pub mod subscription;
pub mod test_utils;
pub mod utils;
pub mod web;
