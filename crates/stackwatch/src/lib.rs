//! Stackwatch tells visitors which page builder powers a website, watches
//! websites for changes and mails alerts.
//!
//! # Features
//!
//! - Anonymous identity: every visitor gets a signed token cookie
//! - Ban gating on IP and user, backed by an external KV store
//! - Company detection (Webflow, Wix, WordPress and friends)
//! - Website watches with change alerts and reminders
//! - Moderation API: bans, moderator promotion, dashboard, broadcast email

// Re-export shared types and adapter traits from stackwatch-types
pub use stackwatch_types::error;
pub use stackwatch_types::kv_adapter;
pub use stackwatch_types::mail_adapter;
pub use stackwatch_types::meta_adapter;
pub use stackwatch_types::types;
pub use stackwatch_types::utils;

// Feature crate re-exports
pub use stackwatch_admin as admin;
pub use stackwatch_auth as auth;
pub use stackwatch_detect as detect;
pub use stackwatch_email as email;
pub use stackwatch_watch as watch;

// Local modules
pub mod app;
pub mod pages;
pub mod prelude;
pub mod routes;
pub mod webserver;

pub use crate::app::{App, AppBuilder};

// vim: ts=4
