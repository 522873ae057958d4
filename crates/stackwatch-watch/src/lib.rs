//! Website watches
//!
//! A visitor registers URLs to watch together with an email address. The cron
//! routes fetch every watched page, compare a SHA-256 of the body with the
//! previous check and mail an alert on change. A second cron route sends each
//! address a reminder listing its watches.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod check;
pub mod cron;
pub mod handler;

mod prelude;

/// Watches one visitor may hold
pub const MAX_WATCHES_PER_USER: u64 = 20;

// vim: ts=4
