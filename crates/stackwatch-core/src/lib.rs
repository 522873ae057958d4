//! Core infrastructure for Stackwatch.
//!
//! Holds the application state and the request-time identity machinery shared
//! by every feature crate: client IP resolution, the identity token codec, the
//! ban list, the gating middleware and the extractors handlers use to read the
//! resolved identity.
//!
//! [`anon_id`] is library-only: it persists a visitor id for non-browser
//! clients and is not used by the server.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod anon_id;
pub mod app;
pub mod ban;
pub mod client_ip;
pub mod extensions;
pub mod extract;
pub mod middleware;
pub mod prelude;
pub mod request;
pub mod response;
pub mod token;

pub use app::{Adapters, App, AppBuilderOpts, AppState};
pub use ban::{BanDecision, BanList, DenyReason};
pub use extract::{ClientIp, Identity};
pub use response::ResponseMeta;
pub use token::{Claims, TokenCodec};

// vim: ts=4
