//! Company detection: which page builder powers a website

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod detector;
pub mod handler;
pub mod signature;

mod prelude;

pub use detector::{Detection, Detector};

// vim: ts=4
