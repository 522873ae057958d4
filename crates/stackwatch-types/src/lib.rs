//! Shared types, adapter traits, and core utilities for Stackwatch.
//!
//! This crate holds the foundational types shared between the feature crates
//! and the adapter implementations, so adapters can compile without pulling in
//! the web stack.

pub mod error;
pub mod kv_adapter;
pub mod mail_adapter;
pub mod meta_adapter;
pub mod prelude;
pub mod types;
pub mod utils;

// vim: ts=4
