//! Outbound mail transport.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::prelude::*;

/// A single outgoing plain-text (optionally HTML) message
#[derive(Debug, Clone)]
pub struct EmailMessage {
	pub to: Box<str>,
	pub subject: Box<str>,
	pub text: Box<str>,
	pub html: Option<Box<str>>,
}

/// Delivers one message per call. Implementations report delivery failures as
/// `Error::MailError`; batching and failure aggregation happen above this layer.
#[async_trait]
pub trait MailTransport: Debug + Send + Sync {
	async fn send(&self, message: &EmailMessage) -> ClResult<()>;
}

// vim: ts=4
