//! Email for Stackwatch
//!
//! This crate provides:
//! - Template rendering with variable substitution (Handlebars)
//! - SMTP email sending with lettre
//! - Batched sending with per-recipient failure aggregation

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod batch;
pub mod sender;
pub mod template;

pub use batch::{BatchSummary, send_in_batches};
pub use sender::{LogSender, SmtpConfig, SmtpSender, TlsMode};
pub use template::TemplateEngine;

mod prelude;

use crate::prelude::*;
use stackwatch_types::mail_adapter::EmailMessage;

/// Email module, registered as an app extension
#[derive(Debug)]
pub struct EmailModule {
	pub template_engine: TemplateEngine,
}

impl EmailModule {
	pub fn new() -> ClResult<Self> {
		Ok(Self { template_engine: TemplateEngine::new()? })
	}

	/// Renders a template into a message for one recipient.
	///
	/// `baseUrl` is added to the variables for links back to the site.
	pub fn compose(
		&self,
		app: &App,
		to: &str,
		template_name: &str,
		vars: serde_json::Value,
	) -> ClResult<EmailMessage> {
		let mut vars = vars;
		if let serde_json::Value::Object(ref mut map) = vars {
			map.entry("baseUrl")
				.or_insert_with(|| serde_json::Value::String(app.opts.base_url.to_string()));
		}
		let rendered = self.template_engine.render(template_name, &vars)?;
		Ok(EmailMessage {
			to: to.into(),
			subject: rendered.subject.into(),
			text: rendered.text_body.into(),
			html: Some(rendered.html_body.into()),
		})
	}

	/// Send one message immediately
	pub async fn send_now(app: &App, message: &EmailMessage) -> ClResult<()> {
		app.mail.send(message).await
	}

	/// Send messages in batches of the configured size
	pub async fn send_batch(app: &App, messages: &[EmailMessage]) -> BatchSummary {
		send_in_batches(app.mail.as_ref(), messages, app.opts.email_batch_size).await
	}
}

// vim: ts=4
