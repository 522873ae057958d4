//! SMTP email sender using lettre
//!
//! Implements the `MailTransport` adapter. A logging transport is provided
//! for development setups without an SMTP server.

use async_trait::async_trait;
use lettre::message::{MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::str::FromStr;
use std::time::Duration;

use crate::prelude::*;
use stackwatch_types::mail_adapter::{EmailMessage, MailTransport};
use stackwatch_types::utils::is_valid_email;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
	None,
	StartTls,
	Tls,
}

impl FromStr for TlsMode {
	type Err = Error;

	fn from_str(s: &str) -> ClResult<Self> {
		match s {
			"none" => Ok(TlsMode::None),
			"starttls" => Ok(TlsMode::StartTls),
			"tls" => Ok(TlsMode::Tls),
			_ => Err(Error::ConfigError(format!(
				"Invalid TLS mode: {}. Must be 'none', 'starttls', or 'tls'",
				s
			))),
		}
	}
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
	pub host: String,
	pub port: u16,
	pub username: Option<String>,
	pub password: Option<String>,
	pub tls_mode: TlsMode,
	pub timeout: Duration,
	/// `From` header, `Name <address>` or a bare address
	pub from: String,
}

/// SMTP email sender
pub struct SmtpSender {
	mailer: AsyncSmtpTransport<Tokio1Executor>,
	from: lettre::message::Mailbox,
}

impl std::fmt::Debug for SmtpSender {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SmtpSender").field("from", &self.from.to_string()).finish()
	}
}

impl SmtpSender {
	pub fn new(config: &SmtpConfig) -> ClResult<Self> {
		let from = config
			.from
			.parse()
			.map_err(|_| Error::ConfigError(format!("Invalid from address: {}", config.from)))?;

		let tls = match config.tls_mode {
			TlsMode::Tls => {
				debug!("Using TLS mode");
				Tls::Wrapper(
					TlsParameters::builder(config.host.clone())
						.build()
						.map_err(|e| Error::ConfigError(format!("TLS configuration error: {}", e)))?,
				)
			}
			TlsMode::StartTls => {
				debug!("Using STARTTLS mode");
				Tls::Opportunistic(
					TlsParameters::builder(config.host.clone())
						.build()
						.map_err(|e| Error::ConfigError(format!("TLS configuration error: {}", e)))?,
				)
			}
			TlsMode::None => {
				debug!("No TLS mode");
				Tls::None
			}
		};

		let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
			.port(config.port)
			.timeout(Some(config.timeout))
			.tls(tls);
		if let (Some(username), Some(password)) = (&config.username, &config.password) {
			builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
		}

		info!(host = %config.host, port = config.port, "SMTP transport configured");
		Ok(Self { mailer: builder.build(), from })
	}

	fn build_message(&self, message: &EmailMessage) -> ClResult<Message> {
		if !is_valid_email(&message.to) {
			return Err(Error::MailError(format!("invalid recipient: {}", message.to)));
		}
		let to = message
			.to
			.parse()
			.map_err(|_| Error::MailError(format!("invalid recipient: {}", message.to)))?;
		let builder = Message::builder().from(self.from.clone()).to(to).subject(&*message.subject);

		let email = if let Some(html) = &message.html {
			builder.multipart(
				MultiPart::alternative()
					.singlepart(SinglePart::plain(message.text.to_string()))
					.singlepart(SinglePart::html(html.to_string())),
			)
		} else {
			builder.singlepart(SinglePart::plain(message.text.to_string()))
		};
		email.map_err(|e| Error::MailError(format!("failed to build email: {}", e)))
	}
}

#[async_trait]
impl MailTransport for SmtpSender {
	async fn send(&self, message: &EmailMessage) -> ClResult<()> {
		let email = self.build_message(message)?;
		match self.mailer.send(email).await {
			Ok(response) => {
				debug!(to = %message.to, code = %response.code(), "Email sent");
				Ok(())
			}
			Err(e) => {
				warn!(to = %message.to, "Failed to send email: {}", e);
				Err(Error::MailError(format!("SMTP send failed: {}", e)))
			}
		}
	}
}

/// Transport that only logs, for development
#[derive(Debug, Default)]
pub struct LogSender;

#[async_trait]
impl MailTransport for LogSender {
	async fn send(&self, message: &EmailMessage) -> ClResult<()> {
		info!(to = %message.to, subject = %message.subject, "Email (not sent, no SMTP configured)");
		debug!("{}", message.text);
		Ok(())
	}
}


// vim: ts=4
