use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use std::{env, path};

use stackwatch::kv_adapter::{KvAdapter, MemoryKvAdapter};
use stackwatch::mail_adapter::MailTransport;
use stackwatch::prelude::*;
use stackwatch_email::{LogSender, SmtpConfig, SmtpSender, TlsMode};
use stackwatch_kv_adapter_http::HttpKvAdapter;
use stackwatch_meta_adapter_sqlite::MetaAdapterSqlite;

pub struct Config {
	pub listen: String,
	pub dev_mode: bool,
	pub db_dir: path::PathBuf,
	pub jwt_secret: Option<String>,
	pub cron_secret: Option<String>,
	pub kv_url: Option<String>,
	pub kv_token: Option<String>,
	pub smtp_host: Option<String>,
	pub mail_from: Option<String>,
	pub bootstrap_mod: Option<String>,
	pub base_url: Option<String>,
	pub email_batch_size: Option<usize>,
}

/// Unset and empty variables read the same
fn var(name: &str) -> Option<String> {
	env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str) -> ClResult<Option<T>> {
	var(name)
		.map(|v| v.trim().parse().map_err(|_| Error::ConfigError(format!("invalid {}: {}", name, v))))
		.transpose()
}

impl Config {
	fn from_env() -> ClResult<Self> {
		Ok(Config {
			listen: var("LISTEN").unwrap_or_else(|| "127.0.0.1:3000".to_string()),
			dev_mode: matches!(var("DEV_MODE").as_deref(), Some("1" | "true" | "yes")),
			db_dir: path::PathBuf::from(var("DB_DIR").unwrap_or_else(|| "./data".to_string())),
			jwt_secret: var("JWT_SECRET"),
			cron_secret: var("CRON_SECRET"),
			kv_url: var("KV_URL"),
			kv_token: var("KV_TOKEN"),
			smtp_host: var("SMTP_HOST"),
			mail_from: var("MAIL_FROM"),
			bootstrap_mod: var("BOOTSTRAP_MOD"),
			base_url: var("BASE_URL"),
			email_batch_size: parse_var("EMAIL_BATCH_SIZE")?,
		})
	}

	fn kv_adapter(&self) -> ClResult<Arc<dyn KvAdapter>> {
		match &self.kv_url {
			Some(url) => Ok(Arc::new(HttpKvAdapter::new(url, self.kv_token.as_deref())?)),
			None if self.dev_mode => {
				warn!("KV_URL not set, using in-memory ban store (dev mode)");
				Ok(Arc::new(MemoryKvAdapter::new()))
			}
			None => Err(Error::ConfigError("KV_URL must be set".into())),
		}
	}

	fn mail(&self) -> ClResult<Arc<dyn MailTransport>> {
		let Some(host) = &self.smtp_host else {
			if self.dev_mode {
				warn!("SMTP_HOST not set, emails are only logged (dev mode)");
				return Ok(Arc::new(LogSender));
			}
			return Err(Error::ConfigError("SMTP_HOST must be set".into()));
		};
		let tls_mode: TlsMode = var("SMTP_TLS").as_deref().unwrap_or("starttls").parse()?;
		let port = parse_var("SMTP_PORT")?.unwrap_or(match tls_mode {
			TlsMode::Tls => 465,
			TlsMode::StartTls => 587,
			TlsMode::None => 25,
		});
		let config = SmtpConfig {
			host: host.clone(),
			port,
			username: var("SMTP_USER"),
			password: var("SMTP_PASSWORD"),
			tls_mode,
			timeout: Duration::from_secs(30),
			from: self.mail_from.clone().unwrap_or_else(|| "Stackwatch <noreply@localhost>".into()),
		};
		Ok(Arc::new(SmtpSender::new(&config)?))
	}
}

async fn run() -> ClResult<()> {
	let mut builder = stackwatch::AppBuilder::new();
	let config = Config::from_env()?;

	let jwt_secret = match config.jwt_secret.clone() {
		Some(secret) => secret,
		None if config.dev_mode => {
			warn!("JWT_SECRET not set, using a random secret (dev mode)");
			stackwatch::utils::random_id()
		}
		None => return Err(Error::ConfigError("JWT_SECRET must be set".into())),
	};

	let meta_adapter = MetaAdapterSqlite::new(&config.db_dir).await?;

	builder
		.listen(config.listen.as_str())
		.dev_mode(config.dev_mode)
		.jwt_secret(jwt_secret)
		.meta_adapter(Arc::new(meta_adapter))
		.kv_adapter(config.kv_adapter()?)
		.mail(config.mail()?);
	if let Some(secret) = config.cron_secret.as_deref() {
		builder.cron_secret(secret);
	}
	if let Some(user_id) = config.bootstrap_mod.as_deref() {
		builder.bootstrap_mod(user_id);
	}
	if let Some(from) = config.mail_from.as_deref() {
		builder.mail_from(from);
	}
	if let Some(base_url) = config.base_url.as_deref() {
		builder.base_url(base_url);
	}
	if let Some(batch_size) = config.email_batch_size {
		builder.email_batch_size(batch_size);
	}

	builder.run().await
}

#[tokio::main]
async fn main() -> ExitCode {
	match run().await {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			error!("FATAL: {}", err);
			ExitCode::FAILURE
		}
	}
}

// vim: ts=4
