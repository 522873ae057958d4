//! App state type

use std::sync::Arc;

use crate::extensions::Extensions;
use crate::prelude::*;
use crate::{ban::BanList, request, token::TokenCodec};

use stackwatch_types::kv_adapter::KvAdapter;
use stackwatch_types::mail_adapter::MailTransport;
use stackwatch_types::meta_adapter::{CreateInteraction, MetaAdapter};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Token lifetime: 30 days
pub const DEFAULT_TOKEN_TTL: i64 = 30 * 24 * 3600;
/// Tokens expiring within 7 days are reissued
pub const DEFAULT_TOKEN_RENEW_BEFORE: i64 = 7 * 24 * 3600;
pub const DEFAULT_COOKIE_NAME: &str = "token";
pub const DEFAULT_RESTRICTED_PATH: &str = "/restricted";
pub const DEFAULT_EMAIL_BATCH_SIZE: usize = 50;

pub struct AppState {
	pub opts: AppBuilderOpts,
	pub request: request::Request,
	pub tokens: TokenCodec,
	pub bans: BanList,

	pub meta_adapter: Arc<dyn MetaAdapter>,
	pub kv_adapter: Arc<dyn KvAdapter>,
	pub mail: Arc<dyn MailTransport>,

	// Type-erased extension map for feature-specific state
	pub extensions: Extensions,
}

impl AppState {
	/// Builds the shared state from options and adapters.
	///
	/// Fails when the token signing secret is empty or the restricted path
	/// collides with another route.
	pub fn build(
		opts: AppBuilderOpts,
		meta_adapter: Arc<dyn MetaAdapter>,
		kv_adapter: Arc<dyn KvAdapter>,
		mail: Arc<dyn MailTransport>,
		extensions: Extensions,
	) -> ClResult<App> {
		if opts.jwt_secret.is_empty() {
			return Err(Error::ConfigError("JWT secret must not be empty".into()));
		}
		let restricted = &*opts.restricted_path;
		if !restricted.starts_with('/')
			|| matches!(restricted, "/" | "/mod" | "/api")
			|| restricted.starts_with("/api/")
		{
			return Err(Error::ConfigError(format!("invalid restricted path: {}", restricted)));
		}
		validate_token_window(opts.token_ttl, opts.token_renew_before)?;
		let tokens = TokenCodec::new(
			opts.jwt_secret.as_bytes(),
			opts.token_ttl,
			opts.token_renew_before,
		);
		let bans = BanList::new(kv_adapter.clone());

		Ok(Arc::new(AppState {
			request: request::Request::new(),
			tokens,
			bans,
			opts,
			meta_adapter,
			kv_adapter,
			mail,
			extensions,
		}))
	}

	/// Get a registered extension by type. Returns error if not found.
	pub fn ext<T: Send + Sync + 'static>(&self) -> ClResult<&T> {
		self.extensions.get::<T>().ok_or_else(|| {
			Error::Internal(format!("Extension {} not registered", std::any::type_name::<T>()))
		})
	}

	/// Appends an entry to the interaction log.
	///
	/// The log is an audit trail, a failed write is logged and swallowed.
	pub async fn record_interaction(&self, interaction: &CreateInteraction<'_>) {
		if let Err(err) = self.meta_adapter.create_interaction(interaction).await {
			warn!(typ = interaction.typ.as_str(), error = %err, "Failed to record interaction");
		}
	}
}

/// Requires `0 <= renew_before < ttl`
fn validate_token_window(ttl: i64, renew_before: i64) -> ClResult<()> {
	if ttl <= 0 || renew_before < 0 || renew_before >= ttl {
		return Err(Error::ConfigError(format!(
			"invalid token lifetime: ttl {}s, renewal window {}s (need 0 <= window < ttl)",
			ttl, renew_before
		)));
	}
	Ok(())
}

impl std::fmt::Debug for AppState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AppState").field("opts", &self.opts).finish_non_exhaustive()
	}
}

pub type App = Arc<AppState>;

#[derive(Debug, Default)]
pub struct Adapters {
	pub meta_adapter: Option<Arc<dyn MetaAdapter>>,
	pub kv_adapter: Option<Arc<dyn KvAdapter>>,
	pub mail: Option<Arc<dyn MailTransport>>,
}

pub struct AppBuilderOpts {
	pub listen: Box<str>,
	/// Development mode: loopback client IP, no `Secure` cookie flag
	pub dev_mode: bool,
	pub jwt_secret: Box<str>,
	pub token_ttl: i64,
	pub token_renew_before: i64,
	pub cookie_name: Box<str>,
	pub restricted_path: Box<str>,
	/// Shared secret for the cron routes. Unset disables them.
	pub cron_secret: Option<Box<str>>,
	/// User id promoted to moderator at startup
	pub bootstrap_mod: Option<Box<str>>,
	pub mail_from: Box<str>,
	pub email_batch_size: usize,
	/// Public base URL used for links in outgoing emails
	pub base_url: Box<str>,
}

impl Default for AppBuilderOpts {
	fn default() -> Self {
		Self {
			listen: "127.0.0.1:3000".into(),
			dev_mode: false,
			jwt_secret: "".into(),
			token_ttl: DEFAULT_TOKEN_TTL,
			token_renew_before: DEFAULT_TOKEN_RENEW_BEFORE,
			cookie_name: DEFAULT_COOKIE_NAME.into(),
			restricted_path: DEFAULT_RESTRICTED_PATH.into(),
			cron_secret: None,
			bootstrap_mod: None,
			mail_from: "Stackwatch <noreply@localhost>".into(),
			email_batch_size: DEFAULT_EMAIL_BATCH_SIZE,
			base_url: "http://localhost:3000".into(),
		}
	}
}

// Secrets stay out of logs
impl std::fmt::Debug for AppBuilderOpts {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AppBuilderOpts")
			.field("listen", &self.listen)
			.field("dev_mode", &self.dev_mode)
			.field("token_ttl", &self.token_ttl)
			.field("token_renew_before", &self.token_renew_before)
			.field("cookie_name", &self.cookie_name)
			.field("restricted_path", &self.restricted_path)
			.field("cron_secret", &self.cron_secret.as_ref().map(|_| "***"))
			.field("bootstrap_mod", &self.bootstrap_mod)
			.field("mail_from", &self.mail_from)
			.field("email_batch_size", &self.email_batch_size)
			.field("base_url", &self.base_url)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_validate_token_window() {
		assert!(validate_token_window(DEFAULT_TOKEN_TTL, DEFAULT_TOKEN_RENEW_BEFORE).is_ok());
		assert!(validate_token_window(3600, 0).is_ok());

		assert!(matches!(validate_token_window(0, 0), Err(Error::ConfigError(_))));
		assert!(matches!(validate_token_window(-5, 0), Err(Error::ConfigError(_))));
		assert!(matches!(validate_token_window(3600, 3600), Err(Error::ConfigError(_))));
		assert!(matches!(validate_token_window(3600, 7200), Err(Error::ConfigError(_))));
		assert!(matches!(validate_token_window(3600, -1), Err(Error::ConfigError(_))));
	}
}

// vim: ts=4
