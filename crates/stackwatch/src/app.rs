//! App builder - constructs and runs the Stackwatch application

use axum::Router;
use std::sync::Arc;

use crate::prelude::*;
use crate::pages::Pages;
use crate::{routes, webserver};
pub use stackwatch_core::app::{Adapters, App, AppBuilderOpts, AppState, VERSION};
use stackwatch_core::extensions::Extensions;
use stackwatch_detect::Detector;
use stackwatch_email::EmailModule;
use stackwatch_types::kv_adapter::KvAdapter;
use stackwatch_types::mail_adapter::MailTransport;
use stackwatch_types::meta_adapter::MetaAdapter;

pub struct AppBuilder {
	opts: AppBuilderOpts,
	adapters: Adapters,
}

impl AppBuilder {
	pub fn new() -> Self {
		// A second builder in the same process keeps the first subscriber
		let _ = tracing_subscriber::fmt()
			.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
			.with_target(false)
			.try_init();
		AppBuilder { opts: AppBuilderOpts::default(), adapters: Adapters::default() }
	}

	// Opts
	pub fn listen(&mut self, listen: impl Into<Box<str>>) -> &mut Self {
		self.opts.listen = listen.into();
		self
	}
	pub fn dev_mode(&mut self, dev_mode: bool) -> &mut Self {
		self.opts.dev_mode = dev_mode;
		self
	}
	pub fn jwt_secret(&mut self, jwt_secret: impl Into<Box<str>>) -> &mut Self {
		self.opts.jwt_secret = jwt_secret.into();
		self
	}
	pub fn token_ttl(&mut self, seconds: i64) -> &mut Self {
		self.opts.token_ttl = seconds;
		self
	}
	pub fn token_renew_before(&mut self, seconds: i64) -> &mut Self {
		self.opts.token_renew_before = seconds;
		self
	}
	pub fn cookie_name(&mut self, cookie_name: impl Into<Box<str>>) -> &mut Self {
		self.opts.cookie_name = cookie_name.into();
		self
	}
	pub fn restricted_path(&mut self, restricted_path: impl Into<Box<str>>) -> &mut Self {
		self.opts.restricted_path = restricted_path.into();
		self
	}
	pub fn cron_secret(&mut self, cron_secret: impl Into<Box<str>>) -> &mut Self {
		self.opts.cron_secret = Some(cron_secret.into());
		self
	}
	pub fn bootstrap_mod(&mut self, user_id: impl Into<Box<str>>) -> &mut Self {
		self.opts.bootstrap_mod = Some(user_id.into());
		self
	}
	pub fn mail_from(&mut self, mail_from: impl Into<Box<str>>) -> &mut Self {
		self.opts.mail_from = mail_from.into();
		self
	}
	pub fn email_batch_size(&mut self, batch_size: usize) -> &mut Self {
		self.opts.email_batch_size = batch_size;
		self
	}
	pub fn base_url(&mut self, base_url: impl Into<Box<str>>) -> &mut Self {
		self.opts.base_url = base_url.into();
		self
	}

	// Adapters
	pub fn meta_adapter(&mut self, meta_adapter: Arc<dyn MetaAdapter>) -> &mut Self {
		self.adapters.meta_adapter = Some(meta_adapter);
		self
	}
	pub fn kv_adapter(&mut self, kv_adapter: Arc<dyn KvAdapter>) -> &mut Self {
		self.adapters.kv_adapter = Some(kv_adapter);
		self
	}
	pub fn mail(&mut self, mail: Arc<dyn MailTransport>) -> &mut Self {
		self.adapters.mail = Some(mail);
		self
	}

	/// Builds the app state and its router without binding a socket
	pub async fn build(self) -> ClResult<(App, Router)> {
		let Some(meta_adapter) = self.adapters.meta_adapter else {
			error!("FATAL: No meta adapter configured");
			return Err(Error::ConfigError("No meta adapter configured".to_string()));
		};
		let Some(kv_adapter) = self.adapters.kv_adapter else {
			error!("FATAL: No KV adapter configured");
			return Err(Error::ConfigError("No KV adapter configured".to_string()));
		};
		let Some(mail) = self.adapters.mail else {
			error!("FATAL: No mail transport configured");
			return Err(Error::ConfigError("No mail transport configured".to_string()));
		};

		// Build extensions map for feature-specific state
		let mut extensions = Extensions::new();
		extensions.insert(Arc::new(EmailModule::new()?));
		extensions.insert(Arc::new(Detector::new()?));
		extensions.insert(Arc::new(Pages::new()?));

		let app = AppState::build(self.opts, meta_adapter, kv_adapter, mail, extensions)
			.inspect_err(|err| error!("FATAL: {}", err))?;

		if let Some(user_id) = app.opts.bootstrap_mod.as_deref() {
			app.meta_adapter.set_user_mod(user_id, true).await?;
			info!(user_id = %user_id, "Bootstrap moderator set");
		}

		let router = routes::init(app.clone());
		Ok((app, router))
	}

	pub async fn run(self) -> ClResult<()> {
		info!(" ___ _           _               _      _");
		info!("/ __| |_ __ _ __| |____ __ ____ _| |_ __| |_");
		info!("\\__ \\  _/ _` / _| / /\\ V  V / _` |  _/ _| ' \\");
		info!("|___/\\__\\__,_\\__|_\\_\\ \\_/\\_/\\__,_|\\__\\__|_||_|");
		info!("V{}", VERSION);
		info!("");

		rustls::crypto::CryptoProvider::install_default(
			rustls::crypto::aws_lc_rs::default_provider(),
		)
		.map_err(|e| {
			error!("FATAL: Failed to install default crypto provider: {:?}", e);
			Error::Internal("Failed to install default crypto provider".to_string())
		})?;

		let (app, router) = self.build().await?;
		info!("Options: {:?}", app.opts);

		webserver::serve(&app, router).await
	}
}

impl Default for AppBuilder {
	fn default() -> Self {
		Self::new()
	}
}

// vim: ts=4
