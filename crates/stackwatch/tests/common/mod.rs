//! Shared helpers for the router-level integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use parking_lot::Mutex;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use stackwatch::kv_adapter::{KvAdapter, MemoryKvAdapter};
use stackwatch::mail_adapter::{EmailMessage, MailTransport};
use stackwatch::prelude::*;
use stackwatch::{App, AppBuilder};
use stackwatch_core::token::IdentityClaims;
use stackwatch_meta_adapter_sqlite::MetaAdapterSqlite;

pub const JWT_SECRET: &str = "integration-test-secret";
pub const CRON_SECRET: &str = "cron-test-secret";

/// Mail transport that keeps every message
#[derive(Debug, Default)]
pub struct RecordingMail {
	pub sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl MailTransport for RecordingMail {
	async fn send(&self, message: &EmailMessage) -> ClResult<()> {
		self.sent.lock().push(message.clone());
		Ok(())
	}
}

/// KV store that is always down
#[derive(Debug)]
pub struct BrokenKv;

#[async_trait]
impl KvAdapter for BrokenKv {
	async fn get(&self, _key: &str) -> ClResult<Option<serde_json::Value>> {
		Err(Error::KvError("connection refused".into()))
	}
	async fn put(&self, _key: &str, _value: &serde_json::Value) -> ClResult<()> {
		Err(Error::KvError("connection refused".into()))
	}
	async fn delete(&self, _key: &str) -> ClResult<()> {
		Err(Error::KvError("connection refused".into()))
	}
}

pub struct TestApp {
	pub app: App,
	pub router: Router,
	pub mail: Arc<RecordingMail>,
	_tmp: TempDir,
}

pub async fn setup_with(
	kv: Arc<dyn KvAdapter>,
	configure: impl FnOnce(&mut AppBuilder),
) -> TestApp {
	let tmp = TempDir::new().unwrap();
	let meta = MetaAdapterSqlite::new(tmp.path()).await.unwrap();
	let mail = Arc::new(RecordingMail::default());

	let mut builder = AppBuilder::new();
	builder.jwt_secret(JWT_SECRET).meta_adapter(Arc::new(meta)).kv_adapter(kv).mail(mail.clone());
	configure(&mut builder);
	let (app, router) = builder.build().await.unwrap();

	TestApp { app, router, mail, _tmp: tmp }
}

pub async fn setup() -> TestApp {
	setup_with(Arc::new(MemoryKvAdapter::new()), |_| {}).await
}

impl TestApp {
	pub async fn send(&self, req: Request<Body>) -> Response<Body> {
		self.router.clone().oneshot(req).await.unwrap()
	}

	/// Token for a known identity, as the codec would issue it
	pub fn token_for(&self, user_id: &str, is_mod: bool) -> String {
		let identity = IdentityClaims { user_id: user_id.into(), is_mod, email: None };
		self.app.tokens.issue(&identity).unwrap()
	}
}

pub fn get(uri: &str) -> axum::http::request::Builder {
	Request::builder().method("GET").uri(uri)
}

pub fn with_token(builder: axum::http::request::Builder, token: &str) -> axum::http::request::Builder {
	builder.header(header::COOKIE, format!("token={}", token))
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
	let mut builder = Request::builder()
		.method(method)
		.uri(uri)
		.header(header::CONTENT_TYPE, "application/json");
	if let Some(token) = token {
		builder = with_token(builder, token);
	}
	builder.body(Body::from(body.to_string())).unwrap()
}

/// Value of the `token` cookie set by a response, if any
pub fn set_token(res: &Response<Body>) -> Option<String> {
	res.headers().get_all(header::SET_COOKIE).iter().find_map(|v| {
		let v = v.to_str().ok()?;
		let pair = v.split(';').next()?;
		let (name, value) = pair.split_once('=')?;
		(name.trim() == "token").then(|| value.trim().to_string())
	})
}

pub async fn body_string(res: Response<Body>) -> String {
	let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
	String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(res: Response<Body>) -> serde_json::Value {
	serde_json::from_str(&body_string(res).await).unwrap()
}

// vim: ts=4
