//! KV adapter talking to a remote key-value store over HTTP.
//!
//! Each key maps to `{base_url}/{percent-encoded key}`:
//! - `GET` returns the JSON value, `404` means the key is absent
//! - `PUT` stores the JSON request body
//! - `DELETE` removes the key, `404` is treated as success
//!
//! An optional bearer token is sent with every request.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Body;
use hyper::{Method, StatusCode, header};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

use stackwatch_types::kv_adapter::KvAdapter;
use stackwatch_types::prelude::*;

const KV_TIMEOUT: Duration = Duration::from_secs(5);
/// Ban flags are tiny, larger responses are refused
const MAX_RESPONSE_SIZE: usize = 64 * 1024;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Collects a response body, failing once it grows past `limit` bytes
async fn read_limited<B>(body: B, limit: usize) -> Result<Bytes, BoxError>
where
	B: Body<Data = Bytes>,
	B::Error: Into<BoxError>,
{
	Ok(Limited::new(body, limit).collect().await?.to_bytes())
}

type HttpsClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

pub struct HttpKvAdapter {
	base_url: Url,
	token: Option<Box<str>>,
	client: OnceCell<HttpsClient>,
}

impl std::fmt::Debug for HttpKvAdapter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HttpKvAdapter")
			.field("base_url", &self.base_url.as_str())
			.field("token", &self.token.as_ref().map(|_| "[redacted]"))
			.finish_non_exhaustive()
	}
}

impl HttpKvAdapter {
	pub fn new(base_url: &str, token: Option<&str>) -> ClResult<Self> {
		let base_url = Url::parse(base_url)
			.map_err(|err| Error::ConfigError(format!("invalid KV_URL: {}", err)))?;
		if base_url.cannot_be_a_base() {
			return Err(Error::ConfigError("KV_URL cannot be used as a base URL".into()));
		}

		Ok(Self {
			base_url,
			token: token.filter(|t| !t.is_empty()).map(Into::into),
			client: OnceCell::new(),
		})
	}

	async fn client(&self) -> ClResult<&HttpsClient> {
		self.client
			.get_or_try_init(|| async {
				let connector = HttpsConnectorBuilder::new()
					.with_provider_and_native_roots(rustls::crypto::aws_lc_rs::default_provider())
					.map_err(|err| Error::ConfigError(format!("TLS error: {}", err)))?
					.https_or_http()
					.enable_http1()
					.enable_http2()
					.build();
				Ok::<_, Error>(Client::builder(TokioExecutor::new()).build(connector))
			})
			.await
	}

	/// Builds the URL of a key. The key is a single path segment.
	pub fn key_url(&self, key: &str) -> ClResult<Url> {
		let mut url = self.base_url.clone();
		url.path_segments_mut()
			.map_err(|()| Error::ConfigError("KV_URL cannot be used as a base URL".into()))?
			.pop_if_empty()
			.push(key);
		Ok(url)
	}

	async fn send(
		&self,
		method: Method,
		key: &str,
		body: Option<Bytes>,
	) -> ClResult<(StatusCode, Bytes)> {
		let url = self.key_url(key)?;
		let mut req = hyper::Request::builder().method(method.clone()).uri(url.as_str());
		if let Some(token) = &self.token {
			req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
		}
		if body.is_some() {
			req = req.header(header::CONTENT_TYPE, "application/json");
		}
		let req = req
			.body(Full::new(body.unwrap_or_default()))
			.map_err(|err| Error::Internal(format!("request build error: {}", err)))?;

		let client = self.client().await?;
		let fut = async {
			let res = client
				.request(req)
				.await
				.map_err(|err| Error::KvError(format!("kv {} {}: {}", method, key, err)))?;
			let status = res.status();
			let body = read_limited(res.into_body(), MAX_RESPONSE_SIZE)
				.await
				.map_err(|err| Error::KvError(format!("kv {} {}: {}", method, key, err)))?;
			Ok::<_, Error>((status, body))
		};

		tokio::time::timeout(KV_TIMEOUT, fut).await.map_err(|_| {
			warn!(key = %key, "KV request timed out");
			Error::KvError(format!("kv {} {}: timeout", method, key))
		})?
	}
}

#[async_trait]
impl KvAdapter for HttpKvAdapter {
	async fn get(&self, key: &str) -> ClResult<Option<serde_json::Value>> {
		let (status, body) = self.send(Method::GET, key, None).await?;
		match status {
			StatusCode::NOT_FOUND => Ok(None),
			s if s.is_success() => {
				if body.is_empty() {
					return Ok(None);
				}
				let value = serde_json::from_slice(&body).map_err(|err| {
					Error::KvError(format!("kv GET {}: invalid JSON: {}", key, err))
				})?;
				Ok(Some(value))
			}
			s => Err(Error::KvError(format!("kv GET {}: status {}", key, s))),
		}
	}

	async fn put(&self, key: &str, value: &serde_json::Value) -> ClResult<()> {
		let body = Bytes::from(serde_json::to_vec(value)?);
		let (status, _) = self.send(Method::PUT, key, Some(body)).await?;
		if status.is_success() {
			debug!(key = %key, "KV put");
			Ok(())
		} else {
			Err(Error::KvError(format!("kv PUT {}: status {}", key, status)))
		}
	}

	async fn delete(&self, key: &str) -> ClResult<()> {
		let (status, _) = self.send(Method::DELETE, key, None).await?;
		if status.is_success() || status == StatusCode::NOT_FOUND {
			debug!(key = %key, "KV delete");
			Ok(())
		} else {
			Err(Error::KvError(format!("kv DELETE {}: status {}", key, status)))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_read_limited_refuses_oversized_bodies() {
		let body = Full::new(Bytes::from_static(b"true"));
		assert_eq!(&read_limited(body, 16).await.unwrap()[..], b"true");

		let body = Full::new(Bytes::from(vec![b'x'; 32]));
		assert!(read_limited(body, 16).await.is_err());
	}

	#[test]
	fn test_key_url_encodes_key() {
		let kv = HttpKvAdapter::new("https://kv.example.com/ns/bans", None).unwrap();
		let url = kv.key_url("banned_ip:2001:db8::1").unwrap();
		assert_eq!(url.as_str(), "https://kv.example.com/ns/bans/banned_ip:2001:db8::1");

		let url = kv.key_url("a/b c").unwrap();
		assert_eq!(url.as_str(), "https://kv.example.com/ns/bans/a%2Fb%20c");
	}

	#[test]
	fn test_key_url_trailing_slash() {
		let kv = HttpKvAdapter::new("http://localhost:8787/", None).unwrap();
		let url = kv.key_url("banned_user:abc").unwrap();
		assert_eq!(url.as_str(), "http://localhost:8787/banned_user:abc");
	}

	#[test]
	fn test_invalid_base_url() {
		assert!(matches!(HttpKvAdapter::new("not a url", None), Err(Error::ConfigError(_))));
		assert!(matches!(HttpKvAdapter::new("mailto:a@b.c", None), Err(Error::ConfigError(_))));
	}

	#[test]
	fn test_debug_hides_token() {
		let kv = HttpKvAdapter::new("http://localhost:8787", Some("secret")).unwrap();
		let dbg = format!("{:?}", kv);
		assert!(!dbg.contains("secret"));
		assert!(dbg.contains("[redacted]"));
	}
}

// vim: ts=4
