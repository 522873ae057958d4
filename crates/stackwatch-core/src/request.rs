//! Outbound HTTP client for fetching watched and inspected pages

use axum::http::{HeaderMap, StatusCode, header};
use bytes::{Bytes, BytesMut};
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::{Host, Url};

use crate::prelude::*;

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_REDIRECTS: usize = 5;
/// Bodies are cut at 2 MiB
pub const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

const USER_AGENT: &str = concat!("Stackwatch/", env!("CARGO_PKG_VERSION"));

#[derive(Debug)]
pub struct FetchedPage {
	/// URL after redirects
	pub url: Url,
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
	pub truncated: bool,
}

impl FetchedPage {
	pub fn text(&self) -> std::borrow::Cow<'_, str> {
		String::from_utf8_lossy(&self.body)
	}
}

type HttpsClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// The HTTPS client is built on first use
#[derive(Clone, Default)]
pub struct Request {
	client: OnceCell<HttpsClient>,
}

impl std::fmt::Debug for Request {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Request").field("initialized", &self.client.initialized()).finish()
	}
}

impl Request {
	pub fn new() -> Self {
		Self::default()
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

	/// GET a page, following redirects, within the fetch timeout
	pub async fn fetch_page(&self, url: &Url) -> ClResult<FetchedPage> {
		tokio::time::timeout(FETCH_TIMEOUT, self.fetch_following(url)).await.map_err(|_| {
			warn!(url = %url, "Fetch timed out");
			Error::Timeout
		})?
	}

	async fn fetch_following(&self, url: &Url) -> ClResult<FetchedPage> {
		let mut current = url.clone();

		for _ in 0..=MAX_REDIRECTS {
			ensure_public_target(&current).await?;
			let client = self.client().await?;
			let req = hyper::Request::get(current.as_str())
				.header(header::USER_AGENT, USER_AGENT)
				.header(header::ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
				.body(Full::new(Bytes::new()))
				.map_err(|err| Error::Internal(format!("request build error: {}", err)))?;

			let res = client.request(req).await.map_err(|err| {
				debug!(url = %current, "Fetch failed: {}", err);
				Error::NetworkError(format!("failed to fetch {}", current))
			})?;

			if res.status().is_redirection() {
				if let Some(location) = res.headers().get(header::LOCATION).and_then(|v| v.to_str().ok())
				{
					current = follow_location(&current, location)?;
					continue;
				}
			}

			let (parts, body) = res.into_parts();
			let (body, truncated) = read_capped(body, MAX_BODY_SIZE).await?;
			return Ok(FetchedPage {
				url: current,
				status: parts.status,
				headers: parts.headers,
				body,
				truncated,
			});
		}

		Err(Error::NetworkError(format!("too many redirects fetching {}", url)))
	}
}

/// Normalizes user input into an absolute http(s) URL.
///
/// `https://` is prepended when no scheme is given.
pub fn normalize_target_url(input: &str) -> ClResult<Url> {
	let input = input.trim();
	if input.is_empty() {
		return Err(Error::FieldError { field: "url".into(), message: "required".into() });
	}
	let candidate =
		if input.contains("://") { input.to_string() } else { format!("https://{}", input) };

	let invalid = || Error::FieldError { field: "url".into(), message: "invalid-url".into() };
	let url = Url::parse(&candidate).map_err(|_| invalid())?;
	match url.scheme() {
		"http" | "https" if url.host_str().is_some_and(|h| !h.is_empty()) => {}
		_ => return Err(invalid()),
	}
	if is_internal_host(&url) {
		return Err(Error::FieldError { field: "url".into(), message: "forbidden-url".into() });
	}
	Ok(url)
}

/// Addresses user supplied URLs must never reach
pub fn is_internal_ip(ip: IpAddr) -> bool {
	match ip.to_canonical() {
		IpAddr::V4(v4) => {
			let [a, b, ..] = v4.octets();
			v4.is_loopback()
				|| v4.is_private()
				|| v4.is_link_local()
				|| v4.is_unspecified()
				|| v4.is_broadcast()
				|| v4.is_multicast()
				|| a == 0
				|| (a == 100 && (b & 0xc0) == 64)
		}
		IpAddr::V6(v6) => {
			v6.is_loopback()
				|| v6.is_unspecified()
				|| v6.is_unique_local()
				|| v6.is_unicast_link_local()
				|| v6.is_multicast()
		}
	}
}

/// Host check without name resolution: IP literals and `localhost` names
fn is_internal_host(url: &Url) -> bool {
	match url.host() {
		Some(Host::Ipv4(ip)) => is_internal_ip(IpAddr::V4(ip)),
		Some(Host::Ipv6(ip)) => is_internal_ip(IpAddr::V6(ip)),
		Some(Host::Domain(domain)) => {
			let domain = domain.trim_end_matches('.').to_ascii_lowercase();
			domain == "localhost" || domain.ends_with(".localhost")
		}
		None => true,
	}
}

/// Refuses targets that are, or resolve to, internal addresses.
///
/// Runs before the first request and before every redirect hop.
pub async fn ensure_public_target(url: &Url) -> ClResult<()> {
	let blocked = || {
		warn!(url = %url, "Refusing to fetch internal address");
		Error::NetworkError(format!("refusing to fetch internal address: {}", url))
	};
	if is_internal_host(url) {
		return Err(blocked());
	}
	if let Some(Host::Domain(domain)) = url.host() {
		let port = url.port_or_known_default().unwrap_or(443);
		let addrs = tokio::net::lookup_host((domain, port)).await.map_err(|err| {
			debug!(url = %url, "DNS lookup failed: {}", err);
			Error::NetworkError(format!("failed to resolve {}", domain))
		})?;
		for addr in addrs {
			if is_internal_ip(addr.ip()) {
				return Err(blocked());
			}
		}
	}
	Ok(())
}

/// Resolves a `Location` header against the current URL
fn follow_location(current: &Url, location: &str) -> ClResult<Url> {
	let next = current
		.join(location)
		.map_err(|_| Error::NetworkError(format!("invalid redirect location: {}", location)))?;
	match next.scheme() {
		"http" | "https" => {}
		scheme => {
			return Err(Error::NetworkError(format!("redirect to unsupported scheme: {}", scheme)));
		}
	}
	if is_internal_host(&next) {
		warn!(from = %current, to = %next, "Refusing redirect to internal address");
		return Err(Error::NetworkError(format!("redirect to internal address: {}", next)));
	}
	Ok(next)
}

/// Collects a body, stopping after `cap` bytes
pub async fn read_capped<B>(mut body: B, cap: usize) -> ClResult<(Bytes, bool)>
where
	B: Body<Data = Bytes> + Unpin,
	B::Error: std::fmt::Display,
{
	let mut buf = BytesMut::new();
	while let Some(frame) = body.frame().await {
		let frame = frame.map_err(|err| Error::NetworkError(format!("body read error: {}", err)))?;
		if let Ok(data) = frame.into_data() {
			let remaining = cap - buf.len();
			if data.len() > remaining {
				buf.extend_from_slice(&data[..remaining]);
				return Ok((buf.freeze(), true));
			}
			buf.extend_from_slice(&data);
		}
	}
	Ok((buf.freeze(), false))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_read_capped() {
		let body = Full::new(Bytes::from_static(b"0123456789"));
		let (bytes, truncated) = read_capped(body, 4).await.unwrap();
		assert_eq!(&bytes[..], b"0123");
		assert!(truncated);

		let body = Full::new(Bytes::from_static(b"0123456789"));
		let (bytes, truncated) = read_capped(body, 10).await.unwrap();
		assert_eq!(bytes.len(), 10);
		assert!(!truncated);
	}

	#[test]
	fn test_normalize_target_url() {
		assert_eq!(normalize_target_url("example.com").unwrap().as_str(), "https://example.com/");
		assert_eq!(
			normalize_target_url("  http://example.com/a?b=1 ").unwrap().as_str(),
			"http://example.com/a?b=1"
		);
		assert!(matches!(
			normalize_target_url(""),
			Err(Error::FieldError { ref message, .. }) if &**message == "required"
		));
		assert!(normalize_target_url("ftp://example.com").is_err());
		assert!(normalize_target_url("https://").is_err());
		assert!(normalize_target_url("exa mple").is_err());
	}

	#[test]
	fn test_normalize_target_url_refuses_internal_hosts() {
		for input in [
			"http://127.0.0.1:6379/",
			"http://169.254.169.254/latest/meta-data/",
			"localhost:3000/api/mod/stats",
			"http://LOCALHOST./",
			"http://app.localhost/",
			"http://10.0.0.8/",
			"http://192.168.1.1/",
			"http://100.64.0.1/",
			"http://0.0.0.0/",
			"http://2130706433/",
			"http://[::1]/",
			"http://[::ffff:127.0.0.1]/",
			"http://[fd00::1]/",
			"http://[fe80::1]/",
		] {
			assert!(
				matches!(
					normalize_target_url(input),
					Err(Error::FieldError { ref message, .. }) if &**message == "forbidden-url"
				),
				"{} should be refused",
				input
			);
		}
		assert!(normalize_target_url("http://8.8.8.8/").is_ok());
		assert!(normalize_target_url("http://[2001:4860:4860::8888]/").is_ok());
	}

	#[test]
	fn test_is_internal_ip() {
		let internal = ["127.0.0.2", "172.16.5.4", "169.254.1.1", "255.255.255.255", "::", "fc00::1"];
		for ip in internal {
			assert!(is_internal_ip(ip.parse().unwrap()), "{}", ip);
		}
		for ip in ["1.1.1.1", "100.128.0.1", "172.32.0.1", "2606:4700::1111"] {
			assert!(!is_internal_ip(ip.parse().unwrap()), "{}", ip);
		}
	}

	#[tokio::test]
	async fn test_fetch_refuses_internal_target_before_connecting() {
		let request = Request::new();
		let url = Url::parse("http://127.0.0.1:9/").unwrap();
		assert!(matches!(request.fetch_page(&url).await, Err(Error::NetworkError(_))));
		assert!(!request.client.initialized());
	}

	#[test]
	fn test_follow_location() {
		let base = Url::parse("https://example.com/a/b").unwrap();
		assert_eq!(follow_location(&base, "/c").unwrap().as_str(), "https://example.com/c");
		assert_eq!(
			follow_location(&base, "https://www.example.com/").unwrap().as_str(),
			"https://www.example.com/"
		);
		assert!(follow_location(&base, "ftp://example.com/").is_err());
		assert!(follow_location(&base, "http://169.254.169.254/latest/").is_err());
		assert!(follow_location(&base, "http://localhost:3000/api/mod/stats").is_err());
		assert!(follow_location(&base, "http://[::1]/").is_err());
	}
}

// vim: ts=4
