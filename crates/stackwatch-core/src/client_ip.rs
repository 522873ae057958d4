//! Client IP resolution from trusted proxy headers.
//!
//! Only the headers set by the fronting proxy are trusted, in this order:
//! `cf-connecting-ip`, then `x-real-ip`. The socket peer address is never
//! used since it is always the proxy.

use axum::http::HeaderMap;
use std::net::IpAddr;

pub const DEV_CLIENT_IP: &str = "127.0.0.1";

const TRUSTED_HEADERS: [&str; 2] = ["cf-connecting-ip", "x-real-ip"];

/// Resolves the caller's IP.
///
/// Returns `None` when no trusted header carries a value. Callers treat that
/// as "skip IP based checks".
pub fn resolve_client_ip(headers: &HeaderMap, dev_mode: bool) -> Option<Box<str>> {
	if dev_mode {
		return Some(DEV_CLIENT_IP.into());
	}

	TRUSTED_HEADERS.iter().find_map(|name| {
		let value = headers.get(*name)?.to_str().ok()?;
		let first = value.split(',').next()?.trim();
		if first.is_empty() { None } else { Some(normalize_ip(first)) }
	})
}

/// Canonical textual form of an address, or the input unchanged if it does
/// not parse.
pub fn normalize_ip(value: &str) -> Box<str> {
	match value.parse::<IpAddr>() {
		Ok(ip) => ip.to_canonical().to_string().into(),
		Err(_) => value.into(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::http::HeaderValue;

	fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
		let mut map = HeaderMap::new();
		for (name, value) in pairs {
			map.append(*name, HeaderValue::from_static(value));
		}
		map
	}

	#[test]
	fn test_dev_mode_is_loopback() {
		let h = headers(&[("cf-connecting-ip", "9.9.9.9")]);
		assert_eq!(resolve_client_ip(&h, true).as_deref(), Some("127.0.0.1"));
		assert_eq!(resolve_client_ip(&HeaderMap::new(), true).as_deref(), Some("127.0.0.1"));
	}

	#[test]
	fn test_header_precedence() {
		let h = headers(&[("x-real-ip", "2.2.2.2"), ("cf-connecting-ip", "1.1.1.1")]);
		assert_eq!(resolve_client_ip(&h, false).as_deref(), Some("1.1.1.1"));

		let h = headers(&[("x-real-ip", "2.2.2.2")]);
		assert_eq!(resolve_client_ip(&h, false).as_deref(), Some("2.2.2.2"));
	}

	#[test]
	fn test_empty_header_falls_through() {
		let h = headers(&[("cf-connecting-ip", "  "), ("x-real-ip", "2.2.2.2")]);
		assert_eq!(resolve_client_ip(&h, false).as_deref(), Some("2.2.2.2"));
	}

	#[test]
	fn test_comma_list_takes_first() {
		let h = headers(&[("x-real-ip", " 1.2.3.4 , 5.6.7.8")]);
		assert_eq!(resolve_client_ip(&h, false).as_deref(), Some("1.2.3.4"));
	}

	#[test]
	fn test_missing_is_none() {
		assert_eq!(resolve_client_ip(&HeaderMap::new(), false), None);
	}

	#[test]
	fn test_normalize() {
		assert_eq!(&*normalize_ip("2001:DB8:0:0::1"), "2001:db8::1");
		assert_eq!(&*normalize_ip("::ffff:1.2.3.4"), "1.2.3.4");
		assert_eq!(&*normalize_ip("not-an-ip"), "not-an-ip");
	}
}

// vim: ts=4
