//! Response metadata carried between responses.
//!
//! Middleware that resolves the caller's identity may need to set a cookie on
//! whatever response the downstream handler produces, including error
//! responses. `ResponseMeta` collects cookies and headers and merges them onto
//! a response with fixed rules: every cookie is appended, every other header
//! replaces the target's, and `content-type` / `content-length` are never
//! copied since they describe a body the metadata does not own.

use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use axum::response::{IntoResponseParts, Response, ResponseParts};
use axum_extra::extract::cookie::Cookie;

use crate::prelude::*;

#[derive(Debug, Clone, Default)]
pub struct ResponseMeta {
	cookies: Vec<HeaderValue>,
	headers: HeaderMap,
}

fn is_body_header(name: &HeaderName) -> bool {
	name == header::CONTENT_TYPE || name == header::CONTENT_LENGTH
}

impl ResponseMeta {
	pub fn new() -> Self {
		Self::default()
	}

	/// Captures the mergeable metadata of an existing header set
	pub fn from_headers(headers: &HeaderMap) -> Self {
		let mut meta = Self::new();
		meta.merge_headers(headers);
		meta
	}

	pub fn is_empty(&self) -> bool {
		self.cookies.is_empty() && self.headers.is_empty()
	}

	pub fn cookies(&self) -> &[HeaderValue] {
		&self.cookies
	}

	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	pub fn add_cookie(&mut self, cookie: &Cookie<'_>) -> ClResult<()> {
		let value = HeaderValue::from_str(&cookie.to_string())
			.map_err(|_| Error::Internal("invalid cookie value".into()))?;
		self.cookies.push(value);
		Ok(())
	}

	pub fn with_cookie(mut self, cookie: &Cookie<'_>) -> ClResult<Self> {
		self.add_cookie(cookie)?;
		Ok(self)
	}

	pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
		if name == header::SET_COOKIE {
			self.cookies.push(value);
		} else if !is_body_header(&name) {
			self.headers.insert(name, value);
		}
	}

	/// Folds another header set into this one with the merge rules
	pub fn merge_headers(&mut self, source: &HeaderMap) {
		for (name, value) in source {
			self.insert_header(name.clone(), value.clone());
		}
	}

	pub fn merge(&mut self, other: ResponseMeta) {
		self.cookies.extend(other.cookies);
		for (name, value) in &other.headers {
			self.headers.insert(name.clone(), value.clone());
		}
	}

	/// Writes the metadata onto a header map
	pub fn apply_to(&self, target: &mut HeaderMap) {
		for (name, value) in &self.headers {
			target.insert(name.clone(), value.clone());
		}
		for cookie in &self.cookies {
			target.append(header::SET_COOKIE, cookie.clone());
		}
	}

	pub fn apply(&self, mut response: Response) -> Response {
		self.apply_to(response.headers_mut());
		response
	}
}

impl IntoResponseParts for ResponseMeta {
	type Error = std::convert::Infallible;

	fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
		self.apply_to(res.headers_mut());
		Ok(res)
	}
}


// vim: ts=4
