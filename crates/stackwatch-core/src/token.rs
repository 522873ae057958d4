//! Identity token codec.
//!
//! Every visitor carries an HS256 signed token in a session cookie. A visitor
//! without a valid token gets a fresh anonymous identity. Tokens close to
//! expiry are reissued with the same claims, so the user id never changes once
//! assigned.

use axum_extra::extract::cookie::{Cookie, SameSite};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::prelude::*;
use stackwatch_types::utils::random_id;

/// Signed token payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
	pub user_id: Box<str>,
	pub is_mod: bool,
	pub email: Option<Box<str>>,
	pub iat: i64,
	pub exp: i64,
}

/// The identity part of the claims, without the timing fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityClaims {
	pub user_id: Box<str>,
	pub is_mod: bool,
	pub email: Option<Box<str>>,
}

impl IdentityClaims {
	/// A brand new anonymous visitor
	pub fn anonymous() -> Self {
		Self { user_id: random_id().into(), is_mod: false, email: None }
	}
}

impl From<Claims> for IdentityClaims {
	fn from(claims: Claims) -> Self {
		Self { user_id: claims.user_id, is_mod: claims.is_mod, email: claims.email }
	}
}

/// Outcome of [`TokenCodec::refresh_at`]
#[derive(Debug)]
pub struct Refreshed {
	pub identity: IdentityClaims,
	/// Set when a token was issued and the cookie has to be (re)sent
	pub token: Option<String>,
}

pub struct TokenCodec {
	encoding_key: EncodingKey,
	decoding_key: DecodingKey,
	validation: Validation,
	ttl: i64,
	renew_before: i64,
}

impl std::fmt::Debug for TokenCodec {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TokenCodec")
			.field("ttl", &self.ttl)
			.field("renew_before", &self.renew_before)
			.finish_non_exhaustive()
	}
}

impl TokenCodec {
	pub fn new(secret: &[u8], ttl: i64, renew_before: i64) -> Self {
		let mut validation = Validation::new(Algorithm::HS256);
		// Expiry is checked against an explicit clock in decode_at
		validation.validate_exp = false;
		validation.leeway = 0;

		Self {
			encoding_key: EncodingKey::from_secret(secret),
			decoding_key: DecodingKey::from_secret(secret),
			validation,
			ttl,
			renew_before,
		}
	}

	/// Decodes and verifies a token. Any failure yields `None`.
	pub fn decode(&self, raw: &str) -> Option<Claims> {
		self.decode_at(raw, Timestamp::now())
	}

	pub fn decode_at(&self, raw: &str, now: Timestamp) -> Option<Claims> {
		let data = decode::<Claims>(raw, &self.decoding_key, &self.validation)
			.inspect_err(|err| debug!("Rejected identity token: {}", err))
			.ok()?;
		if data.claims.exp <= now.0 {
			debug!(user_id = %data.claims.user_id, "Identity token expired");
			return None;
		}
		Some(data.claims)
	}

	pub fn issue(&self, identity: &IdentityClaims) -> ClResult<String> {
		self.issue_at(identity, Timestamp::now())
	}

	pub fn issue_at(&self, identity: &IdentityClaims, now: Timestamp) -> ClResult<String> {
		let claims = Claims {
			user_id: identity.user_id.clone(),
			is_mod: identity.is_mod,
			email: identity.email.clone(),
			iat: now.0,
			exp: now.0 + self.ttl,
		};
		encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
			.map_err(|err| Error::Internal(format!("token encoding failed: {}", err)))
	}

	pub fn refresh(&self, raw: Option<&str>) -> ClResult<Refreshed> {
		self.refresh_at(raw, Timestamp::now())
	}

	/// Resolves the caller's identity, issuing a token when needed.
	///
	/// - no valid token: new anonymous identity and a token
	/// - valid, expiring within the renewal window: same identity, new token
	/// - otherwise: the existing identity, no token
	pub fn refresh_at(&self, raw: Option<&str>, now: Timestamp) -> ClResult<Refreshed> {
		match raw.and_then(|raw| self.decode_at(raw, now)) {
			None => {
				let identity = IdentityClaims::anonymous();
				debug!(user_id = %identity.user_id, "Issuing anonymous identity");
				let token = self.issue_at(&identity, now)?;
				Ok(Refreshed { identity, token: Some(token) })
			}
			Some(claims) if claims.exp - now.0 <= self.renew_before => {
				let identity = IdentityClaims::from(claims);
				debug!(user_id = %identity.user_id, "Renewing identity token");
				let token = self.issue_at(&identity, now)?;
				Ok(Refreshed { identity, token: Some(token) })
			}
			Some(claims) => Ok(Refreshed { identity: claims.into(), token: None }),
		}
	}
}

// Cookies //
//*********//

/// Session cookie carrying the token.
///
/// No `Max-Age`: the token's own expiry decides when it is replaced.
pub fn token_cookie(name: &str, token: &str, dev_mode: bool) -> Cookie<'static> {
	Cookie::build((name.to_string(), token.to_string()))
		.path("/")
		.http_only(true)
		.same_site(SameSite::Strict)
		.secure(!dev_mode)
		.build()
}

/// Cookie that clears the token (`Max-Age=0`)
pub fn removal_cookie(name: &str, dev_mode: bool) -> Cookie<'static> {
	let mut cookie = token_cookie(name, "", dev_mode);
	cookie.make_removal();
	cookie
}


// vim: ts=4
