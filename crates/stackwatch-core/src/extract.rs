//! Extractors for the identity resolved by the gating middleware

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::prelude::*;
use crate::token::IdentityClaims;

// Identity //
//**********//
/// Caller identity, inserted by `identity_gate`, `require_moderator` or `edge_gate`
#[derive(Debug, Clone)]
pub struct Identity(pub IdentityClaims);

impl<S> FromRequestParts<S> for Identity
where
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		if let Some(identity) = parts.extensions.get::<Identity>().cloned() {
			Ok(identity)
		} else {
			// Route is not behind an identity middleware
			error!(path = %parts.uri.path(), "Identity requested on an ungated route");
			Err(Error::Internal("identity not resolved".into()))
		}
	}
}

// ClientIp //
//**********//
/// Resolved client IP, `None` when no trusted header was present
#[derive(Debug, Clone, Default)]
pub struct ClientIp(pub Option<Box<str>>);

impl<S> FromRequestParts<S> for ClientIp
where
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		Ok(parts.extensions.get::<ClientIp>().cloned().unwrap_or_default())
	}
}

// vim: ts=4
