//! Error type shared by every Stackwatch crate.
//!
//! Handlers return `ClResult<T>`; the `IntoResponse` implementation maps each
//! variant to a status code and one of the two JSON error shapes used by the
//! API: the form-error shape `{_errors:{formErrors,fieldErrors}}` for
//! validation and authorization failures, and `{error: "..."}` for the rest.

use axum::{
	Json,
	http::StatusCode,
	response::{IntoResponse, Response},
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub type ClResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	// Request errors
	NotFound,
	ValidationError(String),
	FieldError { field: Box<str>, message: Box<str> },
	Parse,

	// Authorization errors
	Unauthorized,
	PermissionDenied,
	NotModerator,
	/// Carries the machine readable reason, `ip-banned` or `user-banned`
	Banned(Box<str>),
	TooMany(Box<str>),

	// Upstream errors
	DbError,
	KvError(String),
	MailError(String),
	NetworkError(String),
	Timeout,
	ServiceUnavailable(String),

	// Server errors
	ConfigError(String),
	Internal(String),
	Io(std::io::Error),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::NotFound => write!(f, "not found"),
			Error::ValidationError(msg) => write!(f, "validation error: {}", msg),
			Error::FieldError { field, message } => write!(f, "invalid {}: {}", field, message),
			Error::Parse => write!(f, "parse error"),
			Error::Unauthorized => write!(f, "unauthorized"),
			Error::PermissionDenied => write!(f, "permission denied"),
			Error::NotModerator => write!(f, "not a moderator"),
			Error::Banned(reason) => write!(f, "banned: {}", reason),
			Error::TooMany(what) => write!(f, "limit reached: {}", what),
			Error::DbError => write!(f, "database error"),
			Error::KvError(msg) => write!(f, "kv store error: {}", msg),
			Error::MailError(msg) => write!(f, "mail error: {}", msg),
			Error::NetworkError(msg) => write!(f, "network error: {}", msg),
			Error::Timeout => write!(f, "timeout"),
			Error::ServiceUnavailable(msg) => write!(f, "service unavailable: {}", msg),
			Error::ConfigError(msg) => write!(f, "configuration error: {}", msg),
			Error::Internal(msg) => write!(f, "internal error: {}", msg),
			Error::Io(err) => write!(f, "io error: {}", err),
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Error::Io(err) => Some(err),
			_ => None,
		}
	}
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Error::Io(err)
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		tracing::debug!("json error: {}", err);
		Error::Parse
	}
}

impl From<std::num::ParseIntError> for Error {
	fn from(_err: std::num::ParseIntError) -> Self {
		Error::Parse
	}
}

// Form errors //
//**************//

/// Validation and authorization error body.
///
/// Serialized as `{"_errors":{"formErrors":[...],"fieldErrors":{...}}}`.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormErrors {
	pub form_errors: Vec<Box<str>>,
	pub field_errors: BTreeMap<Box<str>, Vec<Box<str>>>,
}

#[derive(Debug, Serialize)]
struct FormErrorBody {
	#[serde(rename = "_errors")]
	errors: FormErrors,
}

impl FormErrors {
	pub fn form(key: impl Into<Box<str>>) -> Self {
		Self { form_errors: vec![key.into()], field_errors: BTreeMap::new() }
	}

	pub fn field(field: impl Into<Box<str>>, message: impl Into<Box<str>>) -> Self {
		let mut field_errors = BTreeMap::new();
		field_errors.insert(field.into(), vec![message.into()]);
		Self { form_errors: Vec::new(), field_errors }
	}

	pub fn into_response_with(self, status: StatusCode) -> Response {
		(status, Json(FormErrorBody { errors: self })).into_response()
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		match self {
			Error::ValidationError(msg) => {
				FormErrors::form(msg).into_response_with(StatusCode::BAD_REQUEST)
			}
			Error::FieldError { field, message } => {
				FormErrors::field(field, message).into_response_with(StatusCode::BAD_REQUEST)
			}
			Error::Parse => FormErrors::form("invalid-request").into_response_with(StatusCode::BAD_REQUEST),
			Error::TooMany(what) => FormErrors::form(what).into_response_with(StatusCode::BAD_REQUEST),
			Error::Unauthorized => {
				FormErrors::form("unauthorized").into_response_with(StatusCode::UNAUTHORIZED)
			}
			Error::PermissionDenied => {
				FormErrors::form("permission-denied").into_response_with(StatusCode::FORBIDDEN)
			}
			Error::NotModerator => {
				FormErrors::form("not-moderator").into_response_with(StatusCode::FORBIDDEN)
			}
			Error::Banned(reason) => FormErrors::form(reason).into_response_with(StatusCode::FORBIDDEN),
			Error::NotFound => {
				(StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not-found" })))
					.into_response()
			}
			Error::KvError(msg) | Error::MailError(msg) | Error::NetworkError(msg) => {
				tracing::warn!("upstream error: {}", msg);
				(StatusCode::BAD_GATEWAY, Json(serde_json::json!({ "error": msg }))).into_response()
			}
			Error::Timeout => {
				(StatusCode::BAD_GATEWAY, Json(serde_json::json!({ "error": "upstream-timeout" })))
					.into_response()
			}
			Error::ServiceUnavailable(msg) => {
				(StatusCode::SERVICE_UNAVAILABLE, Json(serde_json::json!({ "error": msg })))
					.into_response()
			}
			err @ (Error::DbError | Error::ConfigError(_) | Error::Internal(_) | Error::Io(_)) => {
				tracing::error!("internal error: {}", err);
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					Json(serde_json::json!({ "error": "internal-error" })),
				)
					.into_response()
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_form_errors_shape() {
		let body = serde_json::to_value(FormErrorBody { errors: FormErrors::form("ip-banned") })
			.unwrap();
		assert_eq!(
			body,
			serde_json::json!({ "_errors": { "formErrors": ["ip-banned"], "fieldErrors": {} } })
		);
	}

	#[test]
	fn test_field_errors_shape() {
		let body = serde_json::to_value(FormErrorBody {
			errors: FormErrors::field("url", "invalid-url"),
		})
		.unwrap();
		assert_eq!(body["_errors"]["fieldErrors"]["url"][0], "invalid-url");
		assert_eq!(body["_errors"]["formErrors"], serde_json::json!([]));
	}

	#[test]
	fn test_status_codes() {
		assert_eq!(Error::NotFound.into_response().status(), StatusCode::NOT_FOUND);
		assert_eq!(Error::NotModerator.into_response().status(), StatusCode::FORBIDDEN);
		assert_eq!(Error::Banned("user-banned".into()).into_response().status(), StatusCode::FORBIDDEN);
		assert_eq!(Error::Unauthorized.into_response().status(), StatusCode::UNAUTHORIZED);
		assert_eq!(
			Error::ValidationError("bad".into()).into_response().status(),
			StatusCode::BAD_REQUEST
		);
		assert_eq!(Error::DbError.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(
			Error::ServiceUnavailable("down".into()).into_response().status(),
			StatusCode::SERVICE_UNAVAILABLE
		);
		assert_eq!(Error::Timeout.into_response().status(), StatusCode::BAD_GATEWAY);
	}
}

// vim: ts=4
