//! Moderation API handlers, every route is behind `require_moderator`

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod ban;
pub mod broadcast;
pub mod stats;
pub mod user;

mod prelude;

use crate::prelude::*;

const MAX_USER_ID_LENGTH: usize = 64;

/// User ids are opaque, but always short and URL safe
pub(crate) fn validate_user_id(user_id: &str) -> ClResult<&str> {
	let user_id = user_id.trim();
	if user_id.is_empty() {
		return Err(Error::FieldError { field: "userId".into(), message: "required".into() });
	}
	if user_id.len() > MAX_USER_ID_LENGTH
		|| !user_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
	{
		return Err(Error::FieldError { field: "userId".into(), message: "invalid-user-id".into() });
	}
	Ok(user_id)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_validate_user_id() {
		assert_eq!(validate_user_id(" abcDEF123 ").unwrap(), "abcDEF123");
		assert_eq!(validate_user_id("mod_user-1").unwrap(), "mod_user-1");
		assert!(validate_user_id("").is_err());
		assert!(validate_user_id("a/b").is_err());
		assert!(validate_user_id(&"x".repeat(65)).is_err());
	}
}

// vim: ts=4
