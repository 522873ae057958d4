//! Utility functions

use rand::RngExt;

pub const ID_LENGTH: usize = 24;
pub const SAFE: [char; 62] = [
	'0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
	'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B',
	'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U',
	'V', 'W', 'X', 'Y', 'Z',
];

/// Generate an anonymous user identifier.
///
/// `ID_LENGTH` characters drawn uniformly from the alphanumeric `SAFE` alphabet.
pub fn random_id() -> String {
	let mut rng = rand::rng();
	let mut result = String::with_capacity(ID_LENGTH);

	for _ in 0..ID_LENGTH {
		result.push(SAFE[rng.random_range(0..SAFE.len())]);
	}
	result
}

/// Whether `id` has the shape produced by [`random_id`]
pub fn is_valid_id(id: &str) -> bool {
	id.len() == ID_LENGTH && id.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Minimal email sanity check: one `@`, non-empty local part, dotted domain.
pub fn is_valid_email(email: &str) -> bool {
	let Some((local, domain)) = email.split_once('@') else {
		return false;
	};
	!local.is_empty()
		&& !domain.contains('@')
		&& domain.contains('.')
		&& !domain.starts_with('.')
		&& !domain.ends_with('.')
		&& !email.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_random_id_shape() {
		let id = random_id();
		assert_eq!(id.len(), ID_LENGTH);
		assert!(id.chars().all(|c| SAFE.contains(&c)));
		assert!(is_valid_id(&id));
	}

	#[test]
	fn test_random_id_unique() {
		assert_ne!(random_id(), random_id());
	}

	#[test]
	fn test_is_valid_email() {
		assert!(is_valid_email("alice@example.com"));
		assert!(!is_valid_email("alice"));
		assert!(!is_valid_email("@example.com"));
		assert!(!is_valid_email("alice@example"));
		assert!(!is_valid_email("alice@@example.com"));
		assert!(!is_valid_email("al ice@example.com"));
	}
}

// vim: ts=4
