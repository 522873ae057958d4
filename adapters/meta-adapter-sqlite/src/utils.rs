//! Shared utilities for the SQLite adapter
//!
//! Error mapping helpers used across the domain modules.

use sqlx::sqlite::SqliteRow;
use stackwatch_types::prelude::*;

/// Parse a comma-separated list produced by `group_concat`
pub(crate) fn parse_str_list(s: Option<&str>) -> Vec<Box<str>> {
	s.map(|s| {
		s.split(',')
			.map(str::trim)
			.filter(|s| !s.is_empty())
			.map(Into::into)
			.collect()
	})
	.unwrap_or_default()
}

/// Log database error for debugging
pub(crate) fn inspect(err: &sqlx::Error) {
	warn!("DB: {:#?}", err);
}

/// Translate a driver error, logging it
pub(crate) fn db_err(err: sqlx::Error) -> Error {
	match err {
		sqlx::Error::RowNotFound => Error::NotFound,
		err => {
			inspect(&err);
			Error::DbError
		}
	}
}

/// Map a single-row query result, translating SQL errors to ClResult
pub(crate) fn map_res<T, F>(row: Result<SqliteRow, sqlx::Error>, f: F) -> ClResult<T>
where
	F: FnOnce(SqliteRow) -> Result<T, sqlx::Error>,
{
	match row {
		Ok(row) => f(row).inspect_err(inspect).map_err(|_| Error::DbError),
		Err(err) => Err(db_err(err)),
	}
}

/// Collect an iterator of row mapping results, translating errors
pub(crate) fn collect_res<T>(
	iter: impl Iterator<Item = Result<T, sqlx::Error>>,
) -> ClResult<Vec<T>> {
	let mut items = Vec::new();
	for item in iter {
		items.push(item.inspect_err(inspect).map_err(|_| Error::DbError)?);
	}
	Ok(items)
}

/// `COUNT(*)` results are never negative
pub(crate) fn to_count(n: i64) -> u64 {
	u64::try_from(n).unwrap_or_default()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_str_list() {
		let expected: Vec<Box<str>> = vec!["a".into(), "b".into(), "c".into()];
		assert_eq!(parse_str_list(Some("a, b,c")), expected);
		assert!(parse_str_list(None).is_empty());
		assert!(parse_str_list(Some("")).is_empty());
	}
}

// vim: ts=4
