//! Users
//!
//! User rows are created lazily. Every mutation is an upsert, so moderators
//! can act on ids that never hit an endpoint writing the row.

use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use crate::utils::*;
use stackwatch_types::meta_adapter::User;
use stackwatch_types::prelude::*;

const USER_COLUMNS: &str = "user_id, email, is_mod, is_banned, created_at";

fn user_from_row(row: SqliteRow) -> Result<User, sqlx::Error> {
	let user_id: String = row.try_get("user_id")?;
	let email: Option<String> = row.try_get("email")?;
	Ok(User {
		id: user_id.into(),
		email: email.map(Into::into),
		is_mod: row.try_get("is_mod")?,
		is_banned: row.try_get("is_banned")?,
		created_at: Timestamp(row.try_get("created_at")?),
	})
}

pub(crate) async fn read(db: &SqlitePool, user_id: &str) -> ClResult<User> {
	let res = sqlx::query(&format!("SELECT {} FROM users WHERE user_id = ?", USER_COLUMNS))
		.bind(user_id)
		.fetch_one(db)
		.await;
	map_res(res, user_from_row)
}

pub(crate) async fn ensure(db: &SqlitePool, user_id: &str) -> ClResult<User> {
	sqlx::query(
		"INSERT INTO users (user_id, created_at) VALUES (?, ?) ON CONFLICT(user_id) DO NOTHING",
	)
	.bind(user_id)
	.bind(Timestamp::now().0)
	.execute(db)
	.await
	.map_err(db_err)?;

	read(db, user_id).await
}

pub(crate) async fn update_email(db: &SqlitePool, user_id: &str, email: Option<&str>) -> ClResult<()> {
	sqlx::query(
		"INSERT INTO users (user_id, email, created_at) VALUES (?1, ?2, ?3)
		ON CONFLICT(user_id) DO UPDATE SET email = ?2",
	)
	.bind(user_id)
	.bind(email)
	.bind(Timestamp::now().0)
	.execute(db)
	.await
	.map_err(db_err)?;
	Ok(())
}

pub(crate) async fn set_mod(db: &SqlitePool, user_id: &str, is_mod: bool) -> ClResult<()> {
	sqlx::query(
		"INSERT INTO users (user_id, is_mod, created_at) VALUES (?1, ?2, ?3)
		ON CONFLICT(user_id) DO UPDATE SET is_mod = ?2",
	)
	.bind(user_id)
	.bind(is_mod)
	.bind(Timestamp::now().0)
	.execute(db)
	.await
	.map_err(db_err)?;
	Ok(())
}

pub(crate) async fn set_banned(db: &SqlitePool, user_id: &str, is_banned: bool) -> ClResult<()> {
	sqlx::query(
		"INSERT INTO users (user_id, is_banned, created_at) VALUES (?1, ?2, ?3)
		ON CONFLICT(user_id) DO UPDATE SET is_banned = ?2",
	)
	.bind(user_id)
	.bind(is_banned)
	.bind(Timestamp::now().0)
	.execute(db)
	.await
	.map_err(db_err)?;
	Ok(())
}

pub(crate) async fn list_with_email(db: &SqlitePool) -> ClResult<Vec<User>> {
	let rows = sqlx::query(&format!(
		"SELECT {} FROM users WHERE email IS NOT NULL AND email != '' ORDER BY created_at, user_id",
		USER_COLUMNS
	))
	.fetch_all(db)
	.await
	.map_err(db_err)?;

	collect_res(rows.into_iter().map(user_from_row))
}

pub(crate) async fn count(db: &SqlitePool, banned_only: bool) -> ClResult<u64> {
	let sql = if banned_only {
		"SELECT COUNT(*) FROM users WHERE is_banned"
	} else {
		"SELECT COUNT(*) FROM users"
	};
	let n: i64 = sqlx::query_scalar(sql).fetch_one(db).await.map_err(db_err)?;
	Ok(to_count(n))
}

// vim: ts=4
