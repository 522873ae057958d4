//! Website watches

use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use crate::utils::*;
use stackwatch_types::meta_adapter::{CreateWatch, Watch, WatchCheck};
use stackwatch_types::prelude::*;

const WATCH_COLUMNS: &str =
	"watch_id, user_id, url, email, last_hash, last_checked_at, last_changed_at, created_at";

fn watch_from_row(row: SqliteRow) -> Result<Watch, sqlx::Error> {
	let user_id: String = row.try_get("user_id")?;
	let url: String = row.try_get("url")?;
	let email: String = row.try_get("email")?;
	let last_hash: Option<String> = row.try_get("last_hash")?;
	let last_checked_at: Option<i64> = row.try_get("last_checked_at")?;
	let last_changed_at: Option<i64> = row.try_get("last_changed_at")?;
	Ok(Watch {
		id: row.try_get("watch_id")?,
		user_id: user_id.into(),
		url: url.into(),
		email: email.into(),
		last_hash: last_hash.map(Into::into),
		last_checked_at: last_checked_at.map(Timestamp),
		last_changed_at: last_changed_at.map(Timestamp),
		created_at: Timestamp(row.try_get("created_at")?),
	})
}

pub(crate) async fn create(db: &SqlitePool, watch: &CreateWatch<'_>) -> ClResult<Watch> {
	let res = sqlx::query(&format!(
		"INSERT INTO watches (user_id, url, email, created_at) VALUES (?, ?, ?, ?)
		RETURNING {}",
		WATCH_COLUMNS
	))
	.bind(watch.user_id)
	.bind(watch.url)
	.bind(watch.email)
	.bind(Timestamp::now().0)
	.fetch_one(db)
	.await;
	map_res(res, watch_from_row)
}

pub(crate) async fn read(db: &SqlitePool, watch_id: i64) -> ClResult<Watch> {
	let res = sqlx::query(&format!("SELECT {} FROM watches WHERE watch_id = ?", WATCH_COLUMNS))
		.bind(watch_id)
		.fetch_one(db)
		.await;
	map_res(res, watch_from_row)
}

pub(crate) async fn list(db: &SqlitePool, user_id: Option<&str>) -> ClResult<Vec<Watch>> {
	let rows = if let Some(user_id) = user_id {
		sqlx::query(&format!(
			"SELECT {} FROM watches WHERE user_id = ? ORDER BY created_at, watch_id",
			WATCH_COLUMNS
		))
		.bind(user_id)
		.fetch_all(db)
		.await
	} else {
		sqlx::query(&format!("SELECT {} FROM watches ORDER BY watch_id", WATCH_COLUMNS))
			.fetch_all(db)
			.await
	}
	.map_err(db_err)?;

	collect_res(rows.into_iter().map(watch_from_row))
}

pub(crate) async fn count_by_user(db: &SqlitePool, user_id: &str) -> ClResult<u64> {
	let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM watches WHERE user_id = ?")
		.bind(user_id)
		.fetch_one(db)
		.await
		.map_err(db_err)?;
	Ok(to_count(n))
}

pub(crate) async fn delete(db: &SqlitePool, watch_id: i64) -> ClResult<()> {
	let res = sqlx::query("DELETE FROM watches WHERE watch_id = ?")
		.bind(watch_id)
		.execute(db)
		.await
		.map_err(db_err)?;
	if res.rows_affected() == 0 {
		return Err(Error::NotFound);
	}
	Ok(())
}

pub(crate) async fn update_check(db: &SqlitePool, watch_id: i64, check: &WatchCheck<'_>) -> ClResult<()> {
	let res = sqlx::query(
		"UPDATE watches SET last_hash = ?1, last_checked_at = ?2,
			last_changed_at = CASE WHEN ?3 THEN ?2 ELSE last_changed_at END
		WHERE watch_id = ?4",
	)
	.bind(check.hash)
	.bind(check.checked_at.0)
	.bind(check.changed)
	.bind(watch_id)
	.execute(db)
	.await
	.map_err(db_err)?;
	if res.rows_affected() == 0 {
		return Err(Error::NotFound);
	}
	Ok(())
}

// vim: ts=4
