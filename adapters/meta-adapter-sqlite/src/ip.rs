//! IP addresses and their ban classification

use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use crate::utils::*;
use stackwatch_types::meta_adapter::{BanLevel, Ip};
use stackwatch_types::prelude::*;

fn ip_from_row(row: SqliteRow) -> Result<Ip, sqlx::Error> {
	let value: String = row.try_get("value")?;
	let ban_level: Option<String> = row.try_get("ban_level")?;
	let ban_level = match ban_level {
		None => None,
		Some(level) => Some(
			level
				.parse::<BanLevel>()
				.map_err(|_| sqlx::Error::Decode(format!("invalid ban level: {}", level).into()))?,
		),
	};
	Ok(Ip {
		id: row.try_get("ip_id")?,
		value: value.into(),
		ban_level,
		created_at: Timestamp(row.try_get("created_at")?),
	})
}

pub(crate) async fn read<'e, E>(db: E, value: &str) -> ClResult<Ip>
where
	E: sqlx::SqliteExecutor<'e>,
{
	let res = sqlx::query("SELECT ip_id, value, ban_level, created_at FROM ips WHERE value = ?")
		.bind(value)
		.fetch_one(db)
		.await;
	map_res(res, ip_from_row)
}

/// Inserts the IP if unknown and returns its id. Usable inside a transaction.
pub(crate) async fn ensure_id<'e, E>(db: E, value: &str) -> Result<i64, sqlx::Error>
where
	E: sqlx::SqliteExecutor<'e>,
{
	sqlx::query_scalar(
		"INSERT INTO ips (value, created_at) VALUES (?1, ?2)
		ON CONFLICT(value) DO UPDATE SET value = value
		RETURNING ip_id",
	)
	.bind(value)
	.bind(Timestamp::now().0)
	.fetch_one(db)
	.await
}

pub(crate) async fn ensure(db: &SqlitePool, value: &str) -> ClResult<Ip> {
	ensure_id(db, value).await.map_err(db_err)?;
	read(db, value).await
}

pub(crate) async fn set_ban_level(
	db: &SqlitePool,
	value: &str,
	level: Option<BanLevel>,
) -> ClResult<Ip> {
	sqlx::query(
		"INSERT INTO ips (value, ban_level, created_at) VALUES (?1, ?2, ?3)
		ON CONFLICT(value) DO UPDATE SET ban_level = ?2",
	)
	.bind(value)
	.bind(level.map(BanLevel::as_str))
	.bind(Timestamp::now().0)
	.execute(db)
	.await
	.map_err(db_err)?;

	read(db, value).await
}

pub(crate) async fn count_banned(db: &SqlitePool) -> ClResult<u64> {
	let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ips WHERE ban_level IS NOT NULL")
		.fetch_one(db)
		.await
		.map_err(db_err)?;
	Ok(to_count(n))
}

// vim: ts=4
