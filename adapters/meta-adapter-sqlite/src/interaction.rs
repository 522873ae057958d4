//! Interaction log
//!
//! Append-only audit trail. Target users and IPs live in join tables and are
//! folded back with `group_concat` when listing.

use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use crate::{ip, utils::*};
use stackwatch_types::meta_adapter::{CreateInteraction, Interaction, ListInteractionOptions};
use stackwatch_types::prelude::*;

pub(crate) async fn create(db: &SqlitePool, interaction: &CreateInteraction<'_>) -> ClResult<i64> {
	let mut tx = db.begin().await.map_err(db_err)?;

	let ip_id = match interaction.ip {
		Some(value) => Some(ip::ensure_id(&mut *tx, value).await.map_err(db_err)?),
		None => None,
	};

	let interaction_id: i64 = sqlx::query_scalar(
		"INSERT INTO interactions (type, user_id, ip_id, data, created_at)
		VALUES (?, ?, ?, ?, ?) RETURNING interaction_id",
	)
	.bind(interaction.typ.as_str())
	.bind(interaction.user_id)
	.bind(ip_id)
	.bind(interaction.data.to_string())
	.bind(Timestamp::now().0)
	.fetch_one(&mut *tx)
	.await
	.map_err(db_err)?;

	for user_id in interaction.target_users {
		sqlx::query(
			"INSERT INTO interaction_users (interaction_id, user_id) VALUES (?, ?)
			ON CONFLICT DO NOTHING",
		)
		.bind(interaction_id)
		.bind(*user_id)
		.execute(&mut *tx)
		.await
		.map_err(db_err)?;
	}

	for value in interaction.target_ips {
		let target_ip_id = ip::ensure_id(&mut *tx, value).await.map_err(db_err)?;
		sqlx::query(
			"INSERT INTO interaction_ips (interaction_id, ip_id) VALUES (?, ?)
			ON CONFLICT DO NOTHING",
		)
		.bind(interaction_id)
		.bind(target_ip_id)
		.execute(&mut *tx)
		.await
		.map_err(db_err)?;
	}

	tx.commit().await.map_err(db_err)?;
	Ok(interaction_id)
}

fn interaction_from_row(row: SqliteRow) -> Result<Interaction, sqlx::Error> {
	let typ: String = row.try_get("type")?;
	let typ = typ
		.parse()
		.map_err(|_| sqlx::Error::Decode(format!("invalid interaction type: {}", typ).into()))?;
	let user_id: Option<String> = row.try_get("user_id")?;
	let ip: Option<String> = row.try_get("ip")?;
	let data: Option<String> = row.try_get("data")?;
	let data = match data {
		Some(data) => serde_json::from_str(&data).map_err(|e| sqlx::Error::Decode(e.into()))?,
		None => serde_json::Value::Null,
	};
	let target_users: Option<String> = row.try_get("target_users")?;
	let target_ips: Option<String> = row.try_get("target_ips")?;

	Ok(Interaction {
		id: row.try_get("interaction_id")?,
		typ,
		created_at: Timestamp(row.try_get("created_at")?),
		user_id: user_id.map(Into::into),
		ip: ip.map(Into::into),
		target_users: parse_str_list(target_users.as_deref()),
		target_ips: parse_str_list(target_ips.as_deref()),
		data,
	})
}

pub(crate) async fn list(db: &SqlitePool, opts: &ListInteractionOptions) -> ClResult<Vec<Interaction>> {
	let rows = sqlx::query(
		"SELECT i.interaction_id, i.type, i.user_id, p.value AS ip, i.data, i.created_at,
			(SELECT group_concat(iu.user_id, ',') FROM interaction_users iu
				WHERE iu.interaction_id = i.interaction_id) AS target_users,
			(SELECT group_concat(t.value, ',') FROM interaction_ips ii
				JOIN ips t ON t.ip_id = ii.ip_id
				WHERE ii.interaction_id = i.interaction_id) AS target_ips
		FROM interactions i
		LEFT JOIN ips p ON p.ip_id = i.ip_id
		ORDER BY i.created_at DESC, i.interaction_id DESC
		LIMIT ? OFFSET ?",
	)
	.bind(i64::from(opts.limit))
	.bind(i64::from(opts.offset))
	.fetch_all(db)
	.await
	.map_err(db_err)?;

	collect_res(rows.into_iter().map(interaction_from_row))
}

pub(crate) async fn count(db: &SqlitePool) -> ClResult<u64> {
	let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM interactions")
		.fetch_one(db)
		.await
		.map_err(db_err)?;
	Ok(to_count(n))
}

// vim: ts=4
