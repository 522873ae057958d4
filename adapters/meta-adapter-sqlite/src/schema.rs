//! Database schema initialization
//!
//! Creates tables and indexes if they do not exist yet.

use sqlx::SqlitePool;

/// Initialize the database schema with all required tables and indexes
pub(crate) async fn init_db(db: &SqlitePool) -> Result<(), sqlx::Error> {
	let mut tx = db.begin().await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS globals (
			key text NOT NULL,
			value text,
			PRIMARY KEY(key)
	)",
	)
	.execute(&mut *tx)
	.await?;

	// Users
	//*******
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS users (
		user_id text NOT NULL,
		email text,
		is_mod boolean NOT NULL DEFAULT 0,
		is_banned boolean NOT NULL DEFAULT 0,
		created_at integer NOT NULL DEFAULT (unixepoch()),
		PRIMARY KEY(user_id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email) WHERE email IS NOT NULL")
		.execute(&mut *tx)
		.await?;

	// IPs
	//*****
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS ips (
		ip_id integer NOT NULL,
		value text NOT NULL UNIQUE,
		ban_level text CHECK (ban_level IN ('soft', 'hard')),
		created_at integer NOT NULL DEFAULT (unixepoch()),
		PRIMARY KEY(ip_id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	// Interactions
	//**************
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS interactions (
		interaction_id integer NOT NULL,
		type text NOT NULL,
		user_id text,
		ip_id integer REFERENCES ips(ip_id),
		data json,
		created_at integer NOT NULL DEFAULT (unixepoch()),
		PRIMARY KEY(interaction_id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_interactions_created ON interactions(created_at DESC)",
	)
	.execute(&mut *tx)
	.await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS interaction_users (
		interaction_id integer NOT NULL REFERENCES interactions(interaction_id) ON DELETE CASCADE,
		user_id text NOT NULL,
		PRIMARY KEY(interaction_id, user_id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS interaction_ips (
		interaction_id integer NOT NULL REFERENCES interactions(interaction_id) ON DELETE CASCADE,
		ip_id integer NOT NULL REFERENCES ips(ip_id),
		PRIMARY KEY(interaction_id, ip_id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	// Watches
	//*********
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS watches (
		watch_id integer NOT NULL,
		user_id text NOT NULL,
		url text NOT NULL,
		email text NOT NULL,
		last_hash text,
		last_checked_at integer,
		last_changed_at integer,
		created_at integer NOT NULL DEFAULT (unixepoch()),
		PRIMARY KEY(watch_id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	sqlx::query("CREATE INDEX IF NOT EXISTS idx_watches_user ON watches(user_id)")
		.execute(&mut *tx)
		.await?;

	tx.commit().await?;

	Ok(())
}

// vim: ts=4
