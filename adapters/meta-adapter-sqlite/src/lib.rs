//! SQLite implementation of the Stackwatch `MetaAdapter`.
//!
//! One database file (`meta.db`) in the configured directory, WAL journal,
//! a small connection pool. Queries live in one module per entity.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

mod interaction;
mod ip;
mod schema;
mod user;
mod utils;
mod watch;

use async_trait::async_trait;
use sqlx::sqlite::{self, SqlitePool};
use std::path::Path;

use stackwatch_types::meta_adapter::{
	self, BanLevel, CreateInteraction, CreateWatch, Interaction, Ip, ListInteractionOptions, User,
	Watch, WatchCheck,
};
use stackwatch_types::prelude::*;

#[derive(Debug)]
pub struct MetaAdapterSqlite {
	db: SqlitePool,
}

impl MetaAdapterSqlite {
	/// Opens (creating if needed) `meta.db` inside `db_dir`
	pub async fn new(db_dir: impl AsRef<Path>) -> ClResult<Self> {
		let db_dir = db_dir.as_ref();
		tokio::fs::create_dir_all(db_dir).await?;

		let opts = sqlite::SqliteConnectOptions::new()
			.filename(db_dir.join("meta.db"))
			.create_if_missing(true)
			.foreign_keys(true)
			.journal_mode(sqlite::SqliteJournalMode::Wal);
		let db = sqlite::SqlitePoolOptions::new()
			.max_connections(5)
			.connect_with(opts)
			.await
			.inspect_err(|err| error!("DB connect error: {:#?}", err))
			.or(Err(Error::DbError))?;

		schema::init_db(&db)
			.await
			.inspect_err(|err| error!("DB schema error: {:#?}", err))
			.or(Err(Error::DbError))?;

		Ok(Self { db })
	}
}

#[async_trait]
impl meta_adapter::MetaAdapter for MetaAdapterSqlite {
	// Users
	//*******
	async fn read_user(&self, user_id: &str) -> ClResult<User> {
		user::read(&self.db, user_id).await
	}

	async fn ensure_user(&self, user_id: &str) -> ClResult<User> {
		user::ensure(&self.db, user_id).await
	}

	async fn update_user_email(&self, user_id: &str, email: Option<&str>) -> ClResult<()> {
		user::update_email(&self.db, user_id, email).await
	}

	async fn set_user_mod(&self, user_id: &str, is_mod: bool) -> ClResult<()> {
		user::set_mod(&self.db, user_id, is_mod).await
	}

	async fn set_user_banned(&self, user_id: &str, is_banned: bool) -> ClResult<()> {
		user::set_banned(&self.db, user_id, is_banned).await
	}

	async fn list_users_with_email(&self) -> ClResult<Vec<User>> {
		user::list_with_email(&self.db).await
	}

	// IPs
	//*****
	async fn read_ip(&self, value: &str) -> ClResult<Ip> {
		ip::read(&self.db, value).await
	}

	async fn ensure_ip(&self, value: &str) -> ClResult<Ip> {
		ip::ensure(&self.db, value).await
	}

	async fn set_ip_ban_level(&self, value: &str, level: Option<BanLevel>) -> ClResult<Ip> {
		ip::set_ban_level(&self.db, value, level).await
	}

	// Interactions
	//**************
	async fn create_interaction(&self, interaction: &CreateInteraction<'_>) -> ClResult<i64> {
		interaction::create(&self.db, interaction).await
	}

	async fn list_interactions(&self, opts: &ListInteractionOptions) -> ClResult<Vec<Interaction>> {
		interaction::list(&self.db, opts).await
	}

	// Dashboard counts
	//******************
	async fn count_users(&self) -> ClResult<u64> {
		user::count(&self.db, false).await
	}

	async fn count_banned_users(&self) -> ClResult<u64> {
		user::count(&self.db, true).await
	}

	async fn count_banned_ips(&self) -> ClResult<u64> {
		ip::count_banned(&self.db).await
	}

	async fn count_interactions(&self) -> ClResult<u64> {
		interaction::count(&self.db).await
	}

	// Watches
	//*********
	async fn create_watch(&self, watch: &CreateWatch<'_>) -> ClResult<Watch> {
		watch::create(&self.db, watch).await
	}

	async fn read_watch(&self, watch_id: i64) -> ClResult<Watch> {
		watch::read(&self.db, watch_id).await
	}

	async fn list_watches_by_user(&self, user_id: &str) -> ClResult<Vec<Watch>> {
		watch::list(&self.db, Some(user_id)).await
	}

	async fn list_watches(&self) -> ClResult<Vec<Watch>> {
		watch::list(&self.db, None).await
	}

	async fn count_watches_by_user(&self, user_id: &str) -> ClResult<u64> {
		watch::count_by_user(&self.db, user_id).await
	}

	async fn delete_watch(&self, watch_id: i64) -> ClResult<()> {
		watch::delete(&self.db, watch_id).await
	}

	async fn update_watch_check(&self, watch_id: i64, check: &WatchCheck<'_>) -> ClResult<()> {
		watch::update_check(&self.db, watch_id, check).await
	}
}

// vim: ts=4
