//! Adapter that manages the relational data: users, IPs, the interaction log
//! and website watches.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fmt::Debug;
use std::str::FromStr;

use crate::{
	prelude::*,
	types::{serialize_timestamp_iso, serialize_timestamp_iso_opt},
};

// Users //
//*******//

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
	pub id: Box<str>,
	pub email: Option<Box<str>>,
	pub is_mod: bool,
	pub is_banned: bool,
	#[serde(serialize_with = "serialize_timestamp_iso")]
	pub created_at: Timestamp,
}

// IPs //
//*****//

/// Ban classification kept in the relational store for the dashboard.
/// The KV flag is what actually blocks traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BanLevel {
	Soft,
	Hard,
}

impl BanLevel {
	pub fn as_str(self) -> &'static str {
		match self {
			BanLevel::Soft => "soft",
			BanLevel::Hard => "hard",
		}
	}
}

impl FromStr for BanLevel {
	type Err = Error;

	fn from_str(s: &str) -> ClResult<Self> {
		match s {
			"soft" => Ok(BanLevel::Soft),
			"hard" => Ok(BanLevel::Hard),
			_ => Err(Error::Parse),
		}
	}
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ip {
	pub id: i64,
	pub value: Box<str>,
	pub ban_level: Option<BanLevel>,
	#[serde(serialize_with = "serialize_timestamp_iso")]
	pub created_at: Timestamp,
}

// Interactions //
//**************//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
	Detect,
	WatchCreate,
	WatchDelete,
	BanIp,
	UnbanIp,
	BanUser,
	UnbanUser,
	PromoteMod,
	Broadcast,
}

impl InteractionType {
	pub fn as_str(self) -> &'static str {
		match self {
			InteractionType::Detect => "detect",
			InteractionType::WatchCreate => "watch_create",
			InteractionType::WatchDelete => "watch_delete",
			InteractionType::BanIp => "ban_ip",
			InteractionType::UnbanIp => "unban_ip",
			InteractionType::BanUser => "ban_user",
			InteractionType::UnbanUser => "unban_user",
			InteractionType::PromoteMod => "promote_mod",
			InteractionType::Broadcast => "broadcast",
		}
	}
}

impl FromStr for InteractionType {
	type Err = Error;

	fn from_str(s: &str) -> ClResult<Self> {
		Ok(match s {
			"detect" => InteractionType::Detect,
			"watch_create" => InteractionType::WatchCreate,
			"watch_delete" => InteractionType::WatchDelete,
			"ban_ip" => InteractionType::BanIp,
			"unban_ip" => InteractionType::UnbanIp,
			"ban_user" => InteractionType::BanUser,
			"unban_user" => InteractionType::UnbanUser,
			"promote_mod" => InteractionType::PromoteMod,
			"broadcast" => InteractionType::Broadcast,
			_ => return Err(Error::Parse),
		})
	}
}

/// Audit log entry
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
	pub id: i64,
	#[serde(rename = "type")]
	pub typ: InteractionType,
	#[serde(serialize_with = "serialize_timestamp_iso")]
	pub created_at: Timestamp,
	pub user_id: Option<Box<str>>,
	/// Value of the IP the interaction came from
	pub ip: Option<Box<str>>,
	pub target_users: Vec<Box<str>>,
	pub target_ips: Vec<Box<str>>,
	pub data: serde_json::Value,
}

#[derive(Debug)]
pub struct CreateInteraction<'a> {
	pub typ: InteractionType,
	pub user_id: Option<&'a str>,
	/// Origin IP value. The row is created if it does not exist yet.
	pub ip: Option<&'a str>,
	pub target_users: &'a [&'a str],
	pub target_ips: &'a [&'a str],
	pub data: serde_json::Value,
}

#[derive(Debug, Clone, Copy)]
pub struct ListInteractionOptions {
	pub limit: u32,
	pub offset: u32,
}

// Watches //
//*********//

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Watch {
	pub id: i64,
	pub user_id: Box<str>,
	pub url: Box<str>,
	pub email: Box<str>,
	#[serde(skip)]
	pub last_hash: Option<Box<str>>,
	#[serde(
		serialize_with = "serialize_timestamp_iso_opt",
		skip_serializing_if = "Option::is_none"
	)]
	pub last_checked_at: Option<Timestamp>,
	#[serde(
		serialize_with = "serialize_timestamp_iso_opt",
		skip_serializing_if = "Option::is_none"
	)]
	pub last_changed_at: Option<Timestamp>,
	#[serde(serialize_with = "serialize_timestamp_iso")]
	pub created_at: Timestamp,
}

#[derive(Debug)]
pub struct CreateWatch<'a> {
	pub user_id: &'a str,
	pub url: &'a str,
	pub email: &'a str,
}

/// Result of a single watch check, written back by `update_watch_check`
#[derive(Debug)]
pub struct WatchCheck<'a> {
	pub hash: &'a str,
	pub checked_at: Timestamp,
	pub changed: bool,
}

// Adapter //
//*********//

#[async_trait]
pub trait MetaAdapter: Debug + Send + Sync {
	// Users
	//*******
	async fn read_user(&self, user_id: &str) -> ClResult<User>;

	/// Returns the user row, inserting a fresh one if the id is unknown
	async fn ensure_user(&self, user_id: &str) -> ClResult<User>;
	async fn update_user_email(&self, user_id: &str, email: Option<&str>) -> ClResult<()>;
	async fn set_user_mod(&self, user_id: &str, is_mod: bool) -> ClResult<()>;
	async fn set_user_banned(&self, user_id: &str, is_banned: bool) -> ClResult<()>;
	async fn list_users_with_email(&self) -> ClResult<Vec<User>>;

	// IPs
	//*****
	async fn read_ip(&self, value: &str) -> ClResult<Ip>;
	async fn ensure_ip(&self, value: &str) -> ClResult<Ip>;
	async fn set_ip_ban_level(&self, value: &str, level: Option<BanLevel>) -> ClResult<Ip>;

	// Interactions
	//**************
	async fn create_interaction(&self, interaction: &CreateInteraction<'_>) -> ClResult<i64>;
	async fn list_interactions(&self, opts: &ListInteractionOptions) -> ClResult<Vec<Interaction>>;

	// Dashboard counts
	//******************
	async fn count_users(&self) -> ClResult<u64>;
	async fn count_banned_users(&self) -> ClResult<u64>;
	async fn count_banned_ips(&self) -> ClResult<u64>;
	async fn count_interactions(&self) -> ClResult<u64>;

	// Watches
	//*********
	async fn create_watch(&self, watch: &CreateWatch<'_>) -> ClResult<Watch>;
	async fn read_watch(&self, watch_id: i64) -> ClResult<Watch>;
	async fn list_watches_by_user(&self, user_id: &str) -> ClResult<Vec<Watch>>;
	async fn list_watches(&self) -> ClResult<Vec<Watch>>;
	async fn count_watches_by_user(&self, user_id: &str) -> ClResult<u64>;
	async fn delete_watch(&self, watch_id: i64) -> ClResult<()>;
	async fn update_watch_check(&self, watch_id: i64, check: &WatchCheck<'_>) -> ClResult<()>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_interaction_type_names() {
		for typ in [
			InteractionType::Detect,
			InteractionType::WatchCreate,
			InteractionType::BanIp,
			InteractionType::PromoteMod,
			InteractionType::Broadcast,
		] {
			assert_eq!(typ.as_str().parse::<InteractionType>().unwrap(), typ);
			assert_eq!(serde_json::to_value(typ).unwrap(), serde_json::json!(typ.as_str()));
		}
	}

	#[test]
	fn test_ban_level_parse() {
		assert_eq!("soft".parse::<BanLevel>().unwrap(), BanLevel::Soft);
		assert_eq!("hard".parse::<BanLevel>().unwrap(), BanLevel::Hard);
		assert!("medium".parse::<BanLevel>().is_err());
	}

	#[test]
	fn test_watch_hides_hash() {
		let watch = Watch {
			id: 1,
			user_id: "u".into(),
			url: "https://example.com".into(),
			email: "a@example.com".into(),
			last_hash: Some("abc".into()),
			last_checked_at: None,
			last_changed_at: None,
			created_at: Timestamp(0),
		};
		let value = serde_json::to_value(&watch).unwrap();
		assert!(value.get("lastHash").is_none());
		assert!(value.get("lastCheckedAt").is_none());
		assert_eq!(value["createdAt"], "1970-01-01T00:00:00Z");
	}
}

// vim: ts=4
