//! Ban list backed by the KV store.
//!
//! Lookups during request gating are fail-open: a KV error is logged and the
//! subject is treated as not banned, so a KV outage never blocks traffic.
//! Mutations (moderator actions) propagate KV errors to the caller.

use std::sync::Arc;

use crate::prelude::*;
use stackwatch_types::kv_adapter::{KvAdapter, banned_ip_key, banned_user_key, is_truthy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
	IpBanned,
	UserBanned,
}

impl DenyReason {
	/// Machine readable form-error key
	pub fn as_str(self) -> &'static str {
		match self {
			DenyReason::IpBanned => "ip-banned",
			DenyReason::UserBanned => "user-banned",
		}
	}
}

impl From<DenyReason> for Error {
	fn from(reason: DenyReason) -> Self {
		Error::Banned(reason.as_str().into())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanDecision {
	Allow,
	Deny(DenyReason),
}

#[derive(Debug, Clone)]
pub struct BanList {
	kv: Arc<dyn KvAdapter>,
}

impl BanList {
	pub fn new(kv: Arc<dyn KvAdapter>) -> Self {
		Self { kv }
	}

	/// Fail-open flag lookup
	async fn is_flagged(&self, key: &str) -> bool {
		match self.kv.get(key).await {
			Ok(Some(value)) => is_truthy(&value),
			Ok(None) => false,
			Err(err) => {
				warn!(key = %key, error = %err, "Ban lookup failed, allowing request");
				false
			}
		}
	}

	pub async fn is_ip_banned(&self, ip: &str) -> bool {
		self.is_flagged(&banned_ip_key(ip)).await
	}

	pub async fn is_user_banned(&self, user_id: &str) -> bool {
		self.is_flagged(&banned_user_key(user_id)).await
	}

	/// Decides whether a request may proceed.
	///
	/// The IP is checked first. A banned IP denies regardless of the token.
	pub async fn evaluate(&self, ip: Option<&str>, user_id: Option<&str>) -> BanDecision {
		if let Some(ip) = ip {
			if self.is_ip_banned(ip).await {
				info!(ip = %ip, "Request from banned IP");
				return BanDecision::Deny(DenyReason::IpBanned);
			}
		}
		if let Some(user_id) = user_id {
			if self.is_user_banned(user_id).await {
				info!(user_id = %user_id, "Request from banned user");
				return BanDecision::Deny(DenyReason::UserBanned);
			}
		}
		BanDecision::Allow
	}

	// Mutations
	//***********
	pub async fn ban_ip(&self, ip: &str) -> ClResult<()> {
		self.kv.put(&banned_ip_key(ip), &serde_json::Value::Bool(true)).await
	}

	pub async fn unban_ip(&self, ip: &str) -> ClResult<()> {
		self.kv.delete(&banned_ip_key(ip)).await
	}

	pub async fn ban_user(&self, user_id: &str) -> ClResult<()> {
		self.kv.put(&banned_user_key(user_id), &serde_json::Value::Bool(true)).await
	}

	pub async fn unban_user(&self, user_id: &str) -> ClResult<()> {
		self.kv.delete(&banned_user_key(user_id)).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use stackwatch_types::kv_adapter::MemoryKvAdapter;

	#[derive(Debug)]
	struct BrokenKv;

	#[async_trait]
	impl KvAdapter for BrokenKv {
		async fn get(&self, _key: &str) -> ClResult<Option<serde_json::Value>> {
			Err(Error::KvError("connection refused".into()))
		}
		async fn put(&self, _key: &str, _value: &serde_json::Value) -> ClResult<()> {
			Err(Error::KvError("connection refused".into()))
		}
		async fn delete(&self, _key: &str) -> ClResult<()> {
			Err(Error::KvError("connection refused".into()))
		}
	}

	fn memory_list() -> BanList {
		BanList::new(Arc::new(MemoryKvAdapter::new()))
	}

	#[tokio::test]
	async fn test_allow_when_clean() {
		let bans = memory_list();
		assert_eq!(bans.evaluate(Some("1.2.3.4"), Some("u1")).await, BanDecision::Allow);
		assert_eq!(bans.evaluate(None, None).await, BanDecision::Allow);
	}

	#[tokio::test]
	async fn test_banned_ip_denies_regardless_of_token() {
		let bans = memory_list();
		bans.ban_ip("1.2.3.4").await.unwrap();
		for user in [None, Some("u1"), Some("someone-else")] {
			assert_eq!(
				bans.evaluate(Some("1.2.3.4"), user).await,
				BanDecision::Deny(DenyReason::IpBanned)
			);
		}
		assert_eq!(bans.evaluate(Some("1.2.3.5"), Some("u1")).await, BanDecision::Allow);
	}

	#[tokio::test]
	async fn test_ip_checked_before_user() {
		let bans = memory_list();
		bans.ban_ip("1.2.3.4").await.unwrap();
		bans.ban_user("u1").await.unwrap();
		assert_eq!(
			bans.evaluate(Some("1.2.3.4"), Some("u1")).await,
			BanDecision::Deny(DenyReason::IpBanned)
		);
		assert_eq!(
			bans.evaluate(None, Some("u1")).await,
			BanDecision::Deny(DenyReason::UserBanned)
		);
	}

	#[tokio::test]
	async fn test_unban() {
		let bans = memory_list();
		bans.ban_user("u1").await.unwrap();
		bans.unban_user("u1").await.unwrap();
		assert_eq!(bans.evaluate(None, Some("u1")).await, BanDecision::Allow);
		bans.ban_ip("::1").await.unwrap();
		bans.unban_ip("::1").await.unwrap();
		assert!(!bans.is_ip_banned("::1").await);
	}

	#[tokio::test]
	async fn test_false_flag_is_not_a_ban() {
		let kv = Arc::new(MemoryKvAdapter::new());
		kv.put(&banned_ip_key("1.2.3.4"), &serde_json::json!(false)).await.unwrap();
		let bans = BanList::new(kv);
		assert_eq!(bans.evaluate(Some("1.2.3.4"), None).await, BanDecision::Allow);
	}

	#[tokio::test]
	async fn test_kv_failure_fails_open() {
		let bans = BanList::new(Arc::new(BrokenKv));
		assert_eq!(bans.evaluate(Some("1.2.3.4"), Some("u1")).await, BanDecision::Allow);
		assert!(bans.ban_ip("1.2.3.4").await.is_err());
	}
}

// vim: ts=4
