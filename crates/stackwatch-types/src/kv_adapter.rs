//! Adapter for the external key-value store holding the ban list.
//!
//! The store speaks a plain GET / PUT / DELETE contract over JSON values.
//! A missing key reads as `None`, deleting a missing key is not an error.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Debug;

use crate::prelude::*;

const BANNED_IP_PREFIX: &str = "banned_ip:";
const BANNED_USER_PREFIX: &str = "banned_user:";

/// KV key of an IP ban flag
pub fn banned_ip_key(ip: &str) -> String {
	format!("{}{}", BANNED_IP_PREFIX, ip)
}

/// KV key of a user ban flag
pub fn banned_user_key(user_id: &str) -> String {
	format!("{}{}", BANNED_USER_PREFIX, user_id)
}

/// Ban flags are JSON `true`. Anything else (null, false, garbage) is not a ban.
pub fn is_truthy(value: &serde_json::Value) -> bool {
	match value {
		serde_json::Value::Bool(b) => *b,
		serde_json::Value::Null => false,
		serde_json::Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
		serde_json::Value::String(s) => !s.is_empty() && s != "false" && s != "0",
		serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
	}
}

#[async_trait]
pub trait KvAdapter: Debug + Send + Sync {
	/// Reads a key. Returns `Ok(None)` when the key does not exist.
	async fn get(&self, key: &str) -> ClResult<Option<serde_json::Value>>;

	/// Stores a JSON value under a key, replacing any previous value
	async fn put(&self, key: &str, value: &serde_json::Value) -> ClResult<()>;

	/// Deletes a key. Deleting a missing key succeeds.
	async fn delete(&self, key: &str) -> ClResult<()>;
}

/// In-process KV store, used for development and tests
#[derive(Debug, Default)]
pub struct MemoryKvAdapter {
	data: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryKvAdapter {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl KvAdapter for MemoryKvAdapter {
	async fn get(&self, key: &str) -> ClResult<Option<serde_json::Value>> {
		Ok(self.data.read().get(key).cloned())
	}

	async fn put(&self, key: &str, value: &serde_json::Value) -> ClResult<()> {
		self.data.write().insert(key.to_string(), value.clone());
		Ok(())
	}

	async fn delete(&self, key: &str) -> ClResult<()> {
		self.data.write().remove(key);
		Ok(())
	}
}


// vim: ts=4
