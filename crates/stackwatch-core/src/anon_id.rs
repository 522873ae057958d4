//! Tiered persistence of the anonymous visitor identifier.
//!
//! Clients that cannot rely on the identity cookie remember a generated
//! identifier in the best storage tier available: a durable store first, then
//! a session scoped one.
//! Once any tier holds a value it is returned unchanged on every later call.
//!
//! The server itself never calls this; browsers keep their identity in the
//! token cookie. It is the library API for non-browser clients (CLI tools,
//! scripts) that need a stable visitor id across runs:
//!
//! ```no_run
//! use stackwatch_core::anon_id::{AnonymousIdentity, FileStore, MemoryStore};
//!
//! let ids = AnonymousIdentity::new(
//! 	Box::new(FileStore::new("/var/lib/myclient/visitor-id")),
//! 	Box::new(MemoryStore::new()),
//! );
//! let visitor_id = ids.get_or_create();
//! ```

use parking_lot::Mutex;
use std::path::PathBuf;

use crate::prelude::*;
use stackwatch_types::utils::{is_valid_id, random_id};

/// One persistence tier
pub trait IdentityStore: Send + Sync {
	fn read(&self) -> ClResult<Option<String>>;
	fn write(&self, id: &str) -> ClResult<()>;
}

/// Process memory tier, lives as long as the value
#[derive(Debug, Default)]
pub struct MemoryStore {
	value: Mutex<Option<String>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl IdentityStore for MemoryStore {
	fn read(&self) -> ClResult<Option<String>> {
		Ok(self.value.lock().clone())
	}

	fn write(&self, id: &str) -> ClResult<()> {
		*self.value.lock() = Some(id.to_string());
		Ok(())
	}
}

/// File tier: the identifier is the whole file content
#[derive(Debug)]
pub struct FileStore {
	path: PathBuf,
}

impl FileStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

impl IdentityStore for FileStore {
	fn read(&self) -> ClResult<Option<String>> {
		match std::fs::read_to_string(&self.path) {
			Ok(content) => {
				let id = content.trim();
				Ok(is_valid_id(id).then(|| id.to_string()))
			}
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(err) => Err(err.into()),
		}
	}

	fn write(&self, id: &str) -> ClResult<()> {
		if let Some(parent) = self.path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(&self.path, id)?;
		Ok(())
	}
}

pub struct AnonymousIdentity {
	durable: Box<dyn IdentityStore>,
	session: Box<dyn IdentityStore>,
}

impl AnonymousIdentity {
	pub fn new(durable: Box<dyn IdentityStore>, session: Box<dyn IdentityStore>) -> Self {
		Self { durable, session }
	}

	/// Returns the stored identifier, creating and persisting one if no tier
	/// has it. If neither tier accepts the write the fresh identifier is
	/// returned unpersisted.
	pub fn get_or_create(&self) -> String {
		for (tier, store) in [("durable", &self.durable), ("session", &self.session)] {
			match store.read() {
				Ok(Some(id)) => return id,
				Ok(None) => {}
				Err(err) => debug!(tier, "Identity store read failed: {}", err),
			}
		}

		let id = random_id();
		for (tier, store) in [("durable", &self.durable), ("session", &self.session)] {
			match store.write(&id) {
				Ok(()) => return id,
				Err(err) => warn!(tier, "Identity store write failed: {}", err),
			}
		}
		warn!("No identity store accepted the identifier, continuing unpersisted");
		id
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	/// Tier that always fails, counting attempts
	#[derive(Default)]
	struct BrokenStore {
		writes: Arc<AtomicUsize>,
	}

	impl IdentityStore for BrokenStore {
		fn read(&self) -> ClResult<Option<String>> {
			Err(Error::ServiceUnavailable("storage disabled".into()))
		}
		fn write(&self, _id: &str) -> ClResult<()> {
			self.writes.fetch_add(1, Ordering::SeqCst);
			Err(Error::ServiceUnavailable("storage disabled".into()))
		}
	}

	#[test]
	fn test_durable_tier_is_stable() {
		let anon = AnonymousIdentity::new(Box::new(MemoryStore::new()), Box::new(MemoryStore::new()));
		let first = anon.get_or_create();
		assert!(is_valid_id(&first));
		assert_eq!(anon.get_or_create(), first);
	}

	#[test]
	fn test_falls_back_to_session_tier() {
		let anon = AnonymousIdentity::new(Box::new(BrokenStore::default()), Box::new(MemoryStore::new()));
		let first = anon.get_or_create();
		assert_eq!(anon.get_or_create(), first);
	}

	#[test]
	fn test_existing_session_value_is_used() {
		let session = MemoryStore::new();
		session.write("abcdefghijklmnopqrstuvwx").unwrap();
		let anon = AnonymousIdentity::new(Box::new(MemoryStore::new()), Box::new(session));
		assert_eq!(anon.get_or_create(), "abcdefghijklmnopqrstuvwx");
	}

	#[test]
	fn test_unpersisted_when_all_tiers_fail() {
		let writes = Arc::new(AtomicUsize::new(0));
		let anon = AnonymousIdentity::new(
			Box::new(BrokenStore { writes: writes.clone() }),
			Box::new(BrokenStore { writes: writes.clone() }),
		);
		let first = anon.get_or_create();
		let second = anon.get_or_create();
		assert!(is_valid_id(&first));
		assert_ne!(first, second);
		assert_eq!(writes.load(Ordering::SeqCst), 4);
	}

	#[test]
	fn test_file_store_survives_reopen() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("state").join("anon-id");

		let id = AnonymousIdentity::new(Box::new(FileStore::new(&path)), Box::new(MemoryStore::new()))
			.get_or_create();
		let again = AnonymousIdentity::new(Box::new(FileStore::new(&path)), Box::new(MemoryStore::new()))
			.get_or_create();
		assert_eq!(id, again);
	}

	#[test]
	fn test_file_store_ignores_garbage() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("anon-id");
		std::fs::write(&path, "not an id").unwrap();
		assert_eq!(FileStore::new(&path).read().unwrap(), None);
	}
}

// vim: ts=4
