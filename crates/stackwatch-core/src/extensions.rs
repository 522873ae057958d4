//! Typed extension map for AppState
//!
//! Feature crates park their own state here (the email module, the detector)
//! so `AppState` does not need to know about their types.

use std::any::{Any, TypeId};
use std::collections::HashMap;

#[derive(Default)]
pub struct Extensions {
	map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores a value, replacing a previous value of the same type
	pub fn insert<T: Send + Sync + 'static>(&mut self, val: T) {
		self.map.insert(TypeId::of::<T>(), Box::new(val));
	}

	pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
		self.map.get(&TypeId::of::<T>())?.downcast_ref::<T>()
	}

	pub fn len(&self) -> usize {
		self.map.len()
	}

	pub fn is_empty(&self) -> bool {
		self.map.is_empty()
	}
}

impl std::fmt::Debug for Extensions {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Extensions").field("len", &self.map.len()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Debug, PartialEq)]
	struct Marker(u32);

	#[test]
	fn test_insert_get() {
		let mut ext = Extensions::new();
		assert!(ext.get::<Marker>().is_none());
		ext.insert(Marker(1));
		ext.insert(Marker(2));
		assert_eq!(ext.get::<Marker>(), Some(&Marker(2)));
		assert_eq!(ext.len(), 1);
	}
}

// vim: ts=4
