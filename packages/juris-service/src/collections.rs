//! Collection descriptors and their availability flags.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use serde::Serialize;

use juris_config::Config;

use crate::VectorBackend;

/// One retrievable partition. Only the availability state changes after startup.
#[derive(Debug)]
pub struct Collection {
	pub name: String,
	pub label: String,
	/// Physical collection name in the vector store.
	pub backend_name: String,
	available: AtomicBool,
	consecutive_failures: AtomicU32,
}
impl Collection {
	pub fn new(
		name: impl Into<String>,
		label: impl Into<String>,
		backend_name: impl Into<String>,
	) -> Self {
		Self {
			name: name.into(),
			label: label.into(),
			backend_name: backend_name.into(),
			available: AtomicBool::new(true),
			consecutive_failures: AtomicU32::new(0),
		}
	}

	pub fn is_available(&self) -> bool {
		self.available.load(Ordering::Relaxed)
	}

	pub fn consecutive_failures(&self) -> u32 {
		self.consecutive_failures.load(Ordering::Relaxed)
	}

	pub fn record_success(&self) {
		self.consecutive_failures.store(0, Ordering::Relaxed);
	}

	/// Returns true when this failure took the collection out of rotation.
	pub fn record_failure(&self, threshold: u32) -> bool {
		let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed).saturating_add(1);

		failures >= threshold && self.available.swap(false, Ordering::Relaxed)
	}

	pub fn set_available(&self, available: bool) {
		self.available.store(available, Ordering::Relaxed);
		self.consecutive_failures.store(0, Ordering::Relaxed);
	}

	/// Whether this collection belongs to `domain`: the whole name or its leading segment, so
	/// `health` selects `health_code` but `code` selects nothing. Case-insensitive.
	pub fn matches_domain(&self, domain: &str) -> bool {
		let domain = domain.trim().to_lowercase();

		if domain.is_empty() {
			return false;
		}

		let name = self.name.to_lowercase();

		name == domain || name.split(['_', '-']).next() == Some(domain.as_str())
	}

	pub fn info(&self) -> CollectionInfo {
		CollectionInfo {
			name: self.name.clone(),
			label: self.label.clone(),
			available: self.is_available(),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
	pub name: String,
	pub label: String,
	pub available: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
	pub name: String,
	pub label: String,
	pub passages: u64,
}

#[derive(Debug)]
pub struct CollectionRegistry {
	collections: Vec<Collection>,
	failure_threshold: u32,
}
impl CollectionRegistry {
	pub fn new(collections: Vec<Collection>, failure_threshold: u32) -> Self {
		Self { collections, failure_threshold: failure_threshold.max(1) }
	}

	pub fn from_config(cfg: &Config) -> Self {
		let collections = cfg
			.storage
			.collections
			.iter()
			.map(|c| Collection::new(&c.name, &c.label, &c.qdrant_collection))
			.collect();

		Self::new(collections, cfg.retrieval.failure_threshold)
	}

	pub fn failure_threshold(&self) -> u32 {
		self.failure_threshold
	}

	/// Collections in configuration order.
	pub fn all(&self) -> &[Collection] {
		&self.collections
	}

	pub fn get(&self, name: &str) -> Option<&Collection> {
		self.collections.iter().find(|c| c.name.eq_ignore_ascii_case(name))
	}

	pub fn matching(&self, domain: &str) -> Vec<&Collection> {
		self.collections.iter().filter(|c| c.matches_domain(domain)).collect()
	}

	pub fn describe(&self) -> Vec<CollectionInfo> {
		self.collections.iter().map(Collection::info).collect()
	}

	pub fn reset_availability(&self) {
		for collection in &self.collections {
			collection.set_available(true);
		}
	}

	pub async fn probe(&self, backend: &dyn VectorBackend) {
		for collection in &self.collections {
			let available = match backend.probe(&collection.backend_name).await {
				Ok(true) => true,
				Ok(false) => {
					tracing::warn!(
						collection = %collection.name,
						backend_name = %collection.backend_name,
						"Collection is missing from the vector store. Marking unavailable."
					);

					false
				},
				Err(err) => {
					tracing::warn!(
						collection = %collection.name,
						error = %err,
						"Collection probe failed. Marking unavailable."
					);

					false
				},
			};

			collection.set_available(available);
		}
	}
}
