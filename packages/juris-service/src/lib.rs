pub mod backends;
pub mod collections;
pub mod retrieve;
pub mod scorer;

mod error;

pub use collections::{Collection, CollectionInfo, CollectionRegistry, CollectionStats};
pub use error::{Error, Result};
pub use retrieve::{BackendStatus, RetrieveRequest, RetrieveResponse};
pub use juris_providers::web_search::QuotaStatus;
pub use scorer::{CrossEncoderScorer, ScoreBatch};

use std::{future::Future, pin::Pin, sync::Arc};

use juris_config::Config;
use juris_domain::hit::{RawHit, WebCorpus};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Backend-level result; every failure is a typed provider error.
pub type BackendResult<T> = juris_providers::Result<T>;

pub trait VectorBackend
where
	Self: Send + Sync,
{
	/// Whether the physical collection exists.
	fn probe<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, BackendResult<bool>>;

	fn query_collection<'a>(
		&'a self,
		collection: &'a str,
		query: &'a str,
		limit: u32,
	) -> BoxFuture<'a, BackendResult<Vec<RawHit>>>;

	fn count<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, BackendResult<u64>>;
}

pub trait WebSearchBackend
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		query: &'a str,
		corpus: WebCorpus,
		limit: u32,
	) -> BoxFuture<'a, BackendResult<Vec<RawHit>>>;

	/// Usage against the search API's daily quota, when the backend tracks one.
	fn quota_status(&self) -> Option<QuotaStatus> {
		None
	}
}

pub trait CrossEncoder
where
	Self: Send + Sync,
{
	/// Raw model outputs, one per passage, in input order.
	fn score<'a>(
		&'a self,
		query: &'a str,
		passages: &'a [String],
	) -> BoxFuture<'a, BackendResult<Vec<f32>>>;
}

#[derive(Clone)]
pub struct Backends {
	pub vector: Arc<dyn VectorBackend>,
	pub web: Option<Arc<dyn WebSearchBackend>>,
	pub cross_encoder: Option<Arc<dyn CrossEncoder>>,
}
impl Backends {
	pub fn new(
		vector: Arc<dyn VectorBackend>,
		web: Option<Arc<dyn WebSearchBackend>>,
		cross_encoder: Option<Arc<dyn CrossEncoder>>,
	) -> Self {
		Self { vector, web, cross_encoder }
	}
}

pub struct JurisService {
	pub cfg: Config,
	pub backends: Backends,
	pub collections: CollectionRegistry,
	pub scorer: CrossEncoderScorer,
}
impl JurisService {
	/// Builds the production backends from `cfg`. Collections start available until probed.
	pub fn new(cfg: Config) -> Result<Self> {
		let backends = backends::from_config(&cfg)?;

		Ok(Self::with_backends(cfg, backends))
	}

	pub fn with_backends(cfg: Config, backends: Backends) -> Self {
		let collections = CollectionRegistry::from_config(&cfg);
		let scorer = CrossEncoderScorer::new(backends.cross_encoder.clone());

		Self { cfg, backends, collections, scorer }
	}

	/// Marks every collection available or not based on whether it exists in the vector store.
	pub async fn probe_collections(&self) {
		self.collections.probe(self.backends.vector.as_ref()).await;
	}

	pub fn collections(&self) -> Vec<CollectionInfo> {
		self.collections.describe()
	}

	pub fn reset_availability(&self) {
		self.collections.reset_availability();
	}

	/// `None` when web search is disabled or its backend keeps no quota.
	pub fn web_quota(&self) -> Option<QuotaStatus> {
		self.backends.web.as_ref().and_then(|web| web.quota_status())
	}
}
