//! Production backends wired from configuration.

use std::sync::Arc;

use juris_config::{Config, CrossEncoderConfig, EmbeddingProviderConfig};
use juris_domain::hit::{RawHit, WebCorpus};
use juris_providers::{cross_encoder, embedding, qdrant::QdrantStore, web_search::WebSearchClient};

use crate::{
	BackendResult, Backends, BoxFuture, CrossEncoder, QuotaStatus, Result, VectorBackend,
	WebSearchBackend,
};

/// Embeds the query text, then runs a nearest-neighbour query against one collection.
pub struct QdrantBackend {
	store: QdrantStore,
	embedding: EmbeddingProviderConfig,
}
impl QdrantBackend {
	pub fn new(store: QdrantStore, embedding: EmbeddingProviderConfig) -> Self {
		Self { store, embedding }
	}
}
impl VectorBackend for QdrantBackend {
	fn probe<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, BackendResult<bool>> {
		Box::pin(self.store.collection_exists(collection))
	}

	fn query_collection<'a>(
		&'a self,
		collection: &'a str,
		query: &'a str,
		limit: u32,
	) -> BoxFuture<'a, BackendResult<Vec<RawHit>>> {
		Box::pin(async move {
			let vector = embedding::embed_query(&self.embedding, query).await?;

			self.store.search(collection, vector, limit).await
		})
	}

	fn count<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, BackendResult<u64>> {
		Box::pin(self.store.count(collection))
	}
}

pub struct HttpCrossEncoder {
	cfg: CrossEncoderConfig,
}
impl HttpCrossEncoder {
	pub fn new(cfg: CrossEncoderConfig) -> Self {
		Self { cfg }
	}
}
impl CrossEncoder for HttpCrossEncoder {
	fn score<'a>(
		&'a self,
		query: &'a str,
		passages: &'a [String],
	) -> BoxFuture<'a, BackendResult<Vec<f32>>> {
		Box::pin(cross_encoder::score(&self.cfg, query, passages))
	}
}

impl WebSearchBackend for WebSearchClient {
	fn search<'a>(
		&'a self,
		query: &'a str,
		corpus: WebCorpus,
		limit: u32,
	) -> BoxFuture<'a, BackendResult<Vec<RawHit>>> {
		Box::pin(WebSearchClient::search(self, query, corpus, limit))
	}

	fn quota_status(&self) -> Option<QuotaStatus> {
		Some(WebSearchClient::quota_status(self))
	}
}

pub fn from_config(cfg: &Config) -> Result<Backends> {
	let store = QdrantStore::new(&cfg.storage.qdrant)?;
	let vector: Arc<dyn VectorBackend> =
		Arc::new(QdrantBackend::new(store, cfg.providers.embedding.clone()));
	let web: Option<Arc<dyn WebSearchBackend>> = if cfg.providers.web_search.enabled {
		Some(Arc::new(WebSearchClient::new(&cfg.providers.web_search)?))
	} else {
		None
	};
	let cross_encoder: Option<Arc<dyn CrossEncoder>> = if cfg.providers.cross_encoder.enabled {
		Some(Arc::new(HttpCrossEncoder::new(cfg.providers.cross_encoder.clone())))
	} else {
		tracing::warn!("Cross-encoder disabled. Every passage will score as neutral.");

		None
	};

	Ok(Backends::new(vector, web, cross_encoder))
}
