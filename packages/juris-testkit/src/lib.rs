//! In-memory backends and a baseline configuration for exercising the retrieval service
//! without a vector store, a search API, or a scoring model.

use std::{
	collections::HashMap,
	sync::{
		Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use serde_json::Map;

use juris_config::{
	CollectionConfig, Config, CrossEncoderConfig, EmbeddingProviderConfig, Profiles, Providers,
	Qdrant, Retrieval, Service, Storage, WebSearchConfig, WebSearchEngines,
};
use juris_domain::hit::{RawHit, RawSignal, WebCorpus};
use juris_providers::Error;
use juris_service::{
	BackendResult, BoxFuture, CrossEncoder, QuotaStatus, VectorBackend, WebSearchBackend,
};

pub const VECTOR_DIM: u32 = 8;

/// Scripted behaviour of one fake backend target.
#[derive(Clone, Debug)]
pub enum FakeResponse {
	Hits(Vec<RawHit>),
	Failure(String),
	Delayed(Duration, Vec<RawHit>),
	/// The target does not exist; probes report false and queries fail.
	Missing,
}
impl FakeResponse {
	async fn resolve(&self, limit: u32) -> BackendResult<Vec<RawHit>> {
		match self {
			Self::Hits(hits) => Ok(hits.iter().take(limit as usize).cloned().collect()),
			Self::Failure(message) => Err(Error::InvalidResponse { message: message.clone() }),
			Self::Delayed(delay, hits) => {
				tokio::time::sleep(*delay).await;

				Ok(hits.iter().take(limit as usize).cloned().collect())
			},
			Self::Missing => Err(Error::Qdrant { message: "Collection not found.".to_string() }),
		}
	}
}

#[derive(Default)]
pub struct FakeVectorBackend {
	collections: HashMap<String, FakeResponse>,
	calls: Mutex<HashMap<String, usize>>,
}
impl FakeVectorBackend {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, collection: &str, response: FakeResponse) -> Self {
		self.collections.insert(collection.to_string(), response);

		self
	}

	pub fn with_hits(self, collection: &str, hits: Vec<RawHit>) -> Self {
		self.with(collection, FakeResponse::Hits(hits))
	}

	pub fn with_failure(self, collection: &str) -> Self {
		self.with(collection, FakeResponse::Failure(format!("{collection} is unreachable.")))
	}

	pub fn calls(&self, collection: &str) -> usize {
		self.calls
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.get(collection)
			.copied()
			.unwrap_or(0)
	}

	fn response(&self, collection: &str) -> FakeResponse {
		self.collections.get(collection).cloned().unwrap_or(FakeResponse::Missing)
	}
}
impl VectorBackend for FakeVectorBackend {
	fn probe<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, BackendResult<bool>> {
		Box::pin(async move { Ok(!matches!(self.response(collection), FakeResponse::Missing)) })
	}

	fn query_collection<'a>(
		&'a self,
		collection: &'a str,
		_query: &'a str,
		limit: u32,
	) -> BoxFuture<'a, BackendResult<Vec<RawHit>>> {
		Box::pin(async move {
			*self
				.calls
				.lock()
				.unwrap_or_else(|err| err.into_inner())
				.entry(collection.to_string())
				.or_insert(0) += 1;

			self.response(collection).resolve(limit).await
		})
	}

	fn count<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, BackendResult<u64>> {
		Box::pin(async move {
			match self.response(collection) {
				FakeResponse::Hits(hits) | FakeResponse::Delayed(_, hits) => Ok(hits.len() as u64),
				FakeResponse::Failure(message) => Err(Error::InvalidResponse { message }),
				FakeResponse::Missing =>
					Err(Error::Qdrant { message: "Collection not found.".to_string() }),
			}
		})
	}
}

#[derive(Default)]
pub struct FakeWebSearch {
	corpora: HashMap<WebCorpus, FakeResponse>,
	quota: Option<QuotaStatus>,
	calls: AtomicUsize,
}
impl FakeWebSearch {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, corpus: WebCorpus, response: FakeResponse) -> Self {
		self.corpora.insert(corpus, response);

		self
	}

	/// Reports `quota` from `quota_status`.
	pub fn with_quota(mut self, quota: QuotaStatus) -> Self {
		self.quota = Some(quota);

		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl WebSearchBackend for FakeWebSearch {
	fn search<'a>(
		&'a self,
		_query: &'a str,
		corpus: WebCorpus,
		limit: u32,
	) -> BoxFuture<'a, BackendResult<Vec<RawHit>>> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let response =
				self.corpora.get(&corpus).cloned().unwrap_or(FakeResponse::Hits(Vec::new()));

			response.resolve(limit).await
		})
	}

	fn quota_status(&self) -> Option<QuotaStatus> {
		self.quota.clone()
	}
}

/// Scores passages by substring rules. Scores are given on the normalized [0, 1] scale and
/// returned as the raw [-1, 1] outputs a model would produce.
pub struct StubCrossEncoder {
	rules: Vec<(String, f32)>,
	default: f32,
	offline: bool,
	calls: AtomicUsize,
}
impl StubCrossEncoder {
	pub fn new(default: f32) -> Self {
		Self { rules: Vec::new(), default, offline: false, calls: AtomicUsize::new(0) }
	}

	/// Every call fails, as when the model cannot be loaded.
	pub fn offline() -> Self {
		Self { offline: true, ..Self::new(0.5) }
	}

	/// Passages containing `needle` score `normalized`. The first matching rule wins.
	pub fn with_score(mut self, needle: &str, normalized: f32) -> Self {
		self.rules.push((needle.to_string(), normalized));

		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	fn normalized_score(&self, passage: &str) -> f32 {
		self.rules
			.iter()
			.find(|(needle, _)| passage.contains(needle.as_str()))
			.map(|(_, score)| *score)
			.unwrap_or(self.default)
	}
}
impl CrossEncoder for StubCrossEncoder {
	fn score<'a>(
		&'a self,
		_query: &'a str,
		passages: &'a [String],
	) -> BoxFuture<'a, BackendResult<Vec<f32>>> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			if self.offline {
				return Err(Error::InvalidResponse {
					message: "Cross-encoder model is not loaded.".to_string(),
				});
			}

			Ok(passages.iter().map(|p| self.normalized_score(p) * 2.0 - 1.0).collect())
		})
	}
}

pub fn collection_hit(content: &str, article: &str, source_file: &str, distance: f32) -> RawHit {
	RawHit {
		content: content.to_string(),
		source_file: source_file.to_string(),
		article_reference: article.to_string(),
		document_type: String::new(),
		raw_signal: RawSignal::Distance(distance),
	}
}

pub fn web_hit(content: &str, link: &str, source_label: &str, rank: u32) -> RawHit {
	RawHit {
		content: content.to_string(),
		source_file: link.to_string(),
		article_reference: String::new(),
		document_type: source_label.to_string(),
		raw_signal: RawSignal::WebRank(rank),
	}
}

/// Three collections (`deontology`, `health_code`, `civil_code`), default profiles, and short
/// timeouts. Provider endpoints point nowhere; pair with the fakes above.
pub fn test_config() -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		storage: Storage {
			qdrant: Qdrant {
				url: "http://127.0.0.1:6334".to_string(),
				vector_dim: VECTOR_DIM,
				vector_name: None,
				metric: "cosine".to_string(),
			},
			collections: vec![
				collection("deontology", "Code de Déontologie Médicale"),
				collection("health_code", "Code de la Santé Publique"),
				collection("civil_code", "Code Civil"),
			],
		},
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: String::new(),
				path: "/embeddings".to_string(),
				model: "test-embedding".to_string(),
				dimensions: VECTOR_DIM,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			cross_encoder: CrossEncoderConfig {
				enabled: true,
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: String::new(),
				path: "/rerank".to_string(),
				model: "test-cross-encoder".to_string(),
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			web_search: WebSearchConfig {
				enabled: true,
				api_base: "http://127.0.0.1:1".to_string(),
				path: "/customsearch/v1".to_string(),
				api_keys: vec!["test-key".to_string()],
				engines: WebSearchEngines {
					case_law: "cse-case-law".to_string(),
					benefits_agency: "cse-benefits".to_string(),
				},
				timeout_ms: 1_000,
				cache_ttl_secs: 3_600,
				max_query_chars: 100,
				max_results: 10,
				language: "lang_fr".to_string(),
				country: "fr".to_string(),
				date_restrict: Some("y2".to_string()),
				min_interval_ms: 0,
				daily_quota: 10_000,
			},
		},
		retrieval: Retrieval {
			backend_timeout_ms: 300,
			request_timeout_ms: 1_000,
			..Retrieval::default()
		},
		profiles: Profiles::default(),
	}
}

fn collection(name: &str, label: &str) -> CollectionConfig {
	CollectionConfig {
		name: name.to_string(),
		label: label.to_string(),
		qdrant_collection: name.to_string(),
	}
}
