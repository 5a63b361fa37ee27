use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub profiles: Profiles,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
	pub collections: Vec<CollectionConfig>,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub vector_dim: u32,
	/// Optional. Named dense vector to query; the collection default vector is used when unset.
	#[serde(default)]
	pub vector_name: Option<String>,
	/// One of "cosine", "dot", or "euclid". Decides how a point score maps to a distance.
	#[serde(default = "default_metric")]
	pub metric: String,
}

/// One legal code or domain partition of the vector store.
#[derive(Clone, Debug, Deserialize)]
pub struct CollectionConfig {
	pub name: String,
	pub label: String,
	/// Physical collection name in the vector store. Defaults to `name`.
	#[serde(default)]
	pub qdrant_collection: String,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub cross_encoder: CrossEncoderConfig,
	pub web_search: WebSearchConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CrossEncoderConfig {
	#[serde(default = "default_true")]
	pub enabled: bool,
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WebSearchConfig {
	#[serde(default)]
	pub enabled: bool,
	pub api_base: String,
	pub path: String,
	#[serde(default)]
	pub api_keys: Vec<String>,
	pub engines: WebSearchEngines,
	pub timeout_ms: u64,
	#[serde(default = "default_cache_ttl_secs")]
	pub cache_ttl_secs: u64,
	#[serde(default = "default_max_query_chars")]
	pub max_query_chars: u32,
	#[serde(default = "default_max_results")]
	pub max_results: u32,
	#[serde(default = "default_language")]
	pub language: String,
	#[serde(default = "default_country")]
	pub country: String,
	/// Optional. Recency restriction forwarded to the search API, e.g. "y2".
	#[serde(default = "default_date_restrict")]
	pub date_restrict: Option<String>,
	/// Minimum gap between two calls to the search API.
	#[serde(default = "default_min_interval_ms")]
	pub min_interval_ms: u64,
	/// Calls allowed per 24-hour window, as billed by the search API.
	#[serde(default = "default_daily_quota")]
	pub daily_quota: u64,
}

/// Search-engine identifiers selecting each web corpus.
#[derive(Clone, Debug, Deserialize)]
pub struct WebSearchEngines {
	pub case_law: String,
	pub benefits_agency: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	pub per_collection_limit: u32,
	pub web_limit: u32,
	pub backend_timeout_ms: u64,
	pub request_timeout_ms: u64,
	pub failure_threshold: u32,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self {
			per_collection_limit: 10,
			web_limit: 5,
			backend_timeout_ms: 5_000,
			request_timeout_ms: 15_000,
			failure_threshold: 3,
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Profiles {
	#[serde(default = "default_general_profile")]
	pub general: ProfileConfig,
	#[serde(default = "default_unified_profile")]
	pub unified: ProfileConfig,
	#[serde(default = "default_domain_focused_profile")]
	pub domain_focused: ProfileConfig,
}
impl Default for Profiles {
	fn default() -> Self {
		Self {
			general: default_general_profile(),
			unified: default_unified_profile(),
			domain_focused: default_domain_focused_profile(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProfileConfig {
	pub semantic_weight: f32,
	pub relevance_weight: f32,
	pub bonus_weight: f32,
	pub top_k: u32,
	/// Web corpora queried alongside the collections: "case_law", "benefits_agency".
	#[serde(default)]
	pub web_corpora: Vec<String>,
}

fn default_true() -> bool {
	true
}

fn default_metric() -> String {
	"cosine".to_string()
}

fn default_min_interval_ms() -> u64 {
	100
}

fn default_daily_quota() -> u64 {
	10_000
}

fn default_cache_ttl_secs() -> u64 {
	3_600
}

fn default_max_query_chars() -> u32 {
	100
}

fn default_max_results() -> u32 {
	10
}

fn default_language() -> String {
	"lang_fr".to_string()
}

fn default_country() -> String {
	"fr".to_string()
}

fn default_date_restrict() -> Option<String> {
	Some("y2".to_string())
}

fn default_general_profile() -> ProfileConfig {
	ProfileConfig {
		semantic_weight: 0.7,
		relevance_weight: 0.2,
		bonus_weight: 0.1,
		top_k: 10,
		web_corpora: Vec::new(),
	}
}

fn default_unified_profile() -> ProfileConfig {
	ProfileConfig {
		semantic_weight: 0.7,
		relevance_weight: 0.2,
		bonus_weight: 0.1,
		top_k: 10,
		web_corpora: Vec::new(),
	}
}

fn default_domain_focused_profile() -> ProfileConfig {
	ProfileConfig {
		semantic_weight: 0.6,
		relevance_weight: 0.2,
		bonus_weight: 0.2,
		top_k: 3,
		web_corpora: Vec::new(),
	}
}
