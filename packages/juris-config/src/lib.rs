mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	CollectionConfig, Config, CrossEncoderConfig, EmbeddingProviderConfig, ProfileConfig, Profiles,
	Providers, Qdrant, Retrieval, Service, Storage, WebSearchConfig, WebSearchEngines,
};

use std::{collections::HashSet, fs, path::Path};

pub const WEB_CORPORA: [&str; 2] = ["case_law", "benefits_agency"];

const WEIGHT_SUM_TOLERANCE: f32 = 1e-4;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if !matches!(cfg.storage.qdrant.metric.as_str(), "cosine" | "dot" | "euclid") {
		return Err(Error::Validation {
			message: "storage.qdrant.metric must be one of cosine, dot, or euclid.".to_string(),
		});
	}

	validate_collections(&cfg.storage.collections)?;
	validate_web_search(&cfg.providers.web_search)?;
	validate_retrieval(&cfg.retrieval)?;

	for (label, profile) in [
		("general", &cfg.profiles.general),
		("unified", &cfg.profiles.unified),
		("domain_focused", &cfg.profiles.domain_focused),
	] {
		validate_profile(label, profile)?;
	}

	Ok(())
}

fn validate_collections(collections: &[CollectionConfig]) -> Result<()> {
	if collections.is_empty() {
		return Err(Error::Validation {
			message: "storage.collections must be non-empty.".to_string(),
		});
	}

	let mut seen = HashSet::new();

	for collection in collections {
		if collection.name.trim().is_empty() {
			return Err(Error::Validation {
				message: "storage.collections.name must be non-empty.".to_string(),
			});
		}
		if !seen.insert(collection.name.to_lowercase()) {
			return Err(Error::Validation {
				message: format!(
					"storage.collections.name must be unique; {} is repeated.",
					collection.name
				),
			});
		}
	}

	Ok(())
}

fn validate_web_search(web: &WebSearchConfig) -> Result<()> {
	if !web.enabled {
		return Ok(());
	}
	if web.api_keys.is_empty() {
		return Err(Error::Validation {
			message: "providers.web_search.api_keys must hold at least one key when enabled."
				.to_string(),
		});
	}
	if web.cache_ttl_secs == 0 {
		return Err(Error::Validation {
			message: "providers.web_search.cache_ttl_secs must be greater than zero.".to_string(),
		});
	}
	if web.daily_quota == 0 {
		return Err(Error::Validation {
			message: "providers.web_search.daily_quota must be greater than zero.".to_string(),
		});
	}
	if web.max_query_chars == 0 {
		return Err(Error::Validation {
			message: "providers.web_search.max_query_chars must be greater than zero.".to_string(),
		});
	}
	if !(1..=10).contains(&web.max_results) {
		return Err(Error::Validation {
			message: "providers.web_search.max_results must be in the range 1-10.".to_string(),
		});
	}

	for (label, engine) in [
		("case_law", &web.engines.case_law),
		("benefits_agency", &web.engines.benefits_agency),
	] {
		if engine.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("providers.web_search.engines.{label} must be non-empty."),
			});
		}
	}

	Ok(())
}

fn validate_retrieval(retrieval: &Retrieval) -> Result<()> {
	if retrieval.per_collection_limit == 0 {
		return Err(Error::Validation {
			message: "retrieval.per_collection_limit must be greater than zero.".to_string(),
		});
	}
	if retrieval.web_limit == 0 {
		return Err(Error::Validation {
			message: "retrieval.web_limit must be greater than zero.".to_string(),
		});
	}
	if retrieval.backend_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "retrieval.backend_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if retrieval.request_timeout_ms < retrieval.backend_timeout_ms {
		return Err(Error::Validation {
			message: "retrieval.request_timeout_ms must be at least retrieval.backend_timeout_ms."
				.to_string(),
		});
	}
	if retrieval.failure_threshold == 0 {
		return Err(Error::Validation {
			message: "retrieval.failure_threshold must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_profile(label: &str, profile: &ProfileConfig) -> Result<()> {
	let invalid = |message: &str| Error::InvalidProfile {
		profile: label.to_string(),
		message: message.to_string(),
	};

	for (name, weight) in [
		("semantic_weight", profile.semantic_weight),
		("relevance_weight", profile.relevance_weight),
		("bonus_weight", profile.bonus_weight),
	] {
		if !weight.is_finite() {
			return Err(invalid(&format!("{name} must be a finite number.")));
		}
		if !(0.0..=1.0).contains(&weight) {
			return Err(invalid(&format!("{name} must be in the range 0.0-1.0.")));
		}
	}

	let sum = profile.semantic_weight + profile.relevance_weight + profile.bonus_weight;

	if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
		return Err(invalid("weights must sum to 1.0."));
	}
	if profile.top_k == 0 {
		return Err(invalid("top_k must be greater than zero."));
	}

	for corpus in &profile.web_corpora {
		if !WEB_CORPORA.contains(&corpus.as_str()) {
			return Err(invalid("web_corpora entries must be one of case_law or benefits_agency."));
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.providers.web_search.api_keys.retain(|key| !key.trim().is_empty());

	if cfg
		.providers
		.web_search
		.date_restrict
		.as_deref()
		.map(|value| value.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.providers.web_search.date_restrict = None;
	}
	if cfg.storage.qdrant.vector_name.as_deref().map(|name| name.trim().is_empty()).unwrap_or(false)
	{
		cfg.storage.qdrant.vector_name = None;
	}

	for collection in &mut cfg.storage.collections {
		collection.name = collection.name.trim().to_string();

		if collection.qdrant_collection.trim().is_empty() {
			collection.qdrant_collection = collection.name.clone();
		}
	}
}
