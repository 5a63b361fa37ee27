use std::collections::HashMap;

use qdrant_client::qdrant::{
	CollectionExistsRequest, CountPointsBuilder, Query, QueryPointsBuilder, ScoredPoint, Value,
	value::Kind,
};

use crate::{Error, Result};
use juris_domain::hit::{RawHit, RawSignal};

const CONTENT_KEYS: [&str; 3] = ["content", "document", "text"];
const ARTICLE_KEY: &str = "article";
const SOURCE_FILE_KEY: &str = "source_file";
const DOC_TYPE_KEY: &str = "doc_type";

/// How a point score relates to a distance where 0 means identical.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DistanceMetric {
	Cosine,
	Dot,
	Euclid,
}
impl DistanceMetric {
	pub fn parse(raw: &str) -> Result<Self> {
		match raw.trim() {
			"cosine" => Ok(Self::Cosine),
			"dot" => Ok(Self::Dot),
			"euclid" => Ok(Self::Euclid),
			other => Err(Error::InvalidConfig {
				message: format!("Unsupported distance metric {other:?}."),
			}),
		}
	}

	pub fn distance(self, score: f32) -> f32 {
		match self {
			Self::Cosine | Self::Dot => 1.0 - score,
			Self::Euclid => score,
		}
	}
}

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub vector_name: Option<String>,
	pub metric: DistanceMetric,
}
impl QdrantStore {
	pub fn new(cfg: &juris_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url)
			.build()
			.map_err(|err| Error::Qdrant { message: err.to_string() })?;

		Ok(Self {
			client,
			vector_name: cfg.vector_name.clone(),
			metric: DistanceMetric::parse(&cfg.metric)?,
		})
	}

	pub async fn collection_exists(&self, collection: &str) -> Result<bool> {
		self.client
			.collection_exists(CollectionExistsRequest { collection_name: collection.to_string() })
			.await
			.map_err(|err| Error::Qdrant { message: err.to_string() })
	}

	/// Nearest neighbours of `vector` in `collection`, closest first.
	pub async fn search(&self, collection: &str, vector: Vec<f32>, limit: u32) -> Result<Vec<RawHit>> {
		if limit == 0 {
			return Err(Error::InvalidRequest {
				message: "Result limit must be greater than zero.".to_string(),
			});
		}

		let mut search =
			QueryPointsBuilder::new(collection.to_string()).query(Query::new_nearest(vector));

		if let Some(name) = self.vector_name.as_deref() {
			search = search.using(name);
		}

		let search = search.with_payload(true).limit(limit as u64);
		let response = self
			.client
			.query(search)
			.await
			.map_err(|err| Error::Qdrant { message: err.to_string() })?;

		Ok(response.result.iter().map(|point| raw_hit_from_point(point, self.metric)).collect())
	}

	pub async fn count(&self, collection: &str) -> Result<u64> {
		let response = self
			.client
			.count(CountPointsBuilder::new(collection.to_string()).exact(true))
			.await
			.map_err(|err| Error::Qdrant { message: err.to_string() })?;

		Ok(response.result.map(|result| result.count).unwrap_or(0))
	}
}

pub fn raw_hit_from_point(point: &ScoredPoint, metric: DistanceMetric) -> RawHit {
	raw_hit_from_payload(&point.payload, metric.distance(point.score))
}

/// Missing or non-string metadata fields become empty strings.
pub fn raw_hit_from_payload(payload: &HashMap<String, Value>, distance: f32) -> RawHit {
	let content =
		CONTENT_KEYS.iter().find_map(|key| payload_string(payload, key)).unwrap_or_default();

	RawHit {
		content,
		source_file: payload_string(payload, SOURCE_FILE_KEY).unwrap_or_default(),
		article_reference: payload_string(payload, ARTICLE_KEY).unwrap_or_default(),
		document_type: payload_string(payload, DOC_TYPE_KEY).unwrap_or_default(),
		raw_signal: RawSignal::Distance(distance),
	}
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.to_string()),
		Some(Kind::IntegerValue(number)) => Some(number.to_string()),
		_ => None,
	}
}
