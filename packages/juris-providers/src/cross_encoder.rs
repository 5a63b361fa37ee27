//! HTTP transport for a pairwise (query, passage) scoring model.
//!
//! Returns the model's raw outputs in input order. Mapping them onto [0, 1] and the fallback when
//! the model is unreachable are the caller's concern.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

pub async fn score(
	cfg: &juris_config::CrossEncoderConfig,
	query: &str,
	passages: &[String],
) -> Result<Vec<f32>> {
	if passages.is_empty() {
		return Ok(Vec::new());
	}

	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({ "model": cfg.model, "query": query, "documents": passages });
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_score_response(json, passages.len())
}

/// Accepts either `{"scores": [..]}` or `{"results": [{"index", "relevance_score"}]}`.
fn parse_score_response(json: Value, passage_count: usize) -> Result<Vec<f32>> {
	if let Some(scores) = json.get("scores").and_then(|v| v.as_array()) {
		let scores = scores
			.iter()
			.map(|v| v.as_f64().map(|s| s as f32))
			.collect::<Option<Vec<_>>>()
			.ok_or_else(|| Error::InvalidResponse {
				message: "Cross-encoder scores must be numeric.".to_string(),
			})?;

		if scores.len() != passage_count {
			return Err(length_mismatch(scores.len(), passage_count));
		}

		return Ok(scores);
	}

	let results = json
		.get("results")
		.or_else(|| json.get("data"))
		.and_then(|v| v.as_array())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Cross-encoder response is missing results array.".to_string(),
		})?;
	let mut scores: Vec<Option<f32>> = vec![None; passage_count];

	for item in results {
		let index = item.get("index").and_then(|v| v.as_u64()).ok_or_else(|| {
			Error::InvalidResponse { message: "Cross-encoder result missing index.".to_string() }
		})? as usize;
		let score = item
			.get("relevance_score")
			.or_else(|| item.get("score"))
			.and_then(|v| v.as_f64())
			.ok_or_else(|| Error::InvalidResponse {
				message: "Cross-encoder result missing score.".to_string(),
			})? as f32;

		if let Some(slot) = scores.get_mut(index) {
			*slot = Some(score);
		}
	}

	let filled = scores.iter().filter(|s| s.is_some()).count();

	scores
		.into_iter()
		.collect::<Option<Vec<_>>>()
		.ok_or_else(|| length_mismatch(filled, passage_count))
}

fn length_mismatch(got: usize, expected: usize) -> Error {
	Error::InvalidResponse {
		message: format!("Cross-encoder returned {got} scores for {expected} passages."),
	}
}
