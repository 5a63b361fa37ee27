use std::sync::Arc;

use juris_domain::normalize::{self, NEUTRAL_SEMANTIC_SCORE};

use crate::CrossEncoder;

/// Normalized semantic scores for one batch of passages.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreBatch {
	pub scores: Vec<f32>,
	/// Set when the model was unavailable and every passage received the neutral score.
	pub degraded: bool,
}
impl ScoreBatch {
	pub fn neutral(len: usize) -> Self {
		Self { scores: vec![NEUTRAL_SEMANTIC_SCORE; len], degraded: true }
	}
}

/// Cross-encoder policy: raw outputs are mapped onto [0, 1]; any failure scores the whole batch
/// at exactly 0.5.
pub struct CrossEncoderScorer {
	encoder: Option<Arc<dyn CrossEncoder>>,
}
impl CrossEncoderScorer {
	pub fn new(encoder: Option<Arc<dyn CrossEncoder>>) -> Self {
		Self { encoder }
	}

	pub fn is_configured(&self) -> bool {
		self.encoder.is_some()
	}

	pub async fn score(&self, query: &str, passages: &[String]) -> ScoreBatch {
		let Some(encoder) = self.encoder.as_ref() else {
			return ScoreBatch::neutral(passages.len());
		};

		if passages.is_empty() {
			return ScoreBatch { scores: Vec::new(), degraded: false };
		}

		match encoder.score(query, passages).await {
			Ok(raw) if raw.len() == passages.len() => ScoreBatch {
				scores: raw.into_iter().map(normalize::normalize_cross_encoder).collect(),
				degraded: false,
			},
			Ok(raw) => {
				tracing::warn!(
					expected = passages.len(),
					received = raw.len(),
					"Cross-encoder returned a mismatched batch. Using neutral scores."
				);

				ScoreBatch::neutral(passages.len())
			},
			Err(err) => {
				tracing::warn!(error = %err, "Cross-encoder failed. Using neutral scores.");

				ScoreBatch::neutral(passages.len())
			},
		}
	}
}
