//! Weighted fusion of the semantic score, the normalized relevance, and the bonus.

use serde::Serialize;

use crate::hit::{Hit, RelevanceLabel};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Weights {
	pub semantic: f32,
	pub relevance: f32,
	pub bonus: f32,
}
impl Weights {
	pub fn sum(&self) -> f32 {
		self.semantic + self.relevance + self.bonus
	}

	/// Largest reachable fused score given the largest bonus a rule set can emit.
	///
	/// The bonus is not weighted against a unit range, so the bound is
	/// `semantic + relevance + bonus * max_bonus` rather than `1.0`.
	pub fn ceiling(&self, max_bonus: f32) -> f32 {
		self.semantic + self.relevance + self.bonus * max_bonus
	}
}

pub fn fuse(weights: &Weights, semantic_score: f32, normalized_relevance: f32, bonus: f32) -> f32 {
	weights.semantic * semantic_score
		+ weights.relevance * normalized_relevance
		+ weights.bonus * bonus
}

/// Writes `final_score` and `relevance_label` on every hit.
pub fn apply_fusion(hits: &mut [Hit], weights: &Weights) {
	for hit in hits {
		let semantic = hit.effective_semantic_score();

		hit.final_score = fuse(weights, semantic, hit.normalized_relevance, hit.bonus);
		hit.relevance_label = RelevanceLabel::from_score(semantic);
	}
}
