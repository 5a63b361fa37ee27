//! Maps backend-native signals onto the common [0, 1] relevance scale.

use crate::hit::RawSignal;

/// Score assigned to every pair when the cross-encoder cannot be used.
pub const NEUTRAL_SEMANTIC_SCORE: f32 = 0.5;

const WEB_RANK_BASE: f32 = 0.9;
const WEB_RANK_STEP: f32 = 0.1;

pub fn relevance(signal: RawSignal) -> f32 {
	match signal {
		RawSignal::Distance(distance) => normalize_distance(distance),
		RawSignal::WebRank(index) => web_rank_relevance(index),
	}
}

/// `clamp(1 - distance, 0, 1)`. Non-finite distances carry no relevance.
pub fn normalize_distance(distance: f32) -> f32 {
	if !distance.is_finite() {
		return 0.0;
	}

	(1.0 - distance).clamp(0.0, 1.0)
}

/// Linear decay over the search engine's ordering: `max(0, 0.9 - 0.1 * index)`.
pub fn web_rank_relevance(index: u32) -> f32 {
	(WEB_RANK_BASE - WEB_RANK_STEP * index as f32).clamp(0.0, 1.0)
}

/// Maps a raw cross-encoder output from [-1, 1] onto [0, 1].
pub fn normalize_cross_encoder(raw: f32) -> f32 {
	if raw.is_nan() {
		return NEUTRAL_SEMANTIC_SCORE;
	}

	((raw + 1.0) / 2.0).clamp(0.0, 1.0)
}
