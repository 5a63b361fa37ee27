use std::cmp::Ordering;

use crate::hit::Hit;

/// Stable descending sort by `final_score`, truncation to `k`, and 1-based ranks.
///
/// Never pads: fewer than `k` inputs yield fewer than `k` outputs.
pub fn select_top_k(mut hits: Vec<Hit>, k: usize) -> Vec<Hit> {
	hits.sort_by(|a, b| cmp_f32_desc(a.final_score, b.final_score));
	hits.truncate(k);

	for (idx, hit) in hits.iter_mut().enumerate() {
		hit.rank = idx as u32 + 1;
	}

	hits
}

/// Descending order with NaN sorted last.
pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}
