use std::collections::{HashMap, hash_map::Entry};

use crate::{hit::Hit, text};

/// What makes two hits the same citation.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum IdentityKey {
	Citation { article: String, source_file: String },
	Content(String),
}
impl IdentityKey {
	pub fn of(hit: &Hit) -> Self {
		let article = text::normalize_article_reference(&hit.article_reference);

		if article.is_empty() {
			Self::Content(text::content_hash(&hit.content))
		} else {
			Self::Citation { article, source_file: hit.source_file.trim().to_string() }
		}
	}
}

/// Collapses hits sharing an identity key.
///
/// A duplicate replaces the kept hit only with a strictly higher `final_score`, so exact ties keep
/// the earlier hit. Survivors come out in the order they entered, each at its own input position.
pub fn deduplicate(hits: Vec<Hit>) -> Vec<Hit> {
	let mut kept: HashMap<IdentityKey, (usize, Hit)> = HashMap::with_capacity(hits.len());

	for (position, hit) in hits.into_iter().enumerate() {
		match kept.entry(IdentityKey::of(&hit)) {
			Entry::Occupied(mut entry) =>
				if hit.final_score > entry.get().1.final_score {
					entry.insert((position, hit));
				},
			Entry::Vacant(entry) => {
				entry.insert((position, hit));
			},
		}
	}

	let mut survivors: Vec<(usize, Hit)> = kept.into_values().collect();

	survivors.sort_by_key(|(position, _)| *position);

	survivors.into_iter().map(|(_, hit)| hit).collect()
}
