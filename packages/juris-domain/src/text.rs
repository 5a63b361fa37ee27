use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static ARTICLE_PREFIX: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"^(?:articles?|art)\.?\s*").ok());

/// Canonical form used for keyword matching: NFC, lowercase, single spaces.
pub fn fold_query(query: &str) -> String {
	let composed: String = query.nfc().collect();

	composed.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical citation form: "Article R. 4127-4" and "r.4127-4" both become "r.4127-4".
pub fn normalize_article_reference(reference: &str) -> String {
	let folded: String = reference.nfkc().collect::<String>().trim().to_lowercase();
	let stripped = match ARTICLE_PREFIX.as_ref() {
		Some(re) => re.replace(folded.as_str(), "").into_owned(),
		None => folded,
	};

	stripped.chars().filter(|ch| !ch.is_whitespace()).collect()
}

/// Prefix match that refuses to split a number: "r.4127-4" matches "r.4127-4" and
/// "r.4127-4-1" but not "r.4127-40".
pub fn reference_has_prefix(normalized_reference: &str, prefix: &str) -> bool {
	let Some(rest) = normalized_reference.strip_prefix(prefix) else { return false };

	!rest.chars().next().map(|ch| ch.is_ascii_digit()).unwrap_or(false)
}

/// Hex content hash of the trimmed passage text.
pub fn content_hash(content: &str) -> String {
	blake3::hash(content.trim().as_bytes()).to_hex().to_string()
}
