use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::normalize;

/// External search corpora reachable through the web-search adapter.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebCorpus {
	CaseLaw,
	BenefitsAgency,
}
impl WebCorpus {
	pub const ALL: [Self; 2] = [Self::CaseLaw, Self::BenefitsAgency];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::CaseLaw => "case_law",
			Self::BenefitsAgency => "benefits_agency",
		}
	}

	/// Name used for this corpus wherever a collection name would appear.
	pub fn source_name(self) -> &'static str {
		match self {
			Self::CaseLaw => "web:case_law",
			Self::BenefitsAgency => "web:benefits_agency",
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			Self::CaseLaw => "Jurisprudence",
			Self::BenefitsAgency => "ONIAM",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim() {
			"case_law" => Some(Self::CaseLaw),
			"benefits_agency" => Some(Self::BenefitsAgency),
			_ => None,
		}
	}
}
impl fmt::Display for WebCorpus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Where a hit came from: a named vector-store partition or a web corpus.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum HitSource {
	Collection(String),
	Web(WebCorpus),
}
impl HitSource {
	pub fn name(&self) -> &str {
		match self {
			Self::Collection(name) => name.as_str(),
			Self::Web(corpus) => corpus.source_name(),
		}
	}

	pub fn is_web(&self) -> bool {
		matches!(self, Self::Web(_))
	}
}
impl Serialize for HitSource {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(self.name())
	}
}

/// Backend-native relevance signal.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RawSignal {
	/// Embedding distance; 0 means identical.
	Distance(f32),
	/// Zero-based position in the search engine's own ordering.
	WebRank(u32),
}

/// One candidate passage exactly as a backend returned it.
#[derive(Clone, Debug, PartialEq)]
pub struct RawHit {
	pub content: String,
	pub source_file: String,
	pub article_reference: String,
	pub document_type: String,
	pub raw_signal: RawSignal,
}

#[derive(Clone, Debug, Serialize)]
pub struct Hit {
	pub content: String,
	pub source_collection: HitSource,
	pub source_label: String,
	pub source_file: String,
	pub article_reference: String,
	pub document_type: String,
	pub raw_signal: RawSignal,
	pub normalized_relevance: f32,
	pub semantic_score: Option<f32>,
	pub category_bonus: f32,
	pub thematic_bonus: f32,
	pub bonus: f32,
	pub final_score: f32,
	pub relevance_label: RelevanceLabel,
	pub rank: u32,
}
impl Hit {
	pub fn from_raw(raw: RawHit, source: HitSource, source_label: impl Into<String>) -> Self {
		let normalized_relevance = normalize::relevance(raw.raw_signal);

		Self {
			content: raw.content,
			source_collection: source,
			source_label: source_label.into(),
			source_file: raw.source_file,
			article_reference: raw.article_reference,
			document_type: raw.document_type,
			raw_signal: raw.raw_signal,
			normalized_relevance,
			semantic_score: None,
			category_bonus: 0.0,
			thematic_bonus: 0.0,
			bonus: 0.0,
			final_score: 0.0,
			relevance_label: RelevanceLabel::from_score(normalize::NEUTRAL_SEMANTIC_SCORE),
			rank: 0,
		}
	}

	/// Semantic score used for fusion; hits never scored count as neutral.
	pub fn effective_semantic_score(&self) -> f32 {
		self.semantic_score.unwrap_or(normalize::NEUTRAL_SEMANTIC_SCORE)
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceLabel {
	High,
	Relevant,
	Moderate,
	Low,
}
impl RelevanceLabel {
	pub fn from_score(score: f32) -> Self {
		if score > 0.8 {
			Self::High
		} else if score > 0.6 {
			Self::Relevant
		} else if score > 0.4 {
			Self::Moderate
		} else {
			Self::Low
		}
	}
}
