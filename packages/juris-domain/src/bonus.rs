//! Rule-based domain bonuses.
//!
//! Every rule set is an ordered, versioned table. Category rules reward the partition a hit came
//! from; theme rules reward a hit whose citation matches a topic named in the query. Within a
//! table the first matching rule wins.

use serde::{Deserialize, Serialize};

use crate::{
	hit::{HitSource, WebCorpus},
	text,
};

#[derive(Debug)]
pub struct CategoryRule {
	pub label: &'static str,
	/// Substrings of the lowercased collection name.
	pub collection_terms: &'static [&'static str],
	/// Substrings of the lowercased document type.
	pub document_type_terms: &'static [&'static str],
	pub bonus: f32,
}

#[derive(Debug)]
pub struct ThemeRule {
	pub label: &'static str,
	/// Collection-name substrings this theme is restricted to. Empty applies everywhere.
	pub scope: &'static [&'static str],
	/// Query keywords. Empty matches every query.
	pub keywords: &'static [&'static str],
	/// Normalized citation prefixes. Empty matches every citation.
	pub article_prefixes: &'static [&'static str],
	pub bonus: f32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Combine {
	/// Category and theme bonuses add up.
	Sum,
	/// A matching theme replaces the category bonus.
	ThemeOverrides,
}

#[derive(Debug)]
pub struct RuleSet {
	pub id: RuleSetId,
	pub version: u32,
	pub category: &'static [CategoryRule],
	pub themes: &'static [ThemeRule],
	pub combine: Combine,
	/// Collection hits without a citation receive no bonus at all.
	pub requires_article: bool,
	pub cap: f32,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSetId {
	Generic,
	Unified,
	Deontology,
}
impl RuleSetId {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Generic => "generic",
			Self::Unified => "unified",
			Self::Deontology => "deontology",
		}
	}

	pub fn rule_set(self) -> &'static RuleSet {
		match self {
			Self::Generic => &GENERIC,
			Self::Unified => &UNIFIED,
			Self::Deontology => &DEONTOLOGY,
		}
	}

	/// Rule set for a domain-focused profile. Domains without a dedicated table use the generic one.
	pub fn for_domain(domain: &str) -> Self {
		let domain = domain.to_lowercase();

		if DEONTOLOGY_TERMS.iter().any(|term| domain.contains(term)) {
			Self::Deontology
		} else {
			Self::Generic
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bonus {
	pub category: f32,
	pub thematic: f32,
	pub total: f32,
}

pub struct BonusInput<'a> {
	pub source: &'a HitSource,
	pub document_type: &'a str,
	pub article_reference: &'a str,
	/// Query folded with [`text::fold_query`].
	pub folded_query: &'a str,
}

const DEONTOLOGY_TERMS: &[&str] = &["deontolog", "déontolog"];
const HEALTH_TERMS: &[&str] = &["csp", "health", "sante", "santé"];
const CIVIL_TERMS: &[&str] = &["civil"];
const PENAL_TERMS: &[&str] = &["penal", "pénal", "criminal"];
const SOCIAL_SECURITY_TERMS: &[&str] = &["css", "social_security", "securite_sociale"];

const DEONTOLOGY_DUTY_KEYWORDS: &[&str] =
	&["secret", "consentement", "information", "responsabilité", "confidentialité"];
const HEALTH_LIABILITY_KEYWORDS: &[&str] =
	&["responsabilité", "faute", "accident", "erreur", "maladie"];
const HEALTH_LIABILITY_ARTICLES: &[&str] = &["l.1142", "l.1143"];

pub static GENERIC: RuleSet = RuleSet {
	id: RuleSetId::Generic,
	version: 1,
	category: &[
		CategoryRule {
			label: "deontology",
			collection_terms: DEONTOLOGY_TERMS,
			document_type_terms: DEONTOLOGY_TERMS,
			bonus: 0.3,
		},
		CategoryRule {
			label: "health_code",
			collection_terms: HEALTH_TERMS,
			document_type_terms: &["santé", "sante", "health"],
			bonus: 0.2,
		},
		CategoryRule {
			label: "civil_code",
			collection_terms: CIVIL_TERMS,
			document_type_terms: &[],
			bonus: 0.15,
		},
		CategoryRule {
			label: "penal_code",
			collection_terms: PENAL_TERMS,
			document_type_terms: &[],
			bonus: 0.15,
		},
		CategoryRule {
			label: "social_security_code",
			collection_terms: SOCIAL_SECURITY_TERMS,
			document_type_terms: &[],
			bonus: 0.1,
		},
	],
	themes: &[
		ThemeRule {
			label: "deontology_duties",
			scope: &[],
			keywords: DEONTOLOGY_DUTY_KEYWORDS,
			article_prefixes: &["r.4127"],
			bonus: 0.2,
		},
		ThemeRule {
			label: "health_liability",
			scope: &[],
			keywords: HEALTH_LIABILITY_KEYWORDS,
			article_prefixes: HEALTH_LIABILITY_ARTICLES,
			bonus: 0.2,
		},
	],
	combine: Combine::Sum,
	requires_article: false,
	cap: 0.4,
};

pub static UNIFIED: RuleSet = RuleSet {
	id: RuleSetId::Unified,
	version: 1,
	category: &[
		CategoryRule {
			label: "deontology",
			collection_terms: DEONTOLOGY_TERMS,
			document_type_terms: &[],
			bonus: 0.4,
		},
		CategoryRule {
			label: "health_code",
			collection_terms: HEALTH_TERMS,
			document_type_terms: &[],
			bonus: 0.3,
		},
		CategoryRule {
			label: "civil_code",
			collection_terms: CIVIL_TERMS,
			document_type_terms: &[],
			bonus: 0.25,
		},
		CategoryRule {
			label: "penal_code",
			collection_terms: PENAL_TERMS,
			document_type_terms: &[],
			bonus: 0.25,
		},
		CategoryRule {
			label: "social_security_code",
			collection_terms: SOCIAL_SECURITY_TERMS,
			document_type_terms: &[],
			bonus: 0.2,
		},
	],
	themes: &[
		ThemeRule {
			label: "deontology_duties",
			scope: DEONTOLOGY_TERMS,
			keywords: &[
				"secret",
				"consentement",
				"information",
				"responsabilité",
				"confidentialité",
				"éthique",
			],
			article_prefixes: &["r.4127"],
			bonus: 0.4,
		},
		ThemeRule {
			label: "health_liability",
			scope: HEALTH_TERMS,
			keywords: &["responsabilité", "faute", "accident", "erreur", "maladie", "santé"],
			article_prefixes: HEALTH_LIABILITY_ARTICLES,
			bonus: 0.4,
		},
		ThemeRule {
			label: "civil_liability",
			scope: CIVIL_TERMS,
			keywords: &["responsabilité", "dommage", "faute", "réparation"],
			article_prefixes: &["1382", "1383"],
			bonus: 0.3,
		},
		ThemeRule {
			label: "criminal_fault",
			scope: PENAL_TERMS,
			keywords: &["faute", "délit", "infraction", "sanction"],
			article_prefixes: &["121-1", "121-2"],
			bonus: 0.3,
		},
		ThemeRule {
			label: "social_security_cover",
			scope: SOCIAL_SECURITY_TERMS,
			keywords: &["sécurité sociale", "assurance", "remboursement"],
			article_prefixes: &[],
			bonus: 0.25,
		},
	],
	combine: Combine::ThemeOverrides,
	requires_article: true,
	cap: 0.4,
};

pub static DEONTOLOGY: RuleSet = RuleSet {
	id: RuleSetId::Deontology,
	version: 1,
	category: &[],
	themes: &[
		ThemeRule {
			label: "secret",
			scope: &[],
			keywords: &["secret"],
			article_prefixes: &["r.4127-4", "r.4127-72", "r.4127-104"],
			bonus: 0.4,
		},
		ThemeRule {
			label: "consent",
			scope: &[],
			keywords: &["consentement"],
			article_prefixes: &["r.4127-36", "r.4127-37", "r.4127-38"],
			bonus: 0.4,
		},
		ThemeRule {
			label: "information",
			scope: &[],
			keywords: &["information"],
			article_prefixes: &["r.4127-35", "r.4127-47", "r.4127-48"],
			bonus: 0.4,
		},
		ThemeRule {
			label: "liability",
			scope: &[],
			keywords: &["responsabilité"],
			article_prefixes: &["r.4127-95", "r.4127-96", "r.4127-97"],
			bonus: 0.4,
		},
		ThemeRule {
			label: "confidentiality",
			scope: &[],
			keywords: &["confidentialité"],
			article_prefixes: &["r.4127-4", "r.4127-72", "r.4127-104"],
			bonus: 0.4,
		},
		ThemeRule {
			label: "ethics",
			scope: &[],
			keywords: &["éthique"],
			article_prefixes: &["r.4127-1", "r.4127-2", "r.4127-3"],
			bonus: 0.4,
		},
		ThemeRule {
			label: "any_deontology_article",
			scope: &[],
			keywords: &[],
			article_prefixes: &["r.4127"],
			bonus: 0.2,
		},
	],
	combine: Combine::Sum,
	requires_article: false,
	cap: 0.4,
};

pub static CASE_LAW_SOURCES: &[CategoryRule] = &[
	CategoryRule {
		label: "supreme_court",
		collection_terms: &[],
		document_type_terms: &["cassation"],
		bonus: 0.2,
	},
	CategoryRule {
		label: "council_of_state",
		collection_terms: &[],
		document_type_terms: &["conseil d'état", "conseil d'etat", "conseil-etat"],
		bonus: 0.15,
	},
	CategoryRule {
		label: "lower_courts",
		collection_terms: &[],
		document_type_terms: &["cour d'appel", "tribunal"],
		bonus: 0.1,
	},
	CategoryRule {
		label: "official_portals",
		collection_terms: &[],
		document_type_terms: &["legifrance", "service-public"],
		bonus: 0.05,
	},
];

pub static BENEFITS_AGENCY_SOURCES: &[CategoryRule] = &[
	CategoryRule {
		label: "benefits_agency",
		collection_terms: &[],
		document_type_terms: &["oniam", "office national"],
		bonus: 0.2,
	},
	CategoryRule {
		label: "health_insurance",
		collection_terms: &[],
		document_type_terms: &["ameli", "assurance maladie"],
		bonus: 0.15,
	},
	CategoryRule {
		label: "government",
		collection_terms: &[],
		document_type_terms: &["service-public", "gouvernement"],
		bonus: 0.1,
	},
	CategoryRule {
		label: "legal_portals",
		collection_terms: &[],
		document_type_terms: &["legifrance", "droit"],
		bonus: 0.05,
	},
];

pub fn web_source_rules(corpus: WebCorpus) -> &'static [CategoryRule] {
	match corpus {
		WebCorpus::CaseLaw => CASE_LAW_SOURCES,
		WebCorpus::BenefitsAgency => BENEFITS_AGENCY_SOURCES,
	}
}

pub fn compute_bonus(rules: &RuleSet, input: &BonusInput<'_>) -> Bonus {
	let collection = input.source.name().to_lowercase();
	let document_type = input.document_type.to_lowercase();
	let article = text::normalize_article_reference(input.article_reference);

	if let HitSource::Web(corpus) = input.source {
		let category = category_bonus(web_source_rules(*corpus), &collection, &document_type);

		return finish(rules, category, 0.0);
	}
	if rules.requires_article && article.is_empty() {
		return Bonus::default();
	}

	let category = category_bonus(rules.category, &collection, &document_type);
	let thematic = thematic_bonus(rules.themes, &collection, &article, input.folded_query);

	finish(rules, category, thematic)
}

/// First category rule whose collection or document-type terms match. Inputs are lowercase.
pub fn category_bonus(rules: &[CategoryRule], collection: &str, document_type: &str) -> f32 {
	rules
		.iter()
		.find(|rule| {
			rule.collection_terms.iter().any(|term| collection.contains(term))
				|| rule.document_type_terms.iter().any(|term| document_type.contains(term))
		})
		.map(|rule| rule.bonus)
		.unwrap_or(0.0)
}

/// First theme rule whose scope, keywords, and citation prefixes all match.
pub fn thematic_bonus(
	rules: &[ThemeRule],
	collection: &str,
	normalized_article: &str,
	folded_query: &str,
) -> f32 {
	rules
		.iter()
		.find(|rule| theme_matches(rule, collection, normalized_article, folded_query))
		.map(|rule| rule.bonus)
		.unwrap_or(0.0)
}

fn theme_matches(
	rule: &ThemeRule,
	collection: &str,
	normalized_article: &str,
	folded_query: &str,
) -> bool {
	if !rule.scope.is_empty() && !rule.scope.iter().any(|term| collection.contains(term)) {
		return false;
	}
	if !rule.keywords.is_empty() && !rule.keywords.iter().any(|kw| folded_query.contains(kw)) {
		return false;
	}
	if rule.article_prefixes.is_empty() {
		return true;
	}
	if normalized_article.is_empty() {
		return false;
	}

	rule.article_prefixes
		.iter()
		.any(|prefix| text::reference_has_prefix(normalized_article, prefix))
}

fn finish(rules: &RuleSet, category: f32, thematic: f32) -> Bonus {
	let raw = match rules.combine {
		Combine::Sum => category + thematic,
		Combine::ThemeOverrides if thematic > 0.0 => thematic,
		Combine::ThemeOverrides => category,
	};

	Bonus { category, thematic, total: raw.clamp(0.0, rules.cap) }
}
