use std::{fmt, str::FromStr};

use juris_config::{ProfileConfig, Profiles};

use crate::{
	bonus::{RuleSet, RuleSetId},
	fusion::Weights,
	hit::WebCorpus,
};

const DOMAIN_FOCUSED_PREFIX: &str = "domain-focused:";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProfileError {
	#[error("Unknown profile {name:?}; expected general, unified, or domain-focused:<name>.")]
	Unknown { name: String },
	#[error("Profile domain-focused requires a domain name.")]
	MissingDomain,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ProfileName {
	General,
	Unified,
	/// Focus on the collections matching one domain, e.g. `domain-focused:deontology`.
	DomainFocused(String),
}
impl ProfileName {
	pub fn domain(&self) -> Option<&str> {
		match self {
			Self::DomainFocused(domain) => Some(domain.as_str()),
			_ => None,
		}
	}
}
impl FromStr for ProfileName {
	type Err = ProfileError;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		let trimmed = raw.trim();

		match trimmed {
			"general" => return Ok(Self::General),
			"unified" => return Ok(Self::Unified),
			"domain-focused" => return Err(ProfileError::MissingDomain),
			_ => {},
		}

		let Some(domain) = trimmed.strip_prefix(DOMAIN_FOCUSED_PREFIX) else {
			return Err(ProfileError::Unknown { name: raw.to_string() });
		};
		let domain = domain.trim();

		if domain.is_empty() {
			return Err(ProfileError::MissingDomain);
		}

		Ok(Self::DomainFocused(domain.to_lowercase()))
	}
}
impl fmt::Display for ProfileName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::General => f.write_str("general"),
			Self::Unified => f.write_str("unified"),
			Self::DomainFocused(domain) => write!(f, "{DOMAIN_FOCUSED_PREFIX}{domain}"),
		}
	}
}

/// Fully resolved fusion profile: weights, bonus rules, output size, and web corpora.
#[derive(Clone, Debug)]
pub struct QueryProfile {
	pub name: ProfileName,
	pub weights: Weights,
	pub rule_set: RuleSetId,
	pub top_k: usize,
	pub web_corpora: Vec<WebCorpus>,
}
impl QueryProfile {
	pub fn from_config(name: ProfileName, cfg: &ProfileConfig) -> Self {
		let rule_set = match &name {
			ProfileName::General => RuleSetId::Generic,
			ProfileName::Unified => RuleSetId::Unified,
			ProfileName::DomainFocused(domain) => RuleSetId::for_domain(domain),
		};
		let web_corpora = cfg.web_corpora.iter().filter_map(|raw| WebCorpus::parse(raw)).collect();

		Self {
			name,
			weights: Weights {
				semantic: cfg.semantic_weight,
				relevance: cfg.relevance_weight,
				bonus: cfg.bonus_weight,
			},
			rule_set,
			top_k: cfg.top_k as usize,
			web_corpora,
		}
	}

	pub fn resolve(name: ProfileName, profiles: &Profiles) -> Self {
		let cfg = match &name {
			ProfileName::General => &profiles.general,
			ProfileName::Unified => &profiles.unified,
			ProfileName::DomainFocused(_) => &profiles.domain_focused,
		};

		Self::from_config(name, cfg)
	}

	pub fn rules(&self) -> &'static RuleSet {
		self.rule_set.rule_set()
	}

	/// Upper bound on any `final_score` this profile can produce.
	pub fn score_ceiling(&self) -> f32 {
		self.weights.ceiling(self.rules().cap)
	}
}
