//! Web search adapter for the case-law and benefits-agency corpora.
//!
//! Holds the only cross-request mutable state of the retrieval path: a round-robin index into the
//! credential pool, a TTL cache of result pages, the send pacer, and the daily quota counter. All
//! of it sits behind mutexes.

use std::{
	collections::HashMap,
	sync::Mutex,
	time::{Duration, Instant},
};

use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde_json::Value;

use crate::{Error, Result};
use juris_config::WebSearchConfig;
use juris_domain::{
	hit::{RawHit, RawSignal, WebCorpus},
	text,
};

const UNKNOWN_SOURCE: &str = "unknown";
const RESPONSE_FIELDS: &str = "items(title,link,snippet)";
const MAX_PAGE_SIZE: u32 = 10;
const QUOTA_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);
const KNOWN_SOURCES: [(&str, &str); 4] = [
	("oniam.fr", "ONIAM"),
	("legifrance.gouv.fr", "Legifrance"),
	("courdecassation.fr", "Cour de Cassation"),
	("dalloz.fr", "Dalloz"),
];

pub struct WebSearchClient {
	cfg: WebSearchConfig,
	client: Client,
	keys: KeyPool,
	cache: ResultCache,
	pacer: RequestPacer,
	quota: QuotaTracker,
}
impl WebSearchClient {
	pub fn new(cfg: &WebSearchConfig) -> Result<Self> {
		if cfg.api_keys.is_empty() {
			return Err(Error::InvalidConfig {
				message: "Web search requires at least one API key.".to_string(),
			});
		}

		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self {
			cfg: cfg.clone(),
			client,
			keys: KeyPool::new(cfg.api_keys.clone()),
			cache: ResultCache::new(Duration::from_secs(cfg.cache_ttl_secs)),
			pacer: RequestPacer::new(Duration::from_millis(cfg.min_interval_ms)),
			quota: QuotaTracker::new(cfg.daily_quota, Instant::now()),
		})
	}

	/// HTTP calls sent in the current quota window, cache hits excluded.
	pub fn requests_made(&self) -> u64 {
		self.quota_status().requests_made
	}

	pub fn quota_status(&self) -> QuotaStatus {
		self.quota.status(Instant::now())
	}

	/// Up to `limit` hits for `query` from `corpus`, in the engine's own order.
	///
	/// A quota response rotates to the next credential and retries once per remaining credential.
	/// Server errors yield an empty, uncached page.
	pub async fn search(&self, query: &str, corpus: WebCorpus, limit: u32) -> Result<Vec<RawHit>> {
		crate::check_request(query, limit)?;

		let key = CacheKey { query: text::fold_query(query), corpus };

		if let Some(hits) = self.cache.get(&key, Instant::now()) {
			tracing::debug!(corpus = %corpus, "Web search served from cache.");

			return Ok(truncate(hits, limit));
		}

		let Some(hits) = self.fetch(query, corpus).await? else {
			return Ok(Vec::new());
		};

		self.cache.insert(key, hits.clone(), Instant::now());

		Ok(truncate(hits, limit))
	}

	/// `Ok(None)` signals a server-side failure that must not be cached.
	async fn fetch(&self, query: &str, corpus: WebCorpus) -> Result<Option<Vec<RawHit>>> {
		let url = format!("{}{}", self.cfg.api_base, self.cfg.path);
		let cleaned = clean_query(query, self.cfg.max_query_chars as usize);
		let attempts = self.keys.len();

		for _ in 0..attempts {
			let (slot, api_key) = self.keys.current();
			let params = self.request_params(&api_key, corpus, &cleaned);

			self.pace().await;

			let res = self.client.get(url.as_str()).query(&params).send().await?;
			let status = res.status();

			if status == StatusCode::TOO_MANY_REQUESTS {
				tracing::warn!(
					corpus = %corpus,
					key_slot = slot,
					"Web search quota hit. Rotating credential."
				);

				self.keys.rotate_from(slot);

				continue;
			}
			if status.is_server_error() {
				tracing::warn!(
					corpus = %corpus,
					status = status.as_u16(),
					"Web search server error. Treating as zero results."
				);

				return Ok(None);
			}
			if !status.is_success() {
				let body = res.text().await.unwrap_or_default();

				return Err(Error::Status { status: status.as_u16(), body });
			}

			let json: Value = res.json().await?;

			return parse_items(&json).map(Some);
		}

		Err(Error::QuotaExhausted { attempts })
	}

	/// Waits for this call's send slot, then counts it against the daily quota.
	async fn pace(&self) {
		let wait = self.pacer.reserve(Instant::now());

		if !wait.is_zero() {
			tokio::time::sleep(wait).await;
		}

		let made = self.quota.record(Instant::now());

		if made == self.cfg.daily_quota {
			tracing::warn!(daily_quota = self.cfg.daily_quota, "Web search daily quota reached.");
		}
	}

	fn request_params(
		&self,
		api_key: &str,
		corpus: WebCorpus,
		query: &str,
	) -> Vec<(&'static str, String)> {
		let engine = match corpus {
			WebCorpus::CaseLaw => &self.cfg.engines.case_law,
			WebCorpus::BenefitsAgency => &self.cfg.engines.benefits_agency,
		};
		let mut params = vec![
			("key", api_key.to_string()),
			("cx", engine.clone()),
			("q", query.to_string()),
			("num", self.cfg.max_results.min(MAX_PAGE_SIZE).to_string()),
			("lr", self.cfg.language.clone()),
			("gl", self.cfg.country.clone()),
			("fields", RESPONSE_FIELDS.to_string()),
		];

		if let Some(restrict) = self.cfg.date_restrict.as_ref() {
			params.push(("dateRestrict", restrict.clone()));
		}

		params
	}
}

/// Round-robin credential pool.
pub struct KeyPool {
	keys: Vec<String>,
	cursor: Mutex<usize>,
}
impl KeyPool {
	pub fn new(keys: Vec<String>) -> Self {
		Self { keys, cursor: Mutex::new(0) }
	}

	pub fn len(&self) -> usize {
		self.keys.len()
	}

	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	pub fn current(&self) -> (usize, String) {
		let cursor = *self.cursor.lock().unwrap_or_else(|err| err.into_inner());
		let key = self.keys.get(cursor).cloned().unwrap_or_default();

		(cursor, key)
	}

	/// Advances past `slot` unless a concurrent caller already did.
	pub fn rotate_from(&self, slot: usize) {
		if self.keys.is_empty() {
			return;
		}

		let mut cursor = self.cursor.lock().unwrap_or_else(|err| err.into_inner());

		if *cursor == slot {
			*cursor = (slot + 1) % self.keys.len();
		}
	}
}

/// Spaces sends at least `min_interval` apart, including across concurrent callers.
pub struct RequestPacer {
	min_interval: Duration,
	next_slot: Mutex<Option<Instant>>,
}
impl RequestPacer {
	pub fn new(min_interval: Duration) -> Self {
		Self { min_interval, next_slot: Mutex::new(None) }
	}

	/// Claims the earliest free send slot and returns how long to wait for it.
	pub fn reserve(&self, now: Instant) -> Duration {
		let mut next_slot = self.next_slot.lock().unwrap_or_else(|err| err.into_inner());
		let slot = match *next_slot {
			Some(at) if at > now => at,
			_ => now,
		};

		*next_slot = Some(slot + self.min_interval);

		slot.saturating_duration_since(now)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuotaStatus {
	pub daily_quota: u64,
	pub requests_made: u64,
	pub requests_remaining: u64,
	pub percentage_used: f64,
}

struct QuotaWindow {
	opened_at: Instant,
	requests: u64,
}
impl QuotaWindow {
	fn roll(&mut self, now: Instant) {
		if now.saturating_duration_since(self.opened_at) >= QUOTA_WINDOW {
			self.opened_at = now;
			self.requests = 0;
		}
	}
}

/// Counts sends against the daily quota. The count resets 24 hours after the window opened.
pub struct QuotaTracker {
	daily_quota: u64,
	window: Mutex<QuotaWindow>,
}
impl QuotaTracker {
	pub fn new(daily_quota: u64, now: Instant) -> Self {
		Self { daily_quota, window: Mutex::new(QuotaWindow { opened_at: now, requests: 0 }) }
	}

	/// Counts one send and returns the window's total.
	pub fn record(&self, now: Instant) -> u64 {
		let mut window = self.window.lock().unwrap_or_else(|err| err.into_inner());

		window.roll(now);
		window.requests += 1;

		window.requests
	}

	pub fn status(&self, now: Instant) -> QuotaStatus {
		let mut window = self.window.lock().unwrap_or_else(|err| err.into_inner());

		window.roll(now);

		let made = window.requests;
		let percentage_used = if self.daily_quota == 0 {
			100.0
		} else {
			made as f64 / self.daily_quota as f64 * 100.0
		};

		QuotaStatus {
			daily_quota: self.daily_quota,
			requests_made: made,
			requests_remaining: self.daily_quota.saturating_sub(made),
			percentage_used,
		}
	}
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CacheKey {
	pub query: String,
	pub corpus: WebCorpus,
}

struct CacheEntry {
	stored_at: Instant,
	hits: Vec<RawHit>,
}

/// Result pages keyed by folded query and corpus, expiring after a fixed TTL.
pub struct ResultCache {
	ttl: Duration,
	entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}
impl ResultCache {
	pub fn new(ttl: Duration) -> Self {
		Self { ttl, entries: Mutex::new(HashMap::new()) }
	}

	pub fn get(&self, key: &CacheKey, now: Instant) -> Option<Vec<RawHit>> {
		let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());
		let fresh = entries
			.get(key)
			.map(|entry| now.saturating_duration_since(entry.stored_at) < self.ttl)?;

		if !fresh {
			entries.remove(key);

			return None;
		}

		entries.get(key).map(|entry| entry.hits.clone())
	}

	pub fn insert(&self, key: CacheKey, hits: Vec<RawHit>, now: Instant) {
		let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

		entries.retain(|_, entry| now.saturating_duration_since(entry.stored_at) < self.ttl);
		entries.insert(key, CacheEntry { stored_at: now, hits });
	}

	pub fn len(&self) -> usize {
		self.entries.lock().unwrap_or_else(|err| err.into_inner()).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Trims and truncates to `max_chars` characters.
pub fn clean_query(query: &str, max_chars: usize) -> String {
	query.trim().chars().take(max_chars).collect()
}

/// Human label for the site a link points to.
pub fn source_label(link: &str) -> String {
	let Ok(url) = Url::parse(link) else { return UNKNOWN_SOURCE.to_string() };
	let Some(host) = url.host_str() else { return UNKNOWN_SOURCE.to_string() };
	let host = host.to_lowercase();

	KNOWN_SOURCES
		.iter()
		.find(|(domain, _)| host.contains(domain))
		.map(|(_, label)| label.to_string())
		.unwrap_or(host)
}

/// A response without `items` is an empty result page.
fn parse_items(json: &Value) -> Result<Vec<RawHit>> {
	let Some(items) = json.get("items") else { return Ok(Vec::new()) };
	let items = items.as_array().ok_or_else(|| Error::InvalidResponse {
		message: "Web search items must be an array.".to_string(),
	})?;
	let hits = items
		.iter()
		.enumerate()
		.map(|(idx, item)| {
			let field = |name: &str| item.get(name).and_then(|v| v.as_str()).unwrap_or_default();
			let link = field("link");

			RawHit {
				content: format!("{} {}", field("title"), field("snippet")).trim().to_string(),
				source_file: link.to_string(),
				article_reference: String::new(),
				document_type: source_label(link),
				raw_signal: RawSignal::WebRank(idx as u32),
			}
		})
		.collect();

	Ok(hits)
}

fn truncate(mut hits: Vec<RawHit>, limit: u32) -> Vec<RawHit> {
	hits.truncate(limit as usize);

	hits
}

#[cfg(test)]
mod tests {
	use super::*;

	fn raw(content: &str) -> RawHit {
		RawHit {
			content: content.to_string(),
			source_file: String::new(),
			article_reference: String::new(),
			document_type: String::new(),
			raw_signal: RawSignal::WebRank(0),
		}
	}

	#[test]
	fn cache_entries_expire_after_ttl() {
		let cache = ResultCache::new(Duration::from_secs(3_600));
		let key = CacheKey { query: "faute médicale".to_string(), corpus: WebCorpus::CaseLaw };
		let start = Instant::now();

		cache.insert(key.clone(), vec![raw("a")], start);

		assert!(cache.get(&key, start + Duration::from_secs(3_599)).is_some());
		assert!(cache.get(&key, start + Duration::from_secs(3_600)).is_none());
		assert!(cache.is_empty());
	}

	#[test]
	fn cache_is_keyed_by_corpus() {
		let cache = ResultCache::new(Duration::from_secs(60));
		let now = Instant::now();
		let query = "indemnisation".to_string();

		cache.insert(CacheKey { query: query.clone(), corpus: WebCorpus::CaseLaw }, vec![], now);

		assert!(cache.get(&CacheKey { query, corpus: WebCorpus::BenefitsAgency }, now).is_none());
	}

	#[test]
	fn key_pool_rotates_once_per_observed_slot() {
		let pool = KeyPool::new(vec!["a".to_string(), "b".to_string(), "c".to_string()]);

		assert_eq!(pool.current(), (0, "a".to_string()));

		pool.rotate_from(0);
		// A second caller that also saw slot 0 does not skip "b".
		pool.rotate_from(0);

		assert_eq!(pool.current(), (1, "b".to_string()));

		pool.rotate_from(1);
		pool.rotate_from(2);

		assert_eq!(pool.current(), (0, "a".to_string()));
	}

	#[test]
	fn pacer_spaces_back_to_back_sends() {
		let pacer = RequestPacer::new(Duration::from_millis(100));
		let now = Instant::now();

		assert_eq!(pacer.reserve(now), Duration::ZERO);
		assert_eq!(pacer.reserve(now), Duration::from_millis(100));
		assert_eq!(pacer.reserve(now + Duration::from_millis(50)), Duration::from_millis(150));
		assert_eq!(pacer.reserve(now + Duration::from_secs(1)), Duration::ZERO);
	}

	#[test]
	fn zero_interval_never_waits() {
		let pacer = RequestPacer::new(Duration::ZERO);
		let now = Instant::now();

		assert_eq!(pacer.reserve(now), Duration::ZERO);
		assert_eq!(pacer.reserve(now), Duration::ZERO);
	}

	#[test]
	fn quota_window_counts_and_resets() {
		let start = Instant::now();
		let quota = QuotaTracker::new(4, start);

		for _ in 0..3 {
			quota.record(start);
		}

		let status = quota.status(start + Duration::from_secs(60));

		assert_eq!(status.requests_made, 3);
		assert_eq!(status.requests_remaining, 1);
		assert!((status.percentage_used - 75.0).abs() < 1e-9);

		quota.record(start);
		quota.record(start);

		assert_eq!(quota.status(start).requests_remaining, 0);

		let next_day = quota.status(start + QUOTA_WINDOW);

		assert_eq!(next_day.requests_made, 0);
		assert_eq!(next_day.requests_remaining, 4);
	}

	#[test]
	fn query_cleaning_truncates_on_char_boundaries() {
		let long = format!("  {}  ", "é".repeat(150));
		let cleaned = clean_query(&long, 100);

		assert_eq!(cleaned.chars().count(), 100);
		assert_eq!(clean_query(" faute ", 100), "faute");
	}

	#[test]
	fn source_labels_come_from_link_host() {
		assert_eq!(source_label("https://www.oniam.fr/indemnisation"), "ONIAM");
		assert_eq!(source_label("https://www.legifrance.gouv.fr/juri/id/X"), "Legifrance");
		assert_eq!(source_label("https://www.courdecassation.fr/decision/1"), "Cour de Cassation");
		assert_eq!(source_label("https://www.dalloz.fr/x"), "Dalloz");
		assert_eq!(source_label("https://www.ameli.fr/x"), "www.ameli.fr");
		assert_eq!(source_label(""), UNKNOWN_SOURCE);
		assert_eq!(source_label("not a url"), UNKNOWN_SOURCE);
	}

	#[test]
	fn items_become_ranked_hits() {
		let json = serde_json::json!({
			"items": [
				{ "title": "Cass. civ. 1re", "link": "https://www.courdecassation.fr/a", "snippet": "Faute." },
				{ "title": "ONIAM", "link": "https://www.oniam.fr/b" }
			]
		});
		let hits = parse_items(&json).expect("Parse failed.");

		assert_eq!(hits.len(), 2);
		assert_eq!(hits[0].content, "Cass. civ. 1re Faute.");
		assert_eq!(hits[0].source_file, "https://www.courdecassation.fr/a");
		assert_eq!(hits[0].document_type, "Cour de Cassation");
		assert_eq!(hits[1].content, "ONIAM");
		assert_eq!(hits[1].raw_signal, RawSignal::WebRank(1));
		assert!(parse_items(&serde_json::json!({})).expect("Parse failed.").is_empty());
	}
}
