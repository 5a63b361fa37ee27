//! Retrieval orchestration: fan-out to backends, then score, bonus, fuse, dedupe, and select.

use std::{collections::BTreeMap, future::Future, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::{
	task::JoinSet,
	time::{self, Instant},
};

use crate::{
	BackendResult, CollectionStats, Error, JurisService, Result, VectorBackend, WebSearchBackend,
};
use juris_domain::{
	bonus::{self, BonusInput, RuleSetId},
	dedup,
	fusion,
	hit::{Hit, HitSource, RawHit, WebCorpus},
	profile::{ProfileName, QueryProfile},
	select,
	text,
};

#[derive(Clone, Debug, Deserialize)]
pub struct RetrieveRequest {
	pub query: String,
	/// `general`, `unified`, or `domain-focused:<name>`.
	pub profile: String,
	/// Overrides the profile's configured web corpora. An empty list disables web search.
	#[serde(default)]
	pub web_corpora: Option<Vec<WebCorpus>>,
	/// Overrides `retrieval.request_timeout_ms` for this call.
	#[serde(default)]
	pub deadline_ms: Option<u64>,
}
impl RetrieveRequest {
	pub fn new(query: impl Into<String>, profile: impl Into<String>) -> Self {
		Self { query: query.into(), profile: profile.into(), web_corpora: None, deadline_ms: None }
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct RetrieveResponse {
	pub profile: String,
	pub rule_set: RuleSetId,
	pub score_ceiling: f32,
	pub items: Vec<Hit>,
	pub backends_queried: usize,
	pub backends_responded: usize,
	pub backend_status: BTreeMap<String, BackendStatus>,
	pub scorer_degraded: bool,
}

/// What one backend contributed to a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackendStatus {
	Responded { hits: usize },
	Failed { message: String },
	TimedOut,
	/// Not queried: marked unavailable or not configured.
	Skipped,
	/// Still outstanding when the request deadline expired.
	Cancelled,
}
impl BackendStatus {
	pub fn responded(&self) -> bool {
		matches!(self, Self::Responded { .. })
	}
}

enum Target {
	Collection(usize),
	Web(WebCorpus),
}

type Outcome = std::result::Result<BackendResult<Vec<RawHit>>, time::error::Elapsed>;

impl JurisService {
	pub async fn retrieve(&self, req: RetrieveRequest) -> Result<RetrieveResponse> {
		let query = req.query.trim();

		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
		}

		let name: ProfileName = req
			.profile
			.parse()
			.map_err(|_| Error::UnknownProfile { name: req.profile.trim().to_string() })?;
		let profile = QueryProfile::resolve(name, &self.cfg.profiles);
		let collections = self.target_collections(&profile)?;
		let corpora = req.web_corpora.clone().unwrap_or_else(|| profile.web_corpora.clone());
		let deadline_ms = req.deadline_ms.unwrap_or(self.cfg.retrieval.request_timeout_ms);
		let mut backend_status = BTreeMap::new();
		let mut targets = Vec::new();

		for idx in collections {
			let collection = &self.collections.all()[idx];

			if collection.is_available() {
				targets.push(Target::Collection(idx));
			} else {
				backend_status.insert(collection.name.clone(), BackendStatus::Skipped);
			}
		}
		for corpus in dedup_corpora(corpora) {
			if self.backends.web.is_some() {
				targets.push(Target::Web(corpus));
			} else {
				backend_status.insert(corpus.source_name().to_string(), BackendStatus::Skipped);
			}
		}

		let outcomes = self.fan_out(query, &targets, Duration::from_millis(deadline_ms)).await;
		let mut hits = Vec::new();

		for (target, outcome) in targets.iter().zip(outcomes) {
			let (key, status) = self.absorb(target, outcome, &mut hits);

			backend_status.insert(key, status);
		}

		let backends_queried = targets.len();
		let backends_responded = backend_status.values().filter(|s| s.responded()).count();
		let (items, scorer_degraded) = self.rank(query, &profile, hits).await;

		tracing::info!(
			profile = %profile.name,
			backends_queried,
			backends_responded,
			results = items.len(),
			scorer_degraded,
			"Retrieval completed."
		);

		Ok(RetrieveResponse {
			profile: profile.name.to_string(),
			rule_set: profile.rule_set,
			score_ceiling: profile.score_ceiling(),
			items,
			backends_queried,
			backends_responded,
			backend_status,
			scorer_degraded,
		})
	}

	pub async fn search_general(&self, query: &str) -> Result<RetrieveResponse> {
		self.retrieve(RetrieveRequest::new(query, "general")).await
	}

	pub async fn search_unified(&self, query: &str) -> Result<RetrieveResponse> {
		self.retrieve(RetrieveRequest::new(query, "unified")).await
	}

	pub async fn search_domain(&self, domain: &str, query: &str) -> Result<RetrieveResponse> {
		self.retrieve(RetrieveRequest::new(query, format!("domain-focused:{domain}"))).await
	}

	/// Passage counts for available collections. A failed count reports zero.
	pub async fn collection_stats(&self) -> Vec<CollectionStats> {
		let mut stats = Vec::new();

		for collection in self.collections.all().iter().filter(|c| c.is_available()) {
			let passages = match self.backends.vector.count(&collection.backend_name).await {
				Ok(count) => count,
				Err(err) => {
					tracing::warn!(
						collection = %collection.name,
						error = %err,
						"Collection count failed."
					);

					0
				},
			};

			stats.push(CollectionStats {
				name: collection.name.clone(),
				label: collection.label.clone(),
				passages,
			});
		}

		stats
	}

	/// Registry indices of the collections a profile reads from.
	fn target_collections(&self, profile: &QueryProfile) -> Result<Vec<usize>> {
		let all = self.collections.all();
		let Some(domain) = profile.name.domain() else {
			return Ok((0..all.len()).collect());
		};
		let matching: Vec<usize> =
			(0..all.len()).filter(|idx| all[*idx].matches_domain(domain)).collect();

		if matching.is_empty() {
			return Err(Error::UnknownProfile { name: profile.name.to_string() });
		}

		Ok(matching)
	}

	/// One task per target, each under the per-backend timeout. Tasks still running at the
	/// request deadline are aborted and reported as `None`.
	async fn fan_out(
		&self,
		query: &str,
		targets: &[Target],
		deadline: Duration,
	) -> Vec<Option<Outcome>> {
		let backend_timeout = Duration::from_millis(self.cfg.retrieval.backend_timeout_ms);
		let mut outcomes: Vec<Option<Outcome>> = targets.iter().map(|_| None).collect();
		let mut tasks = JoinSet::new();

		for (slot, target) in targets.iter().enumerate() {
			let query = query.to_string();

			match target {
				Target::Collection(idx) => {
					let backend = self.backends.vector.clone();
					let collection = self.collections.all()[*idx].backend_name.clone();
					let limit = self.cfg.retrieval.per_collection_limit;

					spawn_timed(&mut tasks, slot, backend_timeout, async move {
						query_collection(backend, collection, query, limit).await
					});
				},
				Target::Web(corpus) => {
					let Some(backend) = self.backends.web.clone() else { continue };
					let corpus = *corpus;
					let limit = self.cfg.retrieval.web_limit;

					spawn_timed(&mut tasks, slot, backend_timeout, async move {
						query_web(backend, corpus, query, limit).await
					});
				},
			}
		}

		let expiry = time::sleep_until(Instant::now() + deadline);

		tokio::pin!(expiry);

		loop {
			tokio::select! {
				joined = tasks.join_next() => match joined {
					Some(Ok((slot, outcome))) => outcomes[slot] = Some(outcome),
					Some(Err(err)) => {
						tracing::warn!(error = %err, "Backend task did not complete.");
					},
					None => break,
				},
				_ = &mut expiry => {
					tracing::warn!(
						outstanding = tasks.len(),
						"Request deadline expired. Cancelling outstanding backend calls."
					);
					tasks.abort_all();

					break;
				},
			}
		}

		outcomes
	}

	/// Converts one backend outcome into hits and a status, updating availability.
	fn absorb(
		&self,
		target: &Target,
		outcome: Option<Outcome>,
		hits: &mut Vec<Hit>,
	) -> (String, BackendStatus) {
		match target {
			Target::Collection(idx) => {
				let collection = &self.collections.all()[*idx];
				let status = match outcome {
					Some(Ok(Ok(raw))) => {
						collection.record_success();

						let count = raw.len();

						hits.extend(raw.into_iter().map(|raw| {
							Hit::from_raw(
								raw,
								HitSource::Collection(collection.name.clone()),
								collection.label.clone(),
							)
						}));

						BackendStatus::Responded { hits: count }
					},
					Some(Ok(Err(err))) => {
						tracing::warn!(
							collection = %collection.name,
							error = %err,
							"Collection query failed."
						);
						self.note_failure(collection);

						BackendStatus::Failed { message: err.to_string() }
					},
					Some(Err(_)) => {
						tracing::warn!(
							collection = %collection.name,
							"Collection query timed out."
						);
						self.note_failure(collection);

						BackendStatus::TimedOut
					},
					None => BackendStatus::Cancelled,
				};

				(collection.name.clone(), status)
			},
			Target::Web(corpus) => {
				let status = match outcome {
					Some(Ok(Ok(raw))) => {
						let count = raw.len();

						hits.extend(raw.into_iter().map(|raw| {
							Hit::from_raw(raw, HitSource::Web(*corpus), corpus.label())
						}));

						BackendStatus::Responded { hits: count }
					},
					Some(Ok(Err(err))) => {
						tracing::warn!(corpus = %corpus, error = %err, "Web search failed.");

						BackendStatus::Failed { message: err.to_string() }
					},
					Some(Err(_)) => {
						tracing::warn!(corpus = %corpus, "Web search timed out.");

						BackendStatus::TimedOut
					},
					None => BackendStatus::Cancelled,
				};

				(corpus.source_name().to_string(), status)
			},
		}
	}

	fn note_failure(&self, collection: &crate::Collection) {
		if collection.record_failure(self.collections.failure_threshold()) {
			tracing::warn!(
				collection = %collection.name,
				failures = collection.consecutive_failures(),
				"Collection marked unavailable after repeated failures."
			);
		}
	}

	/// Scoring, bonus, fusion, deduplication, and top-K selection over the unioned hits.
	async fn rank(
		&self,
		query: &str,
		profile: &QueryProfile,
		mut hits: Vec<Hit>,
	) -> (Vec<Hit>, bool) {
		let passages: Vec<String> = hits.iter().map(|hit| hit.content.clone()).collect();
		let batch = self.scorer.score(query, &passages).await;
		let folded = text::fold_query(query);
		let rules = profile.rules();

		for (hit, score) in hits.iter_mut().zip(batch.scores) {
			let bonus = bonus::compute_bonus(
				rules,
				&BonusInput {
					source: &hit.source_collection,
					document_type: &hit.document_type,
					article_reference: &hit.article_reference,
					folded_query: &folded,
				},
			);

			hit.semantic_score = Some(score);
			hit.category_bonus = bonus.category;
			hit.thematic_bonus = bonus.thematic;
			hit.bonus = bonus.total;
		}

		fusion::apply_fusion(&mut hits, &profile.weights);

		let hits = dedup::deduplicate(hits);

		(select::select_top_k(hits, profile.top_k), batch.degraded)
	}
}

fn spawn_timed<F>(
	tasks: &mut JoinSet<(usize, Outcome)>,
	slot: usize,
	timeout: Duration,
	call: F,
) where
	F: Future<Output = BackendResult<Vec<RawHit>>> + Send + 'static,
{
	tasks.spawn(async move { (slot, time::timeout(timeout, call).await) });
}

async fn query_collection(
	backend: Arc<dyn VectorBackend>,
	collection: String,
	query: String,
	limit: u32,
) -> BackendResult<Vec<RawHit>> {
	backend.query_collection(&collection, &query, limit).await
}

async fn query_web(
	backend: Arc<dyn WebSearchBackend>,
	corpus: WebCorpus,
	query: String,
	limit: u32,
) -> BackendResult<Vec<RawHit>> {
	backend.search(&query, corpus, limit).await
}

fn dedup_corpora(corpora: Vec<WebCorpus>) -> Vec<WebCorpus> {
	let mut seen = Vec::with_capacity(corpora.len());

	for corpus in corpora {
		if !seen.contains(&corpus) {
			seen.push(corpus);
		}
	}

	seen
}
