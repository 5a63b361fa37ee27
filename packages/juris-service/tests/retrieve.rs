use std::{sync::Arc, time::Duration};

use juris_domain::{
	hit::{HitSource, WebCorpus},
	normalize::NEUTRAL_SEMANTIC_SCORE,
};
use juris_service::{
	BackendStatus, Backends, CrossEncoder, Error, JurisService, QuotaStatus, RetrieveRequest,
	VectorBackend, WebSearchBackend,
};
use juris_testkit::{
	FakeResponse, FakeVectorBackend, FakeWebSearch, StubCrossEncoder, collection_hit, test_config,
	web_hit,
};

const SCENARIO_QUERY: &str = "secret médical et consentement éclairé";

fn service(
	vector: FakeVectorBackend,
	web: Option<FakeWebSearch>,
	encoder: Option<StubCrossEncoder>,
) -> (JurisService, Arc<FakeVectorBackend>) {
	let vector = Arc::new(vector);
	let backends = Backends::new(
		vector.clone() as Arc<dyn VectorBackend>,
		web.map(|web| Arc::new(web) as Arc<dyn WebSearchBackend>),
		encoder.map(|encoder| Arc::new(encoder) as Arc<dyn CrossEncoder>),
	);

	(JurisService::with_backends(test_config(), backends), vector)
}

fn scenario_backend() -> FakeVectorBackend {
	FakeVectorBackend::new()
		.with_hits(
			"deontology",
			vec![
				collection_hit(
					"Le médecin doit respecter le secret professionnel.",
					"R.4127-4",
					"codedeont.pdf",
					0.3,
				),
				collection_hit(
					"Le consentement de la personne examinée doit être recherché.",
					"R.4127-36",
					"codedeont.pdf",
					0.35,
				),
			],
		)
		.with_hits(
			"health_code",
			vec![collection_hit(
				"Les professionnels de santé ne sont responsables qu'en cas de faute.",
				"L.1142-1",
				"csp.pdf",
				0.2,
			)],
		)
		.with_hits("civil_code", Vec::new())
}

fn scenario_encoder() -> StubCrossEncoder {
	StubCrossEncoder::new(0.5)
		.with_score("secret professionnel", 0.9)
		.with_score("consentement", 0.9)
		.with_score("professionnels de santé", 0.6)
}

fn sources(items: &[juris_domain::hit::Hit]) -> Vec<&str> {
	items.iter().map(|hit| hit.source_collection.name()).collect()
}

#[tokio::test]
async fn deontology_hits_outrank_health_code_under_general_profile() {
	let (service, _) = service(scenario_backend(), None, Some(scenario_encoder()));
	let response = service.search_general(SCENARIO_QUERY).await.expect("Retrieval must succeed.");

	assert_eq!(sources(&response.items), vec!["deontology", "deontology", "health_code"]);
	assert_eq!(response.items[0].article_reference, "R.4127-4");
	assert_eq!(response.items[0].bonus, 0.4);
	assert_eq!(response.items[2].bonus, 0.2);
	assert_eq!(response.items.iter().map(|hit| hit.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
	assert_eq!(response.backends_queried, 3);
	assert_eq!(response.backends_responded, 3);
	assert_eq!(
		response.backend_status.get("civil_code"),
		Some(&BackendStatus::Responded { hits: 0 })
	);
	assert!(!response.scorer_degraded);
	assert_eq!(response.items[0].source_label, "Code de Déontologie Médicale");
}

#[tokio::test]
async fn total_backend_failure_is_an_empty_result() {
	let vector = FakeVectorBackend::new()
		.with_failure("deontology")
		.with_failure("health_code")
		.with_failure("civil_code");
	let (service, _) = service(vector, None, Some(scenario_encoder()));
	let response = service.search_general(SCENARIO_QUERY).await.expect("Failures must not error.");

	assert!(response.items.is_empty());
	assert_eq!(response.backends_queried, 3);
	assert_eq!(response.backends_responded, 0);
	assert!(
		response
			.backend_status
			.values()
			.all(|status| matches!(status, BackendStatus::Failed { .. }))
	);
}

#[tokio::test]
async fn offline_scorer_falls_back_to_neutral_scores() {
	let (service, _) = service(scenario_backend(), None, Some(StubCrossEncoder::offline()));
	let first = service.search_general(SCENARIO_QUERY).await.expect("Retrieval must succeed.");
	let second = service.search_general(SCENARIO_QUERY).await.expect("Retrieval must succeed.");

	assert!(first.scorer_degraded);
	assert!(first.items.iter().all(|hit| hit.semantic_score == Some(NEUTRAL_SEMANTIC_SCORE)));

	let scores = |items: &[juris_domain::hit::Hit]| {
		items.iter().map(|hit| (hit.content.clone(), hit.final_score)).collect::<Vec<_>>()
	};

	assert_eq!(scores(&first.items), scores(&second.items));
}

#[tokio::test]
async fn missing_scorer_is_reported_as_degraded() {
	let (service, _) = service(scenario_backend(), None, None);
	let response = service.search_general(SCENARIO_QUERY).await.expect("Retrieval must succeed.");

	assert!(response.scorer_degraded);
	assert_eq!(response.items.len(), 3);
}

#[tokio::test]
async fn duplicate_citations_keep_the_higher_score() {
	let vector = FakeVectorBackend::new().with_hits(
		"deontology",
		vec![
			collection_hit("Version A du secret.", "R.4127-4", "codedeont.pdf", 0.4),
			collection_hit("Version B du secret.", "Article R. 4127-4", "codedeont.pdf", 0.2),
		],
	);
	let (service, _) = service(vector, None, Some(StubCrossEncoder::new(0.7)));
	let response = service.search_general("secret").await.expect("Retrieval must succeed.");

	assert_eq!(response.items.len(), 1);
	assert_eq!(response.items[0].content, "Version B du secret.");
	assert!((response.items[0].normalized_relevance - 0.8).abs() < 1e-6);
}

#[tokio::test]
async fn results_are_truncated_to_profile_k() {
	let passages = |name: &str| {
		(0..5)
			.map(|idx| {
				collection_hit(&format!("{name} passage {idx}."), "", "code.pdf", idx as f32 * 0.1)
			})
			.collect::<Vec<_>>()
	};
	let vector = FakeVectorBackend::new()
		.with_hits("deontology", passages("deontology"))
		.with_hits("health_code", passages("health_code"))
		.with_hits("civil_code", passages("civil_code"));
	let (service, _) = service(vector, None, Some(StubCrossEncoder::new(0.5)));
	let response = service.search_general("contrat").await.expect("Retrieval must succeed.");

	assert_eq!(response.items.len(), 10);
	assert!(response.items.windows(2).all(|pair| pair[0].final_score >= pair[1].final_score));
	assert_eq!(
		response.items.iter().map(|hit| hit.rank).collect::<Vec<_>>(),
		(1..=10).collect::<Vec<_>>()
	);
	assert_eq!(response.items[0].content, "deontology passage 0.");
}

#[tokio::test]
async fn final_scores_stay_under_profile_ceilings() {
	let vector = FakeVectorBackend::new()
		.with_hits(
			"deontology",
			vec![
				collection_hit("Secret.", "R.4127-4", "codedeont.pdf", 0.0),
				collection_hit("Éthique.", "R.4127-1", "codedeont.pdf", 0.0),
			],
		)
		.with_hits("health_code", vec![collection_hit("Faute.", "L.1142-1", "csp.pdf", 0.0)])
		.with_hits("civil_code", vec![collection_hit("Dommage.", "1382", "cc.pdf", 0.0)]);
	let (service, _) = service(vector, None, Some(StubCrossEncoder::new(1.0)));
	let query = "secret éthique faute responsabilité dommage consentement";

	for (profile, ceiling) in
		[("general", 0.94), ("unified", 0.94), ("domain-focused:deontology", 0.88)]
	{
		let response = service
			.retrieve(RetrieveRequest::new(query, profile))
			.await
			.expect("Retrieval must succeed.");

		assert!((response.score_ceiling - ceiling).abs() < 1e-6, "{profile} ceiling.");
		assert!(!response.items.is_empty());

		for hit in &response.items {
			assert!(hit.final_score <= ceiling + 1e-6, "{profile} exceeded its ceiling.");
			assert!(hit.bonus <= 0.4 + 1e-6);
		}
	}
}

#[tokio::test]
async fn domain_focused_profile_queries_only_matching_collections() {
	let (service, vector) = service(scenario_backend(), None, Some(scenario_encoder()));
	let response =
		service.search_domain("deontology", SCENARIO_QUERY).await.expect("Retrieval must succeed.");

	assert_eq!(response.profile, "domain-focused:deontology");
	assert_eq!(response.backends_queried, 1);
	assert_eq!(vector.calls("deontology"), 1);
	assert_eq!(vector.calls("health_code"), 0);
	assert!(response.items.len() <= 3);
	assert!(sources(&response.items).iter().all(|name| *name == "deontology"));
	// R.4127-4 is mapped to "secret"; R.4127-36 to "consentement".
	assert!(response.items.iter().all(|hit| hit.bonus == 0.4));
}

#[tokio::test]
async fn input_errors_are_rejected_before_any_backend_call() {
	let (service, vector) = service(scenario_backend(), None, Some(scenario_encoder()));
	let empty = service.retrieve(RetrieveRequest::new("   ", "general")).await;
	let unknown = service.retrieve(RetrieveRequest::new(SCENARIO_QUERY, "fastest")).await;
	let no_domain =
		service.retrieve(RetrieveRequest::new(SCENARIO_QUERY, "domain-focused:tax_code")).await;

	assert!(matches!(empty, Err(Error::InvalidRequest { .. })));
	assert!(matches!(unknown, Err(Error::UnknownProfile { .. })));
	assert!(matches!(no_domain, Err(Error::UnknownProfile { .. })));
	assert_eq!(vector.calls("deontology"), 0);
}

#[tokio::test]
async fn shared_name_suffix_is_not_a_domain() {
	let (service, vector) = service(scenario_backend(), None, Some(scenario_encoder()));
	let generic = service.search_domain("code", SCENARIO_QUERY).await;
	let health = service.search_domain("health", SCENARIO_QUERY).await.expect("Must route.");

	assert!(matches!(generic, Err(Error::UnknownProfile { .. })));
	assert!(health.items.iter().all(|hit| hit.source_collection.name() == "health_code"));
	assert_eq!(health.backends_queried, 1);
	assert_eq!(vector.calls("health_code"), 1);
	assert_eq!(vector.calls("civil_code"), 0);
}

#[tokio::test]
async fn slow_backends_time_out_without_blocking_others() {
	let vector = scenario_backend().with(
		"civil_code",
		FakeResponse::Delayed(
			Duration::from_secs(2),
			vec![collection_hit("Lent.", "1240", "cc.pdf", 0.0)],
		),
	);
	let (service, _) = service(vector, None, Some(scenario_encoder()));
	let response = service.search_general(SCENARIO_QUERY).await.expect("Retrieval must succeed.");

	assert_eq!(response.backend_status.get("civil_code"), Some(&BackendStatus::TimedOut));
	assert_eq!(response.items.len(), 3);
	assert_eq!(response.backends_responded, 2);
}

#[tokio::test]
async fn request_deadline_cancels_outstanding_calls_and_keeps_partial_results() {
	let vector = scenario_backend().with(
		"civil_code",
		FakeResponse::Delayed(
			Duration::from_millis(250),
			vec![collection_hit("Tardif.", "1240", "cc.pdf", 0.0)],
		),
	);
	let (service, _) = service(vector, None, Some(scenario_encoder()));
	let request = RetrieveRequest {
		deadline_ms: Some(100),
		..RetrieveRequest::new(SCENARIO_QUERY, "general")
	};
	let response = service.retrieve(request).await.expect("Retrieval must succeed.");

	assert_eq!(response.backend_status.get("civil_code"), Some(&BackendStatus::Cancelled));
	assert_eq!(response.items.len(), 3);

	let civil = service.collections.get("civil_code").expect("civil_code must be registered.");

	assert!(civil.is_available());
	assert_eq!(civil.consecutive_failures(), 0);
}

#[tokio::test]
async fn repeated_failures_take_a_collection_out_of_rotation() {
	let vector = scenario_backend().with_failure("health_code");
	let (service, vector) = service(vector, None, Some(scenario_encoder()));

	for _ in 0..3 {
		let response =
			service.search_general(SCENARIO_QUERY).await.expect("Retrieval must succeed.");

		assert!(matches!(
			response.backend_status.get("health_code"),
			Some(BackendStatus::Failed { .. })
		));
	}

	let skipped = service.search_general(SCENARIO_QUERY).await.expect("Retrieval must succeed.");

	assert_eq!(skipped.backend_status.get("health_code"), Some(&BackendStatus::Skipped));
	assert_eq!(skipped.backends_queried, 2);
	assert_eq!(vector.calls("health_code"), 3);

	service.reset_availability();
	service.search_general(SCENARIO_QUERY).await.expect("Retrieval must succeed.");

	assert_eq!(vector.calls("health_code"), 4);
}

#[tokio::test]
async fn web_corpora_contribute_ranked_hits() {
	let web = FakeWebSearch::new().with(
		WebCorpus::CaseLaw,
		FakeResponse::Hits(vec![web_hit(
			"Cass. civ. 1re, secret médical et consentement",
			"https://www.courdecassation.fr/decision/1",
			"Cour de Cassation",
			0,
		)]),
	);
	let (service, _) = service(scenario_backend(), Some(web), Some(scenario_encoder()));
	let request = RetrieveRequest {
		web_corpora: Some(vec![WebCorpus::CaseLaw]),
		..RetrieveRequest::new(SCENARIO_QUERY, "general")
	};
	let response = service.retrieve(request).await.expect("Retrieval must succeed.");
	let web_hit = response
		.items
		.iter()
		.find(|hit| hit.source_collection == HitSource::Web(WebCorpus::CaseLaw))
		.expect("Web hit must be ranked.");

	assert_eq!(web_hit.category_bonus, 0.2);
	assert!((web_hit.normalized_relevance - 0.9).abs() < 1e-6);
	assert_eq!(web_hit.source_file, "https://www.courdecassation.fr/decision/1");
	assert_eq!(response.backends_queried, 4);
	assert_eq!(
		response.backend_status.get("web:case_law"),
		Some(&BackendStatus::Responded { hits: 1 })
	);
}

#[tokio::test]
async fn web_corpora_without_a_search_backend_are_skipped() {
	let (service, _) = service(scenario_backend(), None, Some(scenario_encoder()));
	let request = RetrieveRequest {
		web_corpora: Some(vec![WebCorpus::BenefitsAgency]),
		..RetrieveRequest::new(SCENARIO_QUERY, "unified")
	};
	let response = service.retrieve(request).await.expect("Retrieval must succeed.");

	assert_eq!(
		response.backend_status.get("web:benefits_agency"),
		Some(&BackendStatus::Skipped)
	);
	assert_eq!(response.backends_queried, 3);
}

#[tokio::test]
async fn probing_marks_missing_collections_unavailable() {
	let vector = FakeVectorBackend::new()
		.with_hits("deontology", vec![collection_hit("Secret.", "R.4127-4", "codedeont.pdf", 0.1)])
		.with_hits("civil_code", Vec::new());
	let (service, vector) = service(vector, None, Some(scenario_encoder()));

	service.probe_collections().await;

	let availability: Vec<(String, bool)> =
		service.collections().into_iter().map(|info| (info.name, info.available)).collect();

	assert_eq!(
		availability,
		vec![
			("deontology".to_string(), true),
			("health_code".to_string(), false),
			("civil_code".to_string(), true),
		]
	);

	let response = service.search_unified("secret").await.expect("Retrieval must succeed.");

	assert_eq!(response.backend_status.get("health_code"), Some(&BackendStatus::Skipped));
	assert_eq!(vector.calls("health_code"), 0);
}

#[tokio::test]
async fn collection_stats_count_passages_per_available_collection() {
	let vector = scenario_backend().with_failure("civil_code");
	let (service, _) = service(vector, None, None);
	let stats = service.collection_stats().await;
	let counts: Vec<(&str, u64)> =
		stats.iter().map(|entry| (entry.name.as_str(), entry.passages)).collect();

	assert_eq!(counts, vec![("deontology", 2), ("health_code", 1), ("civil_code", 0)]);
}

#[tokio::test]
async fn web_quota_comes_from_the_web_backend() {
	let quota = QuotaStatus {
		daily_quota: 100,
		requests_made: 40,
		requests_remaining: 60,
		percentage_used: 40.0,
	};
	let (with_web, _) = service(
		FakeVectorBackend::new(),
		Some(FakeWebSearch::new().with_quota(quota.clone())),
		None,
	);
	let (without_web, _) = service(FakeVectorBackend::new(), None, None);

	assert_eq!(with_web.web_quota(), Some(quota));
	assert_eq!(without_web.web_quota(), None);
}
