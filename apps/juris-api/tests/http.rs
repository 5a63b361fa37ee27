use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use tower::util::ServiceExt;

use juris_api::{routes, state::AppState};
use juris_service::{Backends, CrossEncoder, QuotaStatus, VectorBackend, WebSearchBackend};
use juris_testkit::{
	FakeVectorBackend, FakeWebSearch, StubCrossEncoder, collection_hit, test_config,
};

fn app(vector: FakeVectorBackend) -> Router {
	app_with_web(vector, None)
}

fn app_with_web(vector: FakeVectorBackend, web: Option<FakeWebSearch>) -> Router {
	let backends = Backends::new(
		Arc::new(vector) as Arc<dyn VectorBackend>,
		web.map(|web| Arc::new(web) as Arc<dyn WebSearchBackend>),
		Some(Arc::new(StubCrossEncoder::new(0.6)) as Arc<dyn CrossEncoder>),
	);

	routes::router(AppState::with_backends(test_config(), backends))
}

fn populated() -> FakeVectorBackend {
	FakeVectorBackend::new()
		.with_hits(
			"deontology",
			vec![collection_hit(
				"Le médecin doit respecter le secret professionnel.",
				"R.4127-4",
				"codedeont.pdf",
				0.1,
			)],
		)
		.with_hits(
			"health_code",
			vec![collection_hit(
				"Le secret couvre l'ensemble des informations concernant la personne.",
				"L.1110-4",
				"csp.pdf",
				0.25,
			)],
		)
		.with_hits("civil_code", Vec::new())
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
	let response = app.oneshot(request).await.expect("Failed to call the router.");
	let status = response.status();
	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");

	if body.is_empty() {
		return (status, serde_json::Value::Null);
	}

	(status, serde_json::from_slice(&body).expect("Failed to parse response."))
}

fn post_retrieve(payload: serde_json::Value) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri("/v1/retrieve")
		.header("content-type", "application/json")
		.body(Body::from(payload.to_string()))
		.expect("Failed to build request.")
}

fn get(uri: &str) -> Request<Body> {
	Request::builder().uri(uri).body(Body::empty()).expect("Failed to build request.")
}

#[tokio::test]
async fn health_ok() {
	let (status, _) = call(app(FakeVectorBackend::new()), get("/health")).await;

	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn retrieve_returns_ranked_items() {
	let payload = serde_json::json!({ "query": "secret médical", "profile": "general" });
	let (status, json) = call(app(populated()), post_retrieve(payload)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["profile"], "general");
	assert_eq!(json["rule_set"], "generic");
	assert_eq!(json["items"].as_array().map(Vec::len), Some(2));
	assert_eq!(json["items"][0]["rank"], 1);
	assert_eq!(json["items"][0]["source_collection"], "deontology");
	assert_eq!(json["items"][0]["relevance_label"], "relevant");
	assert_eq!(json["backend_status"]["civil_code"]["status"], "responded");
	assert_eq!(json["scorer_degraded"], false);
}

#[tokio::test]
async fn empty_query_is_bad_request() {
	let payload = serde_json::json!({ "query": "   ", "profile": "general" });
	let (status, json) = call(app(populated()), post_retrieve(payload)).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn unknown_profile_is_bad_request() {
	let payload = serde_json::json!({ "query": "secret", "profile": "fastest" });
	let (status, json) = call(app(populated()), post_retrieve(payload)).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "UNKNOWN_PROFILE");
}

#[tokio::test]
async fn lists_collections_and_stats() {
	let app = app(populated());
	let (status, json) = call(app.clone(), get("/v1/collections")).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json.as_array().map(Vec::len), Some(3));
	assert_eq!(json[0]["name"], "deontology");
	assert_eq!(json[0]["available"], true);

	let (status, json) = call(app, get("/v1/collections/stats")).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json[0]["passages"], 1);
	assert_eq!(json[2]["passages"], 0);
}

#[tokio::test]
async fn reports_web_search_quota() {
	let web = FakeWebSearch::new().with_quota(QuotaStatus {
		daily_quota: 10_000,
		requests_made: 2_500,
		requests_remaining: 7_500,
		percentage_used: 25.0,
	});
	let (status, json) =
		call(app_with_web(populated(), Some(web)), get("/v1/web_search/quota")).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["daily_quota"], 10_000);
	assert_eq!(json["requests_made"], 2_500);
	assert_eq!(json["requests_remaining"], 7_500);
	assert_eq!(json["percentage_used"], 25.0);
}

#[tokio::test]
async fn web_search_quota_without_web_search_is_not_found() {
	let (status, json) = call(app(populated()), get("/v1/web_search/quota")).await;

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(json["error_code"], "WEB_SEARCH_DISABLED");
}
