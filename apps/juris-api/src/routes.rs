use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use crate::state::AppState;
use juris_service::{
	CollectionInfo, CollectionStats, Error as ServiceError, QuotaStatus, RetrieveRequest,
	RetrieveResponse,
};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/retrieve", post(retrieve))
		.route("/v1/collections", get(collections))
		.route("/v1/collections/stats", get(collection_stats))
		.route("/v1/web_search/quota", get(web_search_quota))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn retrieve(
	State(state): State<AppState>,
	Json(payload): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, ApiError> {
	let response = state.service.retrieve(payload).await?;

	Ok(Json(response))
}

async fn collections(State(state): State<AppState>) -> Json<Vec<CollectionInfo>> {
	Json(state.service.collections())
}

async fn collection_stats(State(state): State<AppState>) -> Json<Vec<CollectionStats>> {
	Json(state.service.collection_stats().await)
}

async fn web_search_quota(State(state): State<AppState>) -> Result<Json<QuotaStatus>, ApiError> {
	let quota = state.service.web_quota().ok_or_else(|| {
		ApiError::new(StatusCode::NOT_FOUND, "WEB_SEARCH_DISABLED", "Web search is not enabled.")
	})?;

	Ok(Json(quota))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } =>
				Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message),
			ServiceError::UnknownProfile { name } => Self::new(
				StatusCode::BAD_REQUEST,
				"UNKNOWN_PROFILE",
				format!("Unknown profile: {name}"),
			),
			ServiceError::Backend { message } => {
				tracing::error!(error = %message, "Retrieval backend failure.");

				Self::new(StatusCode::BAD_GATEWAY, "BACKEND_ERROR", message)
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
