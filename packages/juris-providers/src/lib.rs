pub mod cross_encoder;
pub mod embedding;
pub mod qdrant;
pub mod web_search;

mod error;

pub use error::{Error, Result};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

/// Bearer authorization plus configured static headers. An empty key sends no authorization.
pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	if !api_key.trim().is_empty() {
		headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);
	}

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

/// Rejects blank queries and zero limits before any I/O happens.
pub(crate) fn check_request(query: &str, limit: u32) -> Result<()> {
	if query.trim().is_empty() {
		return Err(Error::InvalidRequest { message: "Query text must be non-empty.".to_string() });
	}
	if limit == 0 {
		return Err(Error::InvalidRequest {
			message: "Result limit must be greater than zero.".to_string(),
		});
	}

	Ok(())
}
