use std::sync::Arc;

use juris_service::{Backends, JurisService};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<JurisService>,
}
impl AppState {
	/// Connects the production backends and probes every configured collection.
	pub async fn new(config: juris_config::Config) -> color_eyre::Result<Self> {
		let service = JurisService::new(config)?;

		service.probe_collections().await;

		let available = service.collections().iter().filter(|c| c.available).count();

		tracing::info!(
			collections = service.collections.all().len(),
			available,
			"Collection registry ready."
		);

		Ok(Self { service: Arc::new(service) })
	}

	pub fn with_backends(config: juris_config::Config, backends: Backends) -> Self {
		Self { service: Arc::new(JurisService::with_backends(config, backends)) }
	}
}
