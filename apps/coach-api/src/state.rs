use std::sync::Arc;

use coach_service::{CoachService, Providers};
use coach_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<CoachService>,
}
impl AppState {
	pub async fn new(config: coach_config::Config) -> color_eyre::Result<Self> {
		Self::with_providers(config, Providers::default()).await
	}

	pub async fn with_providers(
		config: coach_config::Config,
		providers: Providers,
	) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let service = CoachService::with_providers(config, db, providers);

		Ok(Self { service: Arc::new(service) })
	}
}
