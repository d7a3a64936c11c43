pub mod worker;

mod error;

pub use error::{Error, Result};

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use coach_service::Providers;
use coach_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = coach_cli::VERSION,
	rename_all = "kebab",
	styles = coach_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = coach_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	tracing::info!(
		daily_limit = config.campaigns.daily_limit,
		batch_size = config.campaigns.batch_size,
		"Campaign worker started."
	);

	let state = worker::WorkerState { db, cfg: config, providers: Providers::default() };

	worker::run_worker(state).await;

	Ok(())
}
