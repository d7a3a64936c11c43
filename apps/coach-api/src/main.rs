use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = coach_api::Args::parse();

	coach_api::run(args).await
}
