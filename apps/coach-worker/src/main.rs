use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = coach_worker::Args::parse();

	coach_worker::run(args).await
}
