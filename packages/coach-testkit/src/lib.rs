//! Per-test Postgres databases. Each [`TestDatabase`] lives on the server named by
//! `COACH_PG_DSN` and is dropped with `WITH (FORCE)` once the test is done.

mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr, thread};

use sqlx::{
	ConnectOptions, Connection,
	postgres::{PgConnectOptions, PgConnection},
};
use uuid::Uuid;

pub const DSN_ENV: &str = "COACH_PG_DSN";

/// Maintenance databases tried in order when creating and dropping test databases.
const MAINTENANCE_DATABASES: [&str; 2] = ["postgres", "template1"];

pub struct TestDatabase {
	name: String,
	dsn: String,
	maintenance: PgConnectOptions,
	dropped: bool,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::Message(format!("{DSN_ENV} is not a valid DSN: {err}.")))?;
		let (maintenance, mut conn) = open_maintenance(&base).await?;
		let name = format!("coach_test_{}", Uuid::new_v4().simple());

		sqlx::raw_sql(&format!("CREATE DATABASE {name}"))
			.execute(&mut conn)
			.await
			.map_err(|err| Error::Message(format!("Cannot create {name}: {err}.")))?;
		conn.close().await?;

		let dsn = base.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, maintenance, dropped: false })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	/// Drops the database now. Tests that skip this still get it dropped on `Drop`.
	pub async fn cleanup(mut self) -> Result<()> {
		drop_database(&self.maintenance, &self.name).await?;

		self.dropped = true;

		Ok(())
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.dropped {
			return;
		}

		// `Drop` may run inside a runtime, so the async drop gets a thread and runtime of its own.
		thread::scope(|scope| {
			scope.spawn(|| {
				let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build();
				let outcome = match runtime {
					Ok(runtime) => runtime.block_on(drop_database(&self.maintenance, &self.name)),
					Err(err) => Err(Error::Message(format!("No runtime for cleanup: {err}."))),
				};

				if let Err(err) = outcome {
					eprintln!("Leaked test database {}: {err}", self.name);
				}
			});
		});
	}
}

/// DSN of the server integration tests run against, when one is configured.
pub fn env_dsn() -> Option<String> {
	env::var(DSN_ENV).ok().filter(|dsn| !dsn.trim().is_empty())
}

async fn open_maintenance(base: &PgConnectOptions) -> Result<(PgConnectOptions, PgConnection)> {
	let mut failures = Vec::new();

	for database in MAINTENANCE_DATABASES {
		let options = base.clone().database(database);

		match PgConnection::connect_with(&options).await {
			Ok(conn) => return Ok((options, conn)),
			Err(err) => failures.push(format!("{database}: {err}")),
		}
	}

	Err(Error::Message(format!("No maintenance database reachable ({}).", failures.join("; "))))
}

async fn drop_database(maintenance: &PgConnectOptions, name: &str) -> Result<()> {
	let mut conn = PgConnection::connect_with(maintenance).await?;

	sqlx::raw_sql(&format!("DROP DATABASE IF EXISTS {name} WITH (FORCE)"))
		.execute(&mut conn)
		.await
		.map_err(|err| Error::Message(format!("Cannot drop {name}: {err}.")))?;
	conn.close().await?;

	Ok(())
}
