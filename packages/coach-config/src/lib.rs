mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	App, Campaigns, Config, Postgres, Security, Service, Signatures, Smtp, Storage, Stripe,
};

use std::{fs, path::Path};

/// Seconds an email queue item may stay claimed before another dispatch cycle reclaims it.
pub const QUEUE_LEASE_SECONDS: u64 = 600;
/// Longest validity a signature link can be given.
pub const MAX_SIGNATURE_EXPIRY_DAYS: i64 = 365;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("storage.postgres.dsn", &cfg.storage.postgres.dsn),
		("smtp.host", &cfg.smtp.host),
		("smtp.from", &cfg.smtp.from),
		("security.admin_token", &cfg.security.admin_token),
		("security.session_secret", &cfg.security.session_secret),
		("security.unsubscribe_secret", &cfg.security.unsubscribe_secret),
		("app.owner_email", &cfg.app.owner_email),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.smtp.port == 0 {
		return Err(Error::Validation {
			message: "smtp.port must be greater than zero.".to_string(),
		});
	}
	if !cfg.app.public_url.starts_with("http://") && !cfg.app.public_url.starts_with("https://")
	{
		return Err(Error::Validation {
			message: "app.public_url must start with http:// or https://.".to_string(),
		});
	}
	if cfg.security.session_ttl_hours <= 0 {
		return Err(Error::Validation {
			message: "security.session_ttl_hours must be greater than zero.".to_string(),
		});
	}
	if cfg.stripe.tolerance_seconds <= 0 {
		return Err(Error::Validation {
			message: "stripe.tolerance_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.campaigns.daily_limit == 0 {
		return Err(Error::Validation {
			message: "campaigns.daily_limit must be greater than zero.".to_string(),
		});
	}
	if cfg.campaigns.batch_size == 0 {
		return Err(Error::Validation {
			message: "campaigns.batch_size must be greater than zero.".to_string(),
		});
	}
	// A claimed batch must be sent well within its lease.
	if u64::from(cfg.campaigns.batch_size).saturating_mul(cfg.campaigns.send_delay_ms)
		> QUEUE_LEASE_SECONDS * 1_000 / 2
	{
		return Err(Error::Validation {
			message: format!(
				"campaigns.batch_size * campaigns.send_delay_ms must not exceed {} seconds.",
				QUEUE_LEASE_SECONDS / 2
			),
		});
	}
	if !(1..=MAX_SIGNATURE_EXPIRY_DAYS).contains(&cfg.signatures.default_expiry_days) {
		return Err(Error::Validation {
			message: format!(
				"signatures.default_expiry_days must be between 1 and {MAX_SIGNATURE_EXPIRY_DAYS}."
			),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.smtp.password.as_deref().map(|password| password.trim().is_empty()).unwrap_or(false) {
		cfg.smtp.password = None;
	}
	if cfg.stripe.webhook_secret.as_deref().map(|secret| secret.trim().is_empty()).unwrap_or(false)
	{
		cfg.stripe.webhook_secret = None;
	}

	while cfg.app.public_url.ends_with('/') {
		cfg.app.public_url.pop();
	}
}
