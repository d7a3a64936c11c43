use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub smtp: Smtp,
	#[serde(default)]
	pub stripe: Stripe,
	pub security: Security,
	pub app: App,
	#[serde(default)]
	pub campaigns: Campaigns,
	#[serde(default)]
	pub signatures: Signatures,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Smtp {
	pub host: String,
	#[serde(default = "default_smtp_port")]
	pub port: u16,
	pub user: String,
	#[serde(default)]
	pub password: Option<String>,
	/// Mailbox used in the `From` header, e.g. `"Coach Digital <hello@coachdigital.biz>"`.
	pub from: String,
}
impl Smtp {
	/// Implicit TLS is only used on the submission port 465; every other port upgrades with
	/// STARTTLS.
	pub fn secure(&self) -> bool {
		self.port == 465
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Stripe {
	#[serde(default)]
	pub webhook_secret: Option<String>,
	#[serde(default = "default_stripe_tolerance_seconds")]
	pub tolerance_seconds: i64,
}
impl Default for Stripe {
	fn default() -> Self {
		Self { webhook_secret: None, tolerance_seconds: default_stripe_tolerance_seconds() }
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	pub admin_token: String,
	pub session_secret: String,
	pub unsubscribe_secret: String,
	#[serde(default = "default_session_ttl_hours")]
	pub session_ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct App {
	#[serde(default = "default_public_url")]
	pub public_url: String,
	pub owner_email: String,
	pub owner_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Campaigns {
	#[serde(default = "default_send_delay_ms")]
	pub send_delay_ms: u64,
	#[serde(default = "default_daily_limit")]
	pub daily_limit: u32,
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	#[serde(default = "default_batch_size")]
	pub batch_size: u32,
}
impl Default for Campaigns {
	fn default() -> Self {
		Self {
			send_delay_ms: default_send_delay_ms(),
			daily_limit: default_daily_limit(),
			poll_interval_ms: default_poll_interval_ms(),
			batch_size: default_batch_size(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Signatures {
	#[serde(default = "default_signature_expiry_days")]
	pub default_expiry_days: i64,
}
impl Default for Signatures {
	fn default() -> Self {
		Self { default_expiry_days: default_signature_expiry_days() }
	}
}

fn default_smtp_port() -> u16 {
	587
}

fn default_stripe_tolerance_seconds() -> i64 {
	300
}

fn default_session_ttl_hours() -> i64 {
	24 * 7
}

fn default_public_url() -> String {
	"https://coachdigital.biz".to_string()
}

fn default_send_delay_ms() -> u64 {
	1_000
}

fn default_daily_limit() -> u32 {
	500
}

fn default_poll_interval_ms() -> u64 {
	2_000
}

fn default_batch_size() -> u32 {
	50
}

fn default_signature_expiry_days() -> i64 {
	7
}
