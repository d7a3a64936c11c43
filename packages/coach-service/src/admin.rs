use serde::Serialize;
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::{CoachService, Result};

pub const EXPORT_VERSION: &str = "2.0";

/// Export key and source table. Credentials columns are stripped from every row.
const EXPORTED_TABLES: [(&str, &str); 26] = [
	("clients", "clients"),
	("clientUsers", "client_users"),
	("projects", "projects"),
	("tasks", "tasks"),
	("documents", "documents"),
	("documentLines", "document_lines"),
	("company", "company"),
	("emailTemplates", "email_templates"),
	("leads", "leads"),
	("leadEmails", "lead_emails"),
	("audiences", "audiences"),
	("emailCampaigns", "email_campaigns"),
	("emailQueue", "email_queue"),
	("messages", "messages"),
	("calendarEvents", "calendar_events"),
	("notifications", "notifications"),
	("timeEntries", "time_entries"),
	("notes", "notes"),
	("reviews", "reviews"),
	("clientRequests", "client_requests"),
	("blogPosts", "blog_posts"),
	("documentSignatures", "document_signatures"),
	("documentTracking", "document_tracking"),
	("documentViews", "document_views"),
	("emailTracking", "email_tracking"),
	("emailBlacklist", "email_blacklist"),
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseExport {
	#[serde(with = "coach_storage::time_serde")]
	pub export_date: OffsetDateTime,
	pub version: &'static str,
	pub tables: Map<String, Value>,
}

impl CoachService {
	/// Dumps every table as JSON rows ordered by id.
	pub async fn admin_export_database(&self) -> Result<DatabaseExport> {
		let mut tables = Map::new();

		for (key, table) in EXPORTED_TABLES {
			// Table names come from the constant list above, never from input.
			let sql = format!(
				"\
SELECT COALESCE(
	jsonb_agg(to_jsonb(t) - 'password_hash' - 'invitation_token' ORDER BY t.id),
	'[]'::jsonb
)
FROM {table} t"
			);
			let rows: Value = sqlx::query_scalar(&sql).fetch_one(&self.db.pool).await?;

			tables.insert(key.to_string(), rows);
		}

		tracing::info!(tables = tables.len(), "Database export assembled.");

		Ok(DatabaseExport { export_date: OffsetDateTime::now_utc(), version: EXPORT_VERSION, tables })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn exported_keys_are_unique() {
		let mut keys = EXPORTED_TABLES.iter().map(|(key, _)| *key).collect::<Vec<_>>();

		keys.sort_unstable();
		keys.dedup();

		assert_eq!(keys.len(), EXPORTED_TABLES.len());
	}
}
