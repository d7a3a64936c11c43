/// Full schema with every `\ir` include inlined, in apply order.
pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_counters.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_counters.sql")),
				"tables/002_company.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_company.sql")),
				"tables/003_clients.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_clients.sql")),
				"tables/004_projects.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_projects.sql")),
				"tables/005_tasks.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_tasks.sql")),
				"tables/006_documents.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_documents.sql")),
				"tables/007_document_lines.sql" =>
					out.push_str(include_str!("../../../sql/tables/007_document_lines.sql")),
				"tables/008_document_signatures.sql" =>
					out.push_str(include_str!("../../../sql/tables/008_document_signatures.sql")),
				"tables/009_document_tracking.sql" =>
					out.push_str(include_str!("../../../sql/tables/009_document_tracking.sql")),
				"tables/010_document_views.sql" =>
					out.push_str(include_str!("../../../sql/tables/010_document_views.sql")),
				"tables/011_time_entries.sql" =>
					out.push_str(include_str!("../../../sql/tables/011_time_entries.sql")),
				"tables/012_leads.sql" =>
					out.push_str(include_str!("../../../sql/tables/012_leads.sql")),
				"tables/013_email_templates.sql" =>
					out.push_str(include_str!("../../../sql/tables/013_email_templates.sql")),
				"tables/014_email_campaigns.sql" =>
					out.push_str(include_str!("../../../sql/tables/014_email_campaigns.sql")),
				"tables/015_email_queue.sql" =>
					out.push_str(include_str!("../../../sql/tables/015_email_queue.sql")),
				"tables/016_email_tracking.sql" =>
					out.push_str(include_str!("../../../sql/tables/016_email_tracking.sql")),
				"tables/017_email_blacklist.sql" =>
					out.push_str(include_str!("../../../sql/tables/017_email_blacklist.sql")),
				"tables/018_lead_emails.sql" =>
					out.push_str(include_str!("../../../sql/tables/018_lead_emails.sql")),
				"tables/019_audiences.sql" =>
					out.push_str(include_str!("../../../sql/tables/019_audiences.sql")),
				"tables/020_reviews.sql" =>
					out.push_str(include_str!("../../../sql/tables/020_reviews.sql")),
				"tables/021_client_requests.sql" =>
					out.push_str(include_str!("../../../sql/tables/021_client_requests.sql")),
				"tables/022_notes.sql" =>
					out.push_str(include_str!("../../../sql/tables/022_notes.sql")),
				"tables/023_calendar_events.sql" =>
					out.push_str(include_str!("../../../sql/tables/023_calendar_events.sql")),
				"tables/024_messages.sql" =>
					out.push_str(include_str!("../../../sql/tables/024_messages.sql")),
				"tables/025_notifications.sql" =>
					out.push_str(include_str!("../../../sql/tables/025_notifications.sql")),
				"tables/026_blog_posts.sql" =>
					out.push_str(include_str!("../../../sql/tables/026_blog_posts.sql")),
				"tables/027_client_users.sql" =>
					out.push_str(include_str!("../../../sql/tables/027_client_users.sql")),
				"tables/028_project_notes.sql" =>
					out.push_str(include_str!("../../../sql/tables/028_project_notes.sql")),
				"tables/029_project_variables.sql" =>
					out.push_str(include_str!("../../../sql/tables/029_project_variables.sql")),
				"tables/030_document_templates.sql" =>
					out.push_str(include_str!("../../../sql/tables/030_document_templates.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_include_is_inlined() {
		let schema = render_schema();

		assert!(!schema.contains("\\ir "));
		assert!(schema.contains("CREATE TABLE IF NOT EXISTS counters"));
		assert!(schema.contains("CREATE TABLE IF NOT EXISTS client_users"));
		assert!(schema.contains("CREATE TABLE IF NOT EXISTS document_templates"));
	}

	#[test]
	fn statements_split_cleanly() {
		let schema = render_schema();
		let statements =
			schema.split(';').map(str::trim).filter(|s| !s.is_empty()).collect::<Vec<_>>();

		assert!(statements.iter().all(|s| s.starts_with("CREATE")));
	}
}
