use serde::Serialize;

use crate::{CoachService, Result};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
	pub total_clients: i64,
	pub active_projects: i64,
	pub pending_tasks: i64,
	pub total_revenue: f64,
}

impl CoachService {
	pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
		let (total_clients, active_projects, pending_tasks, total_revenue): (i64, i64, i64, f64) =
			sqlx::query_as(
				"\
SELECT
	(SELECT count(*) FROM clients),
	(SELECT count(*) FROM projects WHERE status = 'active'),
	(SELECT count(*) FROM tasks WHERE status IN ('todo', 'in_progress')),
	(SELECT COALESCE(sum(total_ttc), 0)::double precision FROM documents WHERE status = 'paid')",
			)
			.fetch_one(&self.db.pool)
			.await?;

		Ok(DashboardStats {
			total_clients,
			active_projects,
			pending_tasks,
			total_revenue: coach_domain::round2(total_revenue),
		})
	}
}
