use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{CoachService, Error, Result};
use coach_domain::timesheet::{self, TimeFigures};
use coach_providers::pdf::{self, InvoiceClient, InvoiceRow, TimeInvoice};
use coach_storage::{date_serde, models::TimeEntry};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeInvoiceRequest {
	#[serde(default)]
	pub client_id: Option<i64>,
	#[serde(default)]
	pub project_id: Option<i64>,
	#[serde(with = "coach_storage::date_serde")]
	pub start_date: Date,
	#[serde(with = "coach_storage::date_serde")]
	pub end_date: Date,
	#[serde(default)]
	pub hourly_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedTimeInvoice {
	pub success: bool,
	/// Base64 of the PDF bytes.
	pub pdf: String,
	pub total_hours: String,
	pub total_amount: String,
	pub entries_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeInvoicePreview {
	pub entries_count: usize,
	pub total_hours: String,
	pub average_rate: String,
	pub estimated_amount: String,
}

impl CoachService {
	pub async fn time_invoice_generate(&self, req: TimeInvoiceRequest) -> Result<GeneratedTimeInvoice> {
		let mut figures = self.billable_figures(&req).await?;

		if figures.is_empty() {
			return Err(Error::invalid("Aucune entrée facturable trouvée pour cette période"));
		}

		let rate = timesheet::invoice_rate(req.hourly_rate, &figures);
		let totals = timesheet::invoice_totals(&figures, rate);

		timesheet::sort_for_day_view(&mut figures);

		let client = match req.client_id {
			Some(id) => self.find_client(id).await?.map(|client| InvoiceClient {
				name: client.full_name(),
				email: client.email,
				company: client.company,
			}),
			None => None,
		};
		let project_name = match req.project_id {
			Some(id) => self.find_project(id).await?.map(|project| project.name),
			None => None,
		};
		let invoice = TimeInvoice {
			coach_name: self.cfg.app.owner_name.clone(),
			coach_email: self.cfg.app.owner_email.clone(),
			client,
			project_name,
			start_date: date_serde::format(req.start_date),
			end_date: date_serde::format(req.end_date),
			rows: figures.iter().map(invoice_row).collect(),
			total_hours: totals.total_hours,
			hourly_rate: totals.hourly_rate,
			amount: totals.amount,
		};
		let bytes = pdf::render_time_invoice(&invoice)?;

		tracing::info!(
			entries = figures.len(),
			total_minutes = totals.total_minutes,
			"Time invoice rendered."
		);

		Ok(GeneratedTimeInvoice {
			success: true,
			pdf: STANDARD.encode(bytes),
			total_hours: format!("{:.2}", totals.total_hours),
			total_amount: format!("{:.2}", totals.amount),
			entries_count: figures.len(),
		})
	}

	pub async fn time_invoice_preview(&self, req: TimeInvoiceRequest) -> Result<TimeInvoicePreview> {
		let figures = self.billable_figures(&req).await?;
		let average_rate = timesheet::average_rate(&figures);
		let totals = timesheet::invoice_totals(&figures, average_rate);

		Ok(TimeInvoicePreview {
			entries_count: figures.len(),
			total_hours: format!("{:.2}", totals.total_hours),
			average_rate: format!("{average_rate:.2}"),
			estimated_amount: format!("{:.2}", totals.amount),
		})
	}

	async fn billable_figures(&self, req: &TimeInvoiceRequest) -> Result<Vec<TimeFigures>> {
		let entries = sqlx::query_as::<_, TimeEntry>(
			"\
SELECT *
FROM time_entries
WHERE user_id = $1
	AND is_billable
	AND date BETWEEN $2 AND $3
	AND ($4::bigint IS NULL OR client_id = $4)
	AND ($5::bigint IS NULL OR project_id = $5)",
		)
		.bind(crate::ADMIN_USER_ID)
		.bind(req.start_date)
		.bind(req.end_date)
		.bind(req.client_id)
		.bind(req.project_id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(entries.iter().map(crate::time_entries::figures).collect())
	}
}

fn invoice_row(entry: &TimeFigures) -> InvoiceRow {
	InvoiceRow {
		date: date_serde::format(entry.date),
		period: timesheet::period_label(entry.period).to_string(),
		description: timesheet::truncate_title(&entry.title),
		duration: timesheet::format_duration(entry.duration_minutes),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use coach_domain::status::DayPeriod;
	use time::{OffsetDateTime, macros::date};

	#[test]
	fn rows_are_printed_in_french() {
		let entry = TimeFigures {
			client_id: Some(3),
			date: date!(2026 - 02 - 12),
			period: Some(DayPeriod::Afternoon),
			title: "Refonte complète du tunnel de vente".to_string(),
			duration_minutes: 135,
			hourly_rate: Some(80.0),
			is_billable: true,
			created_at: OffsetDateTime::UNIX_EPOCH,
		};
		let row = invoice_row(&entry);

		assert_eq!(row.date, "2026-02-12");
		assert_eq!(row.period, "Après-midi");
		assert_eq!(row.description, "Refonte complète du tunnel ...");
		assert_eq!(row.duration, "2h 15m");
	}
}
