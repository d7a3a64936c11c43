use std::collections::BTreeMap;

use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::status::DayPeriod;

pub const MAX_TITLE_CHARS: usize = 30;
const TRUNCATED_TITLE_CHARS: usize = 27;

/// One time entry as seen by statistics and invoicing.
#[derive(Debug, Clone)]
pub struct TimeFigures {
	pub client_id: Option<i64>,
	pub date: Date,
	pub period: Option<DayPeriod>,
	pub title: String,
	pub duration_minutes: i64,
	pub hourly_rate: Option<f64>,
	pub is_billable: bool,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientTimeStats {
	pub client_id: i64,
	pub total_minutes: i64,
	pub billable_minutes: i64,
	pub non_billable_minutes: i64,
	pub entries: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvoiceTotals {
	pub total_minutes: i64,
	pub total_hours: f64,
	pub hourly_rate: f64,
	pub amount: f64,
}

/// Groups entries per client; entries without a client land under id 0.
pub fn stats_by_client(entries: &[TimeFigures]) -> Vec<ClientTimeStats> {
	let mut by_client: BTreeMap<i64, ClientTimeStats> = BTreeMap::new();

	for entry in entries {
		let client_id = entry.client_id.unwrap_or(0);
		let stats = by_client
			.entry(client_id)
			.or_insert_with(|| ClientTimeStats { client_id, ..ClientTimeStats::default() });

		stats.total_minutes += entry.duration_minutes;
		stats.entries += 1;

		if entry.is_billable {
			stats.billable_minutes += entry.duration_minutes;
		} else {
			stats.non_billable_minutes += entry.duration_minutes;
		}
	}

	by_client.into_values().collect()
}

/// Orders entries by date, then period within the day, then creation time.
pub fn sort_for_day_view(entries: &mut [TimeFigures]) {
	entries.sort_by(|a, b| {
		a.date
			.cmp(&b.date)
			.then_with(|| period_rank(a.period).cmp(&period_rank(b.period)))
			.then_with(|| a.created_at.cmp(&b.created_at))
	});
}

pub fn period_rank(period: Option<DayPeriod>) -> u8 {
	period.map(DayPeriod::rank).unwrap_or(u8::MAX)
}

pub fn period_label(period: Option<DayPeriod>) -> &'static str {
	period.map(DayPeriod::label).unwrap_or("")
}

/// Rate used for an invoice: the explicit one, else the first entry's, else zero.
pub fn invoice_rate(explicit: Option<f64>, entries: &[TimeFigures]) -> f64 {
	explicit
		.or_else(|| entries.first().and_then(|entry| entry.hourly_rate))
		.unwrap_or(0.0)
}

pub fn invoice_totals(entries: &[TimeFigures], hourly_rate: f64) -> InvoiceTotals {
	let total_minutes = entries.iter().map(|entry| entry.duration_minutes).sum::<i64>();
	let total_hours = total_minutes as f64 / 60.0;

	InvoiceTotals { total_minutes, total_hours, hourly_rate, amount: total_hours * hourly_rate }
}

/// Mean of the strictly positive rates, zero when none is set.
pub fn average_rate(entries: &[TimeFigures]) -> f64 {
	let rates = entries
		.iter()
		.filter_map(|entry| entry.hourly_rate)
		.filter(|rate| *rate > 0.0)
		.collect::<Vec<_>>();

	if rates.is_empty() {
		return 0.0;
	}

	rates.iter().sum::<f64>() / rates.len() as f64
}

pub fn format_duration(minutes: i64) -> String {
	format!("{}h {}m", minutes / 60, minutes % 60)
}

pub fn truncate_title(title: &str) -> String {
	if title.chars().count() > MAX_TITLE_CHARS {
		let head = title.chars().take(TRUNCATED_TITLE_CHARS).collect::<String>();

		format!("{head}...")
	} else {
		title.to_string()
	}
}

/// Whole minutes between a timer start and stop, rounded to the nearest minute.
pub fn elapsed_minutes(start: OffsetDateTime, end: OffsetDateTime) -> i64 {
	let seconds = (end - start).as_seconds_f64();

	(seconds / 60.0).round().max(0.0) as i64
}
