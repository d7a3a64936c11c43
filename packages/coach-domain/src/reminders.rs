use time::{Date, Duration, OffsetDateTime, Time};

use crate::status::{DocumentStatus, DocumentType, LeadStatus, TaskStatus};

pub const UPCOMING_EVENT_HOURS: i64 = 24;
pub const DEADLINE_HORIZON_DAYS: i64 = 30;

/// A calendar date is due at its first instant (UTC).
pub fn date_start(date: Date) -> OffsetDateTime {
	date.midnight().assume_utc()
}

pub fn lead_is_overdue(
	next_follow_up: Option<OffsetDateTime>,
	status: Option<LeadStatus>,
	now: OffsetDateTime,
) -> bool {
	let Some(follow_up) = next_follow_up else {
		return false;
	};

	follow_up < now && !status.map(LeadStatus::is_closed).unwrap_or(false)
}

pub fn task_is_overdue(due: Option<Date>, status: Option<TaskStatus>, now: OffsetDateTime) -> bool {
	let Some(due) = due else {
		return false;
	};

	date_start(due) < now && status.map(TaskStatus::is_open).unwrap_or(true)
}

pub fn invoice_is_overdue(
	doc_type: Option<DocumentType>,
	status: Option<DocumentStatus>,
	due: Option<Date>,
	now: OffsetDateTime,
) -> bool {
	let Some(due) = due else {
		return false;
	};

	doc_type == Some(DocumentType::Invoice)
		&& status == Some(DocumentStatus::Sent)
		&& date_start(due) < now
}

/// Half-open window `[now, now + 24h)` used for upcoming events.
pub fn upcoming_window(now: OffsetDateTime) -> (OffsetDateTime, OffsetDateTime) {
	(now, now + Duration::hours(UPCOMING_EVENT_HOURS))
}

/// Half-open window covering the current UTC day.
pub fn today_window(now: OffsetDateTime) -> (OffsetDateTime, OffsetDateTime) {
	let start = now.replace_time(Time::MIDNIGHT);

	(start, start + Duration::hours(24))
}

pub fn in_window(at: OffsetDateTime, window: (OffsetDateTime, OffsetDateTime)) -> bool {
	at >= window.0 && at < window.1
}
