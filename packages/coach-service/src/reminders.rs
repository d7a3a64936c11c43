use serde::Serialize;
use time::OffsetDateTime;

use crate::{CoachService, Result};
use coach_domain::{
	reminders,
	status::{DocumentStatus, DocumentType, LeadStatus, TaskStatus},
};
use coach_storage::models::{CalendarEvent, Document, Lead, Task};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderItem {
	pub id: i64,
	#[serde(rename = "type")]
	pub kind: &'static str,
	pub title: String,
	pub subtitle: String,
	#[serde(with = "coach_storage::time_serde::option")]
	pub due_date: Option<OffsetDateTime>,
	pub status: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub priority: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub event_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
	pub overdue_leads: Vec<ReminderItem>,
	pub overdue_tasks: Vec<ReminderItem>,
	pub unpaid_invoices: Vec<ReminderItem>,
	pub upcoming_events: Vec<ReminderItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderCounts {
	pub overdue_leads: usize,
	pub overdue_tasks: usize,
	pub unpaid_invoices: usize,
	pub today_events: usize,
	pub total: usize,
}

impl CoachService {
	pub async fn reminders_get_all(&self) -> Result<Reminders> {
		let now = OffsetDateTime::now_utc();
		let upcoming = reminders::upcoming_window(now);

		Ok(Reminders {
			overdue_leads: self.overdue_leads(now).await?.iter().map(lead_item).collect(),
			overdue_tasks: self.overdue_tasks(now).await?.iter().map(task_item).collect(),
			unpaid_invoices: self.unpaid_invoices(now).await?.iter().map(invoice_item).collect(),
			upcoming_events: self.events_in(upcoming).await?.iter().map(event_item).collect(),
		})
	}

	pub async fn reminders_get_counts(&self) -> Result<ReminderCounts> {
		let now = OffsetDateTime::now_utc();
		let overdue_leads = self.overdue_leads(now).await?.len();
		let overdue_tasks = self.overdue_tasks(now).await?.len();
		let unpaid_invoices = self.unpaid_invoices(now).await?.len();
		let today_events = self.events_in(reminders::today_window(now)).await?.len();

		Ok(ReminderCounts {
			overdue_leads,
			overdue_tasks,
			unpaid_invoices,
			today_events,
			total: overdue_leads + overdue_tasks + unpaid_invoices,
		})
	}

	async fn overdue_leads(&self, now: OffsetDateTime) -> Result<Vec<Lead>> {
		let leads = sqlx::query_as::<_, Lead>(
			"SELECT * FROM leads WHERE next_follow_up_date < $1 ORDER BY next_follow_up_date ASC",
		)
		.bind(now)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(leads
			.into_iter()
			.filter(|lead| {
				reminders::lead_is_overdue(lead.next_follow_up_date, LeadStatus::parse(&lead.status), now)
			})
			.collect())
	}

	async fn overdue_tasks(&self, now: OffsetDateTime) -> Result<Vec<Task>> {
		let tasks = sqlx::query_as::<_, Task>(
			"SELECT * FROM tasks WHERE due_date IS NOT NULL ORDER BY due_date ASC, id ASC",
		)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(tasks
			.into_iter()
			.filter(|task| reminders::task_is_overdue(task.due_date, TaskStatus::parse(&task.status), now))
			.collect())
	}

	async fn unpaid_invoices(&self, now: OffsetDateTime) -> Result<Vec<Document>> {
		let documents = sqlx::query_as::<_, Document>(
			"\
SELECT *
FROM documents
WHERE type = 'invoice' AND status = 'sent' AND due_date IS NOT NULL
ORDER BY due_date ASC, id ASC",
		)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(documents
			.into_iter()
			.filter(|doc| {
				reminders::invoice_is_overdue(
					DocumentType::parse(&doc.doc_type),
					DocumentStatus::parse(&doc.status),
					doc.due_date,
					now,
				)
			})
			.collect())
	}

	async fn events_in(&self, window: (OffsetDateTime, OffsetDateTime)) -> Result<Vec<CalendarEvent>> {
		let events = sqlx::query_as::<_, CalendarEvent>(
			"\
SELECT *
FROM calendar_events
WHERE start_date >= $1 AND start_date < $2
ORDER BY start_date ASC, id ASC",
		)
		.bind(window.0)
		.bind(window.1)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(events.into_iter().filter(|event| reminders::in_window(event.start_date, window)).collect())
	}
}

fn lead_item(lead: &Lead) -> ReminderItem {
	let subtitle = crate::non_blank(lead.company.as_deref())
		.or_else(|| crate::non_blank(lead.email.as_deref()))
		.unwrap_or_default()
		.to_string();

	ReminderItem {
		id: lead.id,
		kind: "lead",
		title: format!("{} {}", lead.first_name, lead.last_name).trim().to_string(),
		subtitle,
		due_date: lead.next_follow_up_date,
		status: lead.status.clone(),
		priority: None,
		event_type: None,
	}
}

fn task_item(task: &Task) -> ReminderItem {
	ReminderItem {
		id: task.id,
		kind: "task",
		title: task.title.clone(),
		subtitle: task.description.clone().unwrap_or_default(),
		due_date: task.due_date.map(reminders::date_start),
		status: task.status.clone(),
		priority: Some(task.priority.clone()),
		event_type: None,
	}
}

fn invoice_item(doc: &Document) -> ReminderItem {
	ReminderItem {
		id: doc.id,
		kind: "invoice",
		title: format!("Facture {}", doc.number),
		subtitle: format!("{:.2} €", doc.total_ttc),
		due_date: doc.due_date.map(reminders::date_start),
		status: doc.status.clone(),
		priority: None,
		event_type: None,
	}
}

fn event_item(event: &CalendarEvent) -> ReminderItem {
	ReminderItem {
		id: event.id,
		kind: "event",
		title: event.title.clone(),
		subtitle: event.location.clone().unwrap_or_default(),
		due_date: Some(event.start_date),
		status: "upcoming".to_string(),
		priority: None,
		event_type: Some(event.event_type.clone()),
	}
}
