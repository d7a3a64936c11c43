use time::{Duration, OffsetDateTime, macros::date, macros::datetime};

use coach_domain::{
	billing::{self, LineInput},
	pipeline::{self, LeadFigures},
	reminders,
	slug::slugify,
	status::{DayPeriod, DocumentStatus, DocumentType, LeadStatus, TaskStatus},
	template::{self, Recipient},
	timesheet::{self, TimeFigures},
};

fn line(quantity: f64, unit_price_ht: f64, tva_rate: f64) -> LineInput {
	LineInput {
		description: "Coaching".to_string(),
		quantity,
		unit: None,
		unit_price_ht,
		tva_rate,
	}
}

fn entry(client_id: Option<i64>, minutes: i64, billable: bool) -> TimeFigures {
	TimeFigures {
		client_id,
		date: date!(2026 - 03 - 02),
		period: Some(DayPeriod::Morning),
		title: "Atelier".to_string(),
		duration_minutes: minutes,
		hourly_rate: None,
		is_billable: billable,
		created_at: datetime!(2026-03-02 08:00 UTC),
	}
}

#[test]
fn line_and_document_totals_follow_the_lines() {
	let priced = billing::price_lines(&[line(3.0, 80.0, 20.0), line(1.5, 20.0, 10.0)]);

	assert_eq!(priced[0].sort_order, 1);
	assert_eq!(priced[1].sort_order, 2);
	assert_eq!(priced[0].total_ht, 240.0);
	assert_eq!(priced[0].total_tva, 48.0);
	assert_eq!(priced[0].total_ttc, 288.0);

	let totals = billing::document_totals(&priced);

	assert_eq!(totals.total_ht, 270.0);
	assert_eq!(totals.total_tva, 51.0);
	assert_eq!(totals.total_ttc, 321.0);
}

#[test]
fn empty_documents_total_zero() {
	let totals = billing::document_totals(&[]);

	assert_eq!(totals.total_ht, 0.0);
	assert_eq!(totals.total_ttc, 0.0);
}

#[test]
fn document_numbers_are_prefixed_and_padded() {
	assert_eq!(billing::document_number(DocumentType::Quote, 2026, 0), "DEV-2026-001");
	assert_eq!(billing::document_number(DocumentType::Invoice, 2026, 41), "FACT-2026-042");
	assert_eq!(billing::document_number(DocumentType::CreditNote, 2025, 999), "AV-2025-1000");
	assert_eq!(billing::number_prefix(DocumentType::Invoice, 2026), "FACT-2026-");
}

#[test]
fn acompte_is_rounded_to_cents() {
	assert_eq!(billing::acompte_amount(343.0, 30.0), 102.9);
	assert_eq!(billing::acompte_amount(100.0, 33.333), 33.33);
}

#[test]
fn slugs_strip_accents_and_punctuation() {
	assert_eq!(slugify("Café & Crème : l'été 2026 !"), "cafe-creme-l-ete-2026");
	assert_eq!(slugify("  --Déjà vu--  "), "deja-vu");
	assert_eq!(slugify("!!!"), "");
}

#[test]
fn placeholders_are_substituted() {
	let recipient = Recipient { first_name: "Léa", last_name: "Martin", company: None };
	let rendered = template::render("Bonjour {{firstName}} {{lastName}} ({{company}})", recipient);

	assert_eq!(rendered, "Bonjour Léa Martin ()");
	assert!(template::html_body("a\nb").starts_with("<div style=\"font-family: Arial"));
	assert!(
		template::tracking_pixel("https://x.test", "abc")
			.contains("https://x.test/api/track/open/abc")
	);
}

#[test]
fn html_placeholders_escape_names() {
	let recipient =
		Recipient { first_name: "<b>Léa</b>", last_name: "O'Neil", company: Some("R&D \"Lab\"") };

	assert_eq!(
		template::render_html("<p>{{firstName}} {{lastName}}, {{company}}</p>", recipient),
		"<p>&lt;b&gt;Léa&lt;/b&gt; O&#39;Neil, R&amp;D &quot;Lab&quot;</p>"
	);
	assert_eq!(template::render("{{lastName}}", recipient), "O'Neil");
}

#[test]
fn campaign_html_appends_pixel_then_footer() {
	let html = template::campaign_html(
		"<p>Bonjour Ana</p>",
		"https://coachdigital.test",
		"abc123",
		"https://coachdigital.test/unsubscribe/ana%40example.test/tok",
	);
	let pixel = html
		.find("https://coachdigital.test/api/track/open/abc123")
		.expect("Pixel must be present.");
	let footer = html
		.find("https://coachdigital.test/unsubscribe/ana%40example.test/tok")
		.expect("Footer must be present.");

	assert!(html.starts_with("<p>Bonjour Ana</p>"));
	assert!(pixel < footer);
}

#[test]
fn lead_stats_weight_by_probability() {
	let leads = vec![
		LeadFigures {
			status: Some(LeadStatus::Suspect),
			potential_amount: Some(1_000.0),
			probability: Some(25),
			converted: false,
		},
		LeadFigures {
			status: Some(LeadStatus::Negociation),
			potential_amount: Some(2_000.0),
			probability: Some(50),
			converted: true,
		},
		LeadFigures { status: None, potential_amount: None, probability: None, converted: false },
	];
	let stats = pipeline::lead_stats(&leads);

	assert_eq!(stats.total, 3);
	assert_eq!(stats.by_status.suspect, 1);
	assert_eq!(stats.by_status.negociation, 1);
	assert_eq!(stats.converted, 1);
	assert_eq!(stats.total_potential, 3_000.0);
	assert_eq!(stats.weighted_potential, 1_250.0);
}

#[test]
fn audience_colors_must_be_hex() {
	assert!(pipeline::is_hex_color("#6366F1"));
	assert!(pipeline::is_hex_color("#a0b1c2"));
	assert!(!pipeline::is_hex_color("6366F1"));
	assert!(!pipeline::is_hex_color("#6366F"));
	assert!(pipeline::probability_in_range(0));
	assert!(!pipeline::probability_in_range(101));
}

#[test]
fn reminders_respect_status_and_time() {
	let now = datetime!(2026-03-10 12:00 UTC);

	assert!(reminders::lead_is_overdue(
		Some(now - Duration::hours(1)),
		Some(LeadStatus::Prospect),
		now
	));
	assert!(!reminders::lead_is_overdue(
		Some(now - Duration::hours(1)),
		Some(LeadStatus::Ordre),
		now
	));
	assert!(!reminders::lead_is_overdue(None, Some(LeadStatus::Prospect), now));
	assert!(reminders::task_is_overdue(Some(date!(2026 - 03 - 10)), Some(TaskStatus::Todo), now));
	assert!(!reminders::task_is_overdue(Some(date!(2026 - 03 - 10)), Some(TaskStatus::Done), now));
	assert!(!reminders::task_is_overdue(Some(date!(2026 - 03 - 11)), Some(TaskStatus::Todo), now));
	assert!(reminders::invoice_is_overdue(
		Some(DocumentType::Invoice),
		Some(DocumentStatus::Sent),
		Some(date!(2026 - 03 - 01)),
		now
	));
	assert!(!reminders::invoice_is_overdue(
		Some(DocumentType::Quote),
		Some(DocumentStatus::Sent),
		Some(date!(2026 - 03 - 01)),
		now
	));
}

#[test]
fn event_windows_are_half_open() {
	let now = datetime!(2026-03-10 12:00 UTC);
	let upcoming = reminders::upcoming_window(now);
	let today = reminders::today_window(now);

	assert!(reminders::in_window(now, upcoming));
	assert!(!reminders::in_window(now + Duration::hours(24), upcoming));
	assert!(reminders::in_window(datetime!(2026-03-10 00:00 UTC), today));
	assert!(!reminders::in_window(datetime!(2026-03-11 00:00 UTC), today));
}

#[test]
fn time_stats_group_by_client() {
	let stats = timesheet::stats_by_client(&[
		entry(Some(4), 90, true),
		entry(Some(4), 30, false),
		entry(None, 15, true),
	]);

	assert_eq!(stats.len(), 2);
	assert_eq!(stats[0].client_id, 0);
	assert_eq!(stats[0].total_minutes, 15);
	assert_eq!(stats[1].client_id, 4);
	assert_eq!(stats[1].billable_minutes, 90);
	assert_eq!(stats[1].non_billable_minutes, 30);
	assert_eq!(stats[1].entries, 2);
}

#[test]
fn invoice_figures_use_first_rate_and_average_positive_rates() {
	let mut first = entry(Some(1), 90, true);
	let mut second = entry(Some(1), 30, true);
	let third = entry(Some(1), 60, true);

	first.hourly_rate = Some(80.0);
	second.hourly_rate = Some(60.0);

	let entries = vec![first, second, third];
	let rate = timesheet::invoice_rate(None, &entries);
	let totals = timesheet::invoice_totals(&entries, rate);

	assert_eq!(rate, 80.0);
	assert_eq!(timesheet::invoice_rate(Some(50.0), &entries), 50.0);
	assert_eq!(totals.total_minutes, 180);
	assert_eq!(totals.total_hours, 3.0);
	assert_eq!(totals.amount, 240.0);
	assert_eq!(timesheet::average_rate(&entries), 70.0);
	assert_eq!(timesheet::average_rate(&[]), 0.0);
}

#[test]
fn day_view_orders_by_date_then_period() {
	let mut evening = entry(None, 10, true);
	let mut morning = entry(None, 10, true);
	let mut earlier_day = entry(None, 10, true);

	evening.period = Some(DayPeriod::Evening);
	evening.title = "evening".to_string();
	morning.title = "morning".to_string();
	earlier_day.date = date!(2026 - 03 - 01);
	earlier_day.period = Some(DayPeriod::Evening);
	earlier_day.title = "earlier".to_string();

	let mut entries = vec![evening, morning, earlier_day];

	timesheet::sort_for_day_view(&mut entries);

	let titles = entries.iter().map(|entry| entry.title.as_str()).collect::<Vec<_>>();

	assert_eq!(titles, vec!["earlier", "morning", "evening"]);
}

#[test]
fn durations_and_titles_are_formatted_for_print() {
	assert_eq!(timesheet::format_duration(135), "2h 15m");
	assert_eq!(timesheet::format_duration(45), "0h 45m");
	assert_eq!(timesheet::truncate_title("Courte"), "Courte");
	assert_eq!(
		timesheet::truncate_title("Une description beaucoup trop longue pour la colonne"),
		"Une description beaucoup tr..."
	);
	assert_eq!(timesheet::period_label(Some(DayPeriod::Afternoon)), "Après-midi");

	let start = OffsetDateTime::UNIX_EPOCH;

	assert_eq!(timesheet::elapsed_minutes(start, start + Duration::seconds(89)), 1);
	assert_eq!(timesheet::elapsed_minutes(start, start + Duration::seconds(91)), 2);
}

#[test]
fn status_labels_round_trip() {
	for status in LeadStatus::ALL {
		assert_eq!(LeadStatus::parse(status.as_str()), Some(*status));
	}

	assert_eq!(
		serde_json::to_value(DayPeriod::AllDay).expect("Failed to serialize period."),
		serde_json::json!("all_day")
	);
	assert_eq!(DocumentType::CreditNote.label(), "Avoir");
	assert_eq!(DocumentStatus::parse("nope"), None);
}
