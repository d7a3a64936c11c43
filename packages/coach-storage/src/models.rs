//! Row types, one per table. Enumerated columns stay `String`; `coach_domain::status` parses them.

use serde::Serialize;
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Company {
	pub id: i64,
	pub name: String,
	pub legal_name: Option<String>,
	pub siret: Option<String>,
	pub tva_number: Option<String>,
	pub address: Option<String>,
	pub postal_code: Option<String>,
	pub city: Option<String>,
	pub country: Option<String>,
	pub email: Option<String>,
	pub phone: Option<String>,
	pub website: Option<String>,
	pub bank_name: Option<String>,
	pub iban: Option<String>,
	pub bic: Option<String>,
	pub default_tva_rate: f64,
	pub default_payment_terms: i32,
	pub legal_mentions: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Client {
	pub id: i64,
	pub first_name: String,
	pub last_name: String,
	pub email: Option<String>,
	pub phone: Option<String>,
	pub company: Option<String>,
	pub position: Option<String>,
	pub address: Option<String>,
	pub postal_code: Option<String>,
	pub city: Option<String>,
	pub country: Option<String>,
	pub category: String,
	pub status: String,
	pub notes: Option<String>,
	pub avatar_url: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}
impl Client {
	pub fn full_name(&self) -> String {
		format!("{} {}", self.first_name, self.last_name).trim().to_string()
	}
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
	pub id: i64,
	pub client_id: i64,
	pub name: String,
	pub description: Option<String>,
	#[sqlx(rename = "type")]
	#[serde(rename = "type")]
	pub project_type: String,
	pub status: String,
	pub priority: String,
	#[serde(with = "crate::date_serde::option")]
	pub start_date: Option<Date>,
	#[serde(with = "crate::date_serde::option")]
	pub end_date: Option<Date>,
	pub estimated_hours: Option<f64>,
	pub budget_estimate: Option<f64>,
	pub client_budget: Option<f64>,
	pub project_cost: Option<f64>,
	pub progress_percentage: i32,
	pub notes: Option<String>,
	pub logo_url: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
	pub id: i64,
	pub project_id: Option<i64>,
	pub client_id: Option<i64>,
	pub title: String,
	pub description: Option<String>,
	pub status: String,
	pub priority: String,
	#[serde(with = "crate::date_serde::option")]
	pub due_date: Option<Date>,
	pub period: String,
	#[serde(with = "crate::time_serde::option")]
	pub completed_at: Option<OffsetDateTime>,
	pub estimated_hours: Option<f64>,
	pub is_billable: bool,
	pub hourly_rate: Option<f64>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Document {
	pub id: i64,
	pub client_id: i64,
	pub project_id: Option<i64>,
	#[sqlx(rename = "type")]
	#[serde(rename = "type")]
	pub doc_type: String,
	pub number: String,
	pub status: String,
	#[serde(with = "crate::date_serde")]
	pub date: Date,
	#[serde(with = "crate::date_serde::option")]
	pub due_date: Option<Date>,
	#[serde(with = "crate::date_serde::option")]
	pub validity_date: Option<Date>,
	pub subject: Option<String>,
	pub introduction: Option<String>,
	pub conclusion: Option<String>,
	pub notes: Option<String>,
	pub total_ht: f64,
	pub total_tva: f64,
	pub total_ttc: f64,
	pub discount_amount: f64,
	pub payment_terms: Option<String>,
	pub payment_method: Option<String>,
	pub is_acompte_required: bool,
	pub acompte_percentage: Option<f64>,
	pub acompte_amount: Option<f64>,
	pub pdf_url: Option<String>,
	pub stripe_payment_intent_id: Option<String>,
	pub stripe_checkout_session_id: Option<String>,
	#[serde(with = "crate::time_serde::option")]
	pub paid_at: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLine {
	pub id: i64,
	pub document_id: i64,
	pub description: String,
	pub quantity: f64,
	pub unit: Option<String>,
	pub unit_price_ht: f64,
	pub tva_rate: f64,
	pub total_ht: f64,
	pub total_tva: f64,
	pub total_ttc: f64,
	pub sort_order: i32,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSignature {
	pub id: i64,
	pub document_id: i64,
	pub signature_token: String,
	pub signer_name: String,
	pub signer_email: String,
	pub signer_role: String,
	#[serde(with = "crate::time_serde")]
	pub expires_at: OffsetDateTime,
	pub status: String,
	pub declined_reason: Option<String>,
	pub signature_data: Option<String>,
	#[serde(with = "crate::time_serde::option")]
	pub signed_at: Option<OffsetDateTime>,
	pub signed_ip: Option<String>,
	pub signed_user_agent: Option<String>,
	#[serde(with = "crate::time_serde::option")]
	pub reminder_sent_at: Option<OffsetDateTime>,
	pub reminder_count: i32,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTracking {
	pub id: i64,
	pub document_id: i64,
	pub tracking_token: String,
	pub view_count: i32,
	#[serde(with = "crate::time_serde::option")]
	pub first_viewed_at: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde::option")]
	pub last_viewed_at: Option<OffsetDateTime>,
	pub viewer_ip: Option<String>,
	pub viewer_user_agent: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
	pub id: i64,
	pub document_id: i64,
	pub tracking_id: Option<i64>,
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub viewed_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
	pub id: i64,
	pub user_id: i64,
	pub task_id: Option<i64>,
	pub project_id: Option<i64>,
	pub client_id: Option<i64>,
	pub title: String,
	pub description: Option<String>,
	#[serde(with = "crate::date_serde")]
	pub date: Date,
	pub period: String,
	#[sqlx(rename = "type")]
	#[serde(rename = "type")]
	pub entry_type: Option<String>,
	#[serde(with = "crate::time_serde::option")]
	pub start_time: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde::option")]
	pub end_time: Option<OffsetDateTime>,
	pub duration: Option<i64>,
	pub hourly_rate: Option<f64>,
	pub priority: Option<String>,
	pub status: String,
	pub is_billable: bool,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
	pub id: i64,
	pub first_name: String,
	pub last_name: String,
	pub email: Option<String>,
	pub phone: Option<String>,
	pub company: Option<String>,
	pub position: Option<String>,
	pub address: Option<String>,
	pub postal_code: Option<String>,
	pub city: Option<String>,
	pub country: Option<String>,
	pub status: String,
	pub potential_amount: Option<f64>,
	pub probability: i32,
	pub source: Option<String>,
	pub notes: Option<String>,
	#[serde(with = "crate::time_serde::option")]
	pub last_contact_date: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde::option")]
	pub next_follow_up_date: Option<OffsetDateTime>,
	pub score: Option<i32>,
	pub audience: Option<String>,
	pub is_activated: bool,
	pub converted_to_client_id: Option<i64>,
	#[serde(with = "crate::time_serde::option")]
	pub converted_at: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplate {
	pub id: i64,
	pub name: String,
	pub subject: String,
	pub body: String,
	pub category: String,
	pub is_active: bool,
	pub usage_count: i32,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmailCampaign {
	pub id: i64,
	pub name: String,
	pub template_id: Option<i64>,
	pub subject: String,
	pub body: String,
	pub status: String,
	pub total_recipients: i32,
	pub sent_count: i32,
	pub failed_count: i32,
	pub created_by: i64,
	#[serde(with = "crate::time_serde::option")]
	pub completed_at: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmailQueueItem {
	pub id: i64,
	pub campaign_id: i64,
	pub lead_id: i64,
	pub to_email: String,
	pub subject: String,
	pub body: String,
	pub status: String,
	pub error_message: Option<String>,
	pub attempts: i32,
	#[serde(with = "crate::time_serde")]
	pub scheduled_at: OffsetDateTime,
	#[serde(with = "crate::time_serde::option")]
	pub sent_at: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmailTracking {
	pub id: i64,
	pub email_queue_id: Option<i64>,
	pub lead_id: Option<i64>,
	pub tracking_id: String,
	pub opened: bool,
	#[serde(with = "crate::time_serde::option")]
	pub opened_at: Option<OffsetDateTime>,
	pub open_count: i32,
	pub clicked: bool,
	#[serde(with = "crate::time_serde::option")]
	pub clicked_at: Option<OffsetDateTime>,
	pub click_count: i32,
	pub user_agent: Option<String>,
	pub ip_address: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistEntry {
	pub id: i64,
	pub email: String,
	pub reason: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub unsubscribed_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LeadEmail {
	pub id: i64,
	pub lead_id: i64,
	pub template_id: Option<i64>,
	pub subject: String,
	pub body: String,
	#[serde(with = "crate::time_serde")]
	pub sent_at: OffsetDateTime,
	pub sent_by: i64,
	pub status: String,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Audience {
	pub id: i64,
	pub name: String,
	pub description: Option<String>,
	pub color: String,
	pub icon: Option<String>,
	pub is_active: bool,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
	pub id: i64,
	pub client_id: i64,
	pub project_id: Option<i64>,
	pub rating: i32,
	pub comment: Option<String>,
	pub is_public: bool,
	pub response: Option<String>,
	#[serde(with = "crate::time_serde::option")]
	pub responded_at: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClientRequest {
	pub id: i64,
	pub client_id: i64,
	pub request_type: String,
	pub title: String,
	pub description: Option<String>,
	pub budget: Option<f64>,
	#[serde(with = "crate::date_serde::option")]
	pub deadline: Option<Date>,
	pub priority: String,
	pub status: String,
	pub admin_notes: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Note {
	pub id: i64,
	pub title: String,
	pub content: Option<String>,
	pub client_id: Option<i64>,
	pub project_id: Option<i64>,
	pub task_id: Option<i64>,
	pub color: String,
	pub pinned: bool,
	pub is_client_visible: bool,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
	pub id: i64,
	pub client_id: Option<i64>,
	pub project_id: Option<i64>,
	pub title: String,
	pub description: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub start_date: OffsetDateTime,
	#[serde(with = "crate::time_serde::option")]
	pub end_date: Option<OffsetDateTime>,
	pub all_day: bool,
	#[sqlx(rename = "type")]
	#[serde(rename = "type")]
	pub event_type: String,
	pub location: Option<String>,
	pub created_by_id: i64,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
	pub id: i64,
	pub sender_id: i64,
	pub sender_type: String,
	pub recipient_id: i64,
	pub recipient_type: String,
	pub subject: Option<String>,
	pub content: String,
	pub client_id: Option<i64>,
	pub project_id: Option<i64>,
	pub attachment_url: Option<String>,
	pub attachment_name: Option<String>,
	pub is_read: bool,
	#[serde(with = "crate::time_serde::option")]
	pub read_at: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
	pub id: i64,
	pub user_id: i64,
	pub title: String,
	pub message: String,
	#[sqlx(rename = "type")]
	#[serde(rename = "type")]
	pub notification_type: String,
	pub is_read: bool,
	pub link: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
	pub id: i64,
	pub title: String,
	pub slug: String,
	pub excerpt: Option<String>,
	pub content: String,
	pub cover_image_url: Option<String>,
	pub author_name: Option<String>,
	pub status: String,
	pub tags: Vec<String>,
	pub meta_title: Option<String>,
	pub meta_description: Option<String>,
	#[serde(with = "crate::time_serde::option")]
	pub published_at: Option<OffsetDateTime>,
	pub view_count: i32,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

/// Portal account. The password hash never leaves the service layer.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClientUser {
	pub id: i64,
	pub client_id: i64,
	pub email: String,
	#[serde(skip_serializing)]
	pub password_hash: String,
	pub is_active: bool,
	#[serde(with = "crate::time_serde::option")]
	pub last_login: Option<OffsetDateTime>,
	#[serde(skip_serializing)]
	pub invitation_token: Option<String>,
	#[serde(with = "crate::time_serde::option")]
	pub invitation_sent_at: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectNote {
	pub id: i64,
	pub project_id: i64,
	pub title: String,
	pub content: String,
	pub tags: Option<String>,
	pub is_pinned: bool,
	pub created_by: i64,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectVariable {
	pub id: i64,
	pub project_id: i64,
	pub name: String,
	pub value: String,
	#[sqlx(rename = "type")]
	#[serde(rename = "type")]
	pub var_type: String,
	pub description: Option<String>,
	pub is_secret: bool,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTemplate {
	pub id: i64,
	pub user_id: i64,
	#[sqlx(rename = "type")]
	#[serde(rename = "type")]
	pub doc_type: String,
	pub name: String,
	pub logo_url: Option<String>,
	pub primary_color: Option<String>,
	pub secondary_color: Option<String>,
	pub company_name: Option<String>,
	pub company_address: Option<String>,
	pub company_phone: Option<String>,
	pub company_email: Option<String>,
	pub company_siret: Option<String>,
	pub company_tva: Option<String>,
	pub legal_mentions: Option<String>,
	pub terms_and_conditions: Option<String>,
	pub footer_text: Option<String>,
	pub is_default: bool,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}
