use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{CoachService, Error, Result, documents};
use coach_domain::{status::NotificationType, template};
use coach_providers::tokens;
use coach_storage::{
	counters,
	documents as document_rows,
	models::{Client, Document, DocumentLine, DocumentTracking, DocumentView},
};

const TRACKING_TOKEN_BYTES: usize = 32;
const RECENT_VIEWS: i64 = 20;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentScopedRequest {
	pub document_id: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentTrackingResponse {
	pub tracking_id: i64,
	pub tracking_token: String,
	pub view_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordViewRequest {
	pub token: String,
	#[serde(default)]
	pub user_agent: Option<String>,
	#[serde(default)]
	pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
	pub token: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordViewResponse {
	pub success: bool,
	pub document_id: i64,
}

/// What a recipient sees behind a tracked view link.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedDocument {
	pub document: Document,
	pub lines: Vec<DocumentLine>,
	pub client: Option<Client>,
	pub tracking: DocumentTracking,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentView {
	#[serde(flatten)]
	pub view: DocumentView,
	pub document: Option<Document>,
	pub client: Option<Client>,
}

impl CoachService {
	pub async fn document_tracking_create(
		&self,
		req: DocumentScopedRequest,
	) -> Result<CreateDocumentTrackingResponse> {
		let now = OffsetDateTime::now_utc();
		let tracking_token = tokens::random_hex(TRACKING_TOKEN_BYTES);
		let tracking_id = counters::next_id(&self.db.pool, "document_tracking").await?;

		sqlx::query(
			"\
INSERT INTO document_tracking (
	id,
	document_id,
	tracking_token,
	view_count,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, 0, $4, $4)",
		)
		.bind(tracking_id)
		.bind(req.document_id)
		.bind(&tracking_token)
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		let view_url = format!("{}/view/{tracking_token}", self.cfg.app.public_url);

		Ok(CreateDocumentTrackingResponse { tracking_id, tracking_token, view_url })
	}

	pub async fn document_tracking_get_by_document(
		&self,
		req: DocumentScopedRequest,
	) -> Result<Option<DocumentTracking>> {
		let tracking = sqlx::query_as::<_, DocumentTracking>(
			"SELECT * FROM document_tracking WHERE document_id = $1 ORDER BY id ASC LIMIT 1",
		)
		.bind(req.document_id)
		.fetch_optional(&self.db.pool)
		.await?;

		Ok(tracking)
	}

	pub async fn document_tracking_get_views(
		&self,
		req: DocumentScopedRequest,
	) -> Result<Vec<DocumentView>> {
		let views = sqlx::query_as::<_, DocumentView>(
			"SELECT * FROM document_views WHERE document_id = $1 ORDER BY viewed_at DESC, id DESC",
		)
		.bind(req.document_id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(views)
	}

	/// Counts a view of a tracked link. The first view alerts the owner by email and notification.
	pub async fn document_tracking_record_view(
		&self,
		req: RecordViewRequest,
	) -> Result<RecordViewResponse> {
		let now = OffsetDateTime::now_utc();
		let user_agent = crate::non_blank(req.user_agent.as_deref());
		let ip_address = crate::non_blank(req.ip_address.as_deref());
		let mut tx = self.db.pool.begin().await?;
		let previous = sqlx::query_as::<_, DocumentTracking>(
			"SELECT * FROM document_tracking WHERE tracking_token = $1 FOR UPDATE",
		)
		.bind(req.token.trim())
		.fetch_optional(&mut *tx)
		.await?
		.ok_or_else(|| Error::not_found("Token invalide"))?;

		sqlx::query(
			"\
UPDATE document_tracking
SET
	view_count = view_count + 1,
	first_viewed_at = COALESCE(first_viewed_at, $2),
	last_viewed_at = $2,
	viewer_ip = COALESCE($3, viewer_ip),
	viewer_user_agent = COALESCE($4, viewer_user_agent),
	updated_at = $2
WHERE id = $1",
		)
		.bind(previous.id)
		.bind(now)
		.bind(ip_address)
		.bind(user_agent)
		.execute(&mut *tx)
		.await?;

		let view_id = counters::next_id(&mut *tx, "document_views").await?;

		sqlx::query(
			"\
INSERT INTO document_views (id, document_id, tracking_id, ip_address, user_agent, viewed_at)
VALUES ($1, $2, $3, $4, $5, $6)",
		)
		.bind(view_id)
		.bind(previous.document_id)
		.bind(previous.id)
		.bind(ip_address)
		.bind(user_agent)
		.bind(now)
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;

		if previous.first_viewed_at.is_none() {
			self.alert_first_view(previous.document_id).await;
		}

		Ok(RecordViewResponse { success: true, document_id: previous.document_id })
	}

	pub async fn document_tracking_get_document_by_token(
		&self,
		req: TokenRequest,
	) -> Result<Option<TrackedDocument>> {
		let Some(tracking) = sqlx::query_as::<_, DocumentTracking>(
			"SELECT * FROM document_tracking WHERE tracking_token = $1",
		)
		.bind(req.token.trim())
		.fetch_optional(&self.db.pool)
		.await?
		else {
			return Ok(None);
		};
		let Some(document) = document_rows::fetch_document(&self.db.pool, tracking.document_id).await?
		else {
			return Ok(None);
		};
		let lines = document_rows::fetch_lines(&self.db.pool, document.id).await?;
		let client = self.find_client(document.client_id).await?;

		Ok(Some(TrackedDocument { document, lines, client, tracking }))
	}

	pub async fn document_tracking_recent_views(&self) -> Result<Vec<RecentView>> {
		let views = sqlx::query_as::<_, DocumentView>(
			"SELECT * FROM document_views ORDER BY viewed_at DESC, id DESC LIMIT $1",
		)
		.bind(RECENT_VIEWS)
		.fetch_all(&self.db.pool)
		.await?;
		let mut out = Vec::with_capacity(views.len());

		for view in views {
			let document = document_rows::fetch_document(&self.db.pool, view.document_id).await?;
			let client = match &document {
				Some(document) => self.find_client(document.client_id).await?,
				None => None,
			};

			out.push(RecentView { view, document, client });
		}

		Ok(out)
	}

	async fn alert_first_view(&self, document_id: i64) {
		let document = match document_rows::fetch_document(&self.db.pool, document_id).await {
			Ok(Some(document)) => document,
			Ok(None) => return,
			Err(err) => {
				tracing::warn!(error = %err, document_id, "Failed to load viewed document.");

				return;
			},
		};
		let client_name = self.client_display_name(document.client_id).await;
		let label = documents::document_label(&document);
		let subject = format!("{label} {} ouvert par {client_name}", document.number);
		let html = format!(
			"<h2>{}</h2>\
<p>Le document <strong>{} {}</strong> vient d'être consulté pour la première fois.</p>\
<p>Montant TTC : {:.2} €</p>",
			template::escape_html(&subject),
			label,
			document.number,
			document.total_ttc
		);

		self.email_owner(subject.clone(), html).await;
		self.push_notification(
			"Document consulté",
			&subject,
			NotificationType::Info,
			Some(&format!("/documents/{}", document.id)),
		)
		.await;
	}

	/// Full name of a client for owner alerts, `Client #{id}` when the record is gone.
	pub(crate) async fn client_display_name(&self, client_id: i64) -> String {
		match self.find_client(client_id).await {
			Ok(Some(client)) => client.full_name(),
			_ => format!("Client #{client_id}"),
		}
	}
}
