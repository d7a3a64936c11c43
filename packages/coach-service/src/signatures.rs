use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{
	CoachService, Error, Result, SuccessResponse, document_tracking::DocumentScopedRequest,
	documents,
};
use coach_config::MAX_SIGNATURE_EXPIRY_DAYS;
use coach_domain::{
	status::{DocumentStatus, DocumentType, NotificationType, SignatureStatus, SignerRole},
	template::escape_html,
};
use coach_providers::tokens;
use coach_storage::{
	counters,
	documents as document_rows,
	models::{Client, Document, DocumentLine, DocumentSignature},
};

const SIGNATURE_TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSignatureRequest {
	pub document_id: i64,
	pub signer_name: String,
	pub signer_email: String,
	#[serde(default)]
	pub signer_role: Option<SignerRole>,
	#[serde(default)]
	pub expires_in_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSignatureResponse {
	pub signature_id: i64,
	pub signature_token: String,
	pub signature_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSignatureRequest {
	pub document_id: i64,
	pub signer_name: String,
	pub signer_email: String,
	#[serde(default)]
	pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSignatureResponse {
	pub success: bool,
	pub signature_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
	pub token: String,
	pub signature_data: String,
	#[serde(default)]
	pub ip_address: Option<String>,
	#[serde(default)]
	pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeclineRequest {
	pub token: String,
	#[serde(default)]
	pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureScopedRequest {
	pub signature_id: i64,
}

/// A signing page: the signature with the document being signed.
#[derive(Debug, Clone, Serialize)]
pub struct SignaturePage {
	pub signature: DocumentSignature,
	pub document: Document,
	pub lines: Vec<DocumentLine>,
	pub client: Option<Client>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingSignature {
	#[serde(flatten)]
	pub signature: DocumentSignature,
	pub document: Option<Document>,
	pub client: Option<Client>,
}

impl CoachService {
	pub async fn signatures_create(
		&self,
		req: CreateSignatureRequest,
	) -> Result<CreateSignatureResponse> {
		let signer_name = crate::require_text("signerName", Some(req.signer_name.as_str()))?;
		let signer_email = crate::require_text("signerEmail", Some(req.signer_email.as_str()))?;
		let expires_in_days =
			req.expires_in_days.unwrap_or(self.cfg.signatures.default_expiry_days);
		let (signature_id, signature_token, _) = self
			.insert_signature(
				req.document_id,
				signer_name,
				signer_email,
				req.signer_role.unwrap_or(SignerRole::Client),
				expires_in_days,
			)
			.await?;
		let signature_url = self.signature_url(&signature_token);

		Ok(CreateSignatureResponse { signature_id, signature_token, signature_url })
	}

	/// Creates a client signature and emails the signer their link. Drafts become `sent`.
	pub async fn signatures_send_request(
		&self,
		req: SendSignatureRequest,
	) -> Result<SendSignatureResponse> {
		let document = document_rows::fetch_document(&self.db.pool, req.document_id)
			.await?
			.ok_or_else(|| Error::not_found("Document introuvable"))?;
		let signer_name = crate::require_text("signerName", Some(req.signer_name.as_str()))?;
		let signer_email = crate::require_text("signerEmail", Some(req.signer_email.as_str()))?;
		let (_, token, expires_at) = self
			.insert_signature(
				document.id,
				signer_name,
				signer_email,
				SignerRole::Client,
				self.cfg.signatures.default_expiry_days,
			)
			.await?;
		let signature_url = self.signature_url(&token);
		let label = documents::document_label(&document);
		let subject = format!("Signature requise - {label} {}", document.number);
		let message = crate::non_blank(req.message.as_deref())
			.map(|message| {
				format!(
					r#"<p style="background: #f5f5f5; padding: 15px; border-radius: 4px; font-style: italic;">{}</p>"#,
					escape_html(message)
				)
			})
			.unwrap_or_default();
		let html = format!(
			"<h1>{owner}</h1>\
<p>Bonjour {signer_name},</p>\
<p>Vous avez reçu un document à signer de la part de {owner}.</p>\
{message}\
<p><strong>Document :</strong> {label} {number}</p>\
<p><strong>Montant :</strong> {amount:.2} € TTC</p>\
<p><strong>Expire le :</strong> {expires}</p>\
<p><a href=\"{signature_url}\">Consulter et signer le document</a></p>",
			owner = escape_html(&self.cfg.app.owner_name),
			signer_name = escape_html(signer_name),
			number = document.number,
			amount = document.total_ttc,
			expires = coach_storage::date_serde::format_fr(expires_at.date()),
		);

		self.send_email(signer_email, subject, html).await?;

		if DocumentStatus::parse(&document.status) == Some(DocumentStatus::Draft) {
			document_rows::set_status(
				&self.db.pool,
				document.id,
				DocumentStatus::Sent.as_str(),
				OffsetDateTime::now_utc(),
			)
			.await?;
		}

		tracing::info!(document_id = document.id, "Signature request sent.");

		Ok(SendSignatureResponse { success: true, signature_url })
	}

	pub async fn signatures_get_by_document(
		&self,
		req: DocumentScopedRequest,
	) -> Result<Vec<DocumentSignature>> {
		let signatures = sqlx::query_as::<_, DocumentSignature>(
			"SELECT * FROM document_signatures WHERE document_id = $1 ORDER BY created_at DESC, id DESC",
		)
		.bind(req.document_id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(signatures)
	}

	pub async fn signatures_get_by_token(
		&self,
		req: crate::document_tracking::TokenRequest,
	) -> Result<Option<SignaturePage>> {
		let Some(signature) = self.find_signature_by_token(&req.token).await? else {
			return Ok(None);
		};
		let Some(document) =
			document_rows::fetch_document(&self.db.pool, signature.document_id).await?
		else {
			return Ok(None);
		};
		let lines = document_rows::fetch_lines(&self.db.pool, document.id).await?;
		let client = self.find_client(document.client_id).await?;

		Ok(Some(SignaturePage { signature, document, lines, client }))
	}

	/// Records a signature. A signed quote is accepted.
	pub async fn signatures_sign(&self, req: SignRequest) -> Result<SuccessResponse> {
		let now = OffsetDateTime::now_utc();
		let signature = self
			.find_signature_by_token(&req.token)
			.await?
			.ok_or_else(|| Error::not_found("Token invalide"))?;

		if SignatureStatus::parse(&signature.status) != Some(SignatureStatus::Pending) {
			return Err(Error::invalid("Document déjà signé"));
		}
		if signature.expires_at < now {
			return Err(Error::invalid("Le lien de signature a expiré"));
		}

		let signature_data = crate::require_text("signatureData", Some(req.signature_data.as_str()))?;
		let mut tx = self.db.pool.begin().await?;
		let signed = sqlx::query(
			"\
UPDATE document_signatures
SET
	status = $2,
	signature_data = $3,
	signed_at = $4,
	signed_ip = $5,
	signed_user_agent = $6,
	updated_at = $4
WHERE id = $1 AND status = $7",
		)
		.bind(signature.id)
		.bind(SignatureStatus::Signed.as_str())
		.bind(signature_data)
		.bind(now)
		.bind(crate::non_blank(req.ip_address.as_deref()))
		.bind(crate::non_blank(req.user_agent.as_deref()))
		.bind(SignatureStatus::Pending.as_str())
		.execute(&mut *tx)
		.await?;

		// Lost a race against another sign or decline.
		if signed.rows_affected() != 1 {
			return Err(Error::invalid("Document déjà signé"));
		}

		let document = document_rows::fetch_document(&mut *tx, signature.document_id).await?;

		if let Some(document) = &document
			&& DocumentType::parse(&document.doc_type) == Some(DocumentType::Quote)
		{
			document_rows::set_status(&mut *tx, document.id, DocumentStatus::Accepted.as_str(), now)
				.await?;
		}

		tx.commit().await?;

		tracing::info!(signature_id = signature.id, "Document signed.");

		if let Some(document) = document {
			let label = documents::document_label(&document);
			let subject =
				format!("{label} {} signé par {}", document.number, signature.signer_name);
			let html = format!(
				"<h2>{}</h2>\
<p><strong>Signataire :</strong> {} ({})</p>\
<p><strong>Montant :</strong> {:.2} € TTC</p>",
				escape_html(&subject),
				escape_html(&signature.signer_name),
				escape_html(&signature.signer_email),
				document.total_ttc
			);

			self.email_owner(subject.clone(), html).await;
			self.push_notification(
				"Document signé",
				&subject,
				NotificationType::Success,
				Some(&format!("/documents/{}", document.id)),
			)
			.await;
		}

		Ok(SuccessResponse::OK)
	}

	/// Records a refusal. A declined quote is rejected.
	pub async fn signatures_decline(&self, req: DeclineRequest) -> Result<SuccessResponse> {
		let now = OffsetDateTime::now_utc();
		let signature = self
			.find_signature_by_token(&req.token)
			.await?
			.ok_or_else(|| Error::not_found("Token invalide"))?;

		if SignatureStatus::parse(&signature.status) != Some(SignatureStatus::Pending) {
			return Err(Error::invalid("Action non autorisée"));
		}

		let reason = crate::non_blank(req.reason.as_deref());
		let mut tx = self.db.pool.begin().await?;
		let declined = sqlx::query(
			"\
UPDATE document_signatures
SET status = $2, declined_reason = $3, updated_at = $4
WHERE id = $1 AND status = $5",
		)
		.bind(signature.id)
		.bind(SignatureStatus::Declined.as_str())
		.bind(reason)
		.bind(now)
		.bind(SignatureStatus::Pending.as_str())
		.execute(&mut *tx)
		.await?;

		if declined.rows_affected() != 1 {
			return Err(Error::invalid("Action non autorisée"));
		}

		let document = document_rows::fetch_document(&mut *tx, signature.document_id).await?;

		if let Some(document) = &document
			&& DocumentType::parse(&document.doc_type) == Some(DocumentType::Quote)
		{
			document_rows::set_status(&mut *tx, document.id, DocumentStatus::Rejected.as_str(), now)
				.await?;
		}

		tx.commit().await?;

		tracing::info!(signature_id = signature.id, "Signature declined.");

		if let Some(document) = document {
			let label = documents::document_label(&document);
			let subject =
				format!("{label} {} refusé par {}", document.number, signature.signer_name);
			let html = format!(
				"<h2>{}</h2><p><strong>Motif :</strong> {}</p>",
				escape_html(&subject),
				escape_html(reason.unwrap_or("Non précisé"))
			);

			self.email_owner(subject.clone(), html).await;
			self.push_notification(
				"Document refusé",
				&subject,
				NotificationType::Warning,
				Some(&format!("/documents/{}", document.id)),
			)
			.await;
		}

		Ok(SuccessResponse::OK)
	}

	pub async fn signatures_send_reminder(
		&self,
		req: SignatureScopedRequest,
	) -> Result<SuccessResponse> {
		let signature = sqlx::query_as::<_, DocumentSignature>(
			"SELECT * FROM document_signatures WHERE id = $1",
		)
		.bind(req.signature_id)
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found("Signature introuvable"))?;

		if SignatureStatus::parse(&signature.status) != Some(SignatureStatus::Pending) {
			return Err(Error::invalid("Document déjà traité"));
		}

		let document = document_rows::fetch_document(&self.db.pool, signature.document_id)
			.await?
			.ok_or_else(|| Error::not_found("Document introuvable"))?;
		let label = documents::document_label(&document);
		let signature_url = self.signature_url(&signature.signature_token);
		let subject = format!("Rappel: Signature requise - {label} {}", document.number);
		let html = format!(
			"<p>Bonjour {},</p>\
<p>Le document <strong>{label} {}</strong> attend toujours votre signature.</p>\
<p><strong>Expire le :</strong> {}</p>\
<p><a href=\"{signature_url}\">Consulter et signer le document</a></p>",
			escape_html(&signature.signer_name),
			document.number,
			coach_storage::date_serde::format_fr(signature.expires_at.date()),
		);

		self.send_email(&signature.signer_email, subject, html).await?;

		let now = OffsetDateTime::now_utc();

		sqlx::query(
			"\
UPDATE document_signatures
SET reminder_sent_at = $2, reminder_count = reminder_count + 1, updated_at = $2
WHERE id = $1",
		)
		.bind(signature.id)
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		Ok(SuccessResponse::OK)
	}

	pub async fn signatures_pending(&self) -> Result<Vec<PendingSignature>> {
		let signatures = sqlx::query_as::<_, DocumentSignature>(
			"SELECT * FROM document_signatures WHERE status = 'pending' ORDER BY created_at DESC, id DESC",
		)
		.fetch_all(&self.db.pool)
		.await?;
		let mut out = Vec::with_capacity(signatures.len());

		for signature in signatures {
			let document = document_rows::fetch_document(&self.db.pool, signature.document_id).await?;
			let client = match &document {
				Some(document) => self.find_client(document.client_id).await?,
				None => None,
			};

			out.push(PendingSignature { signature, document, client });
		}

		Ok(out)
	}

	async fn insert_signature(
		&self,
		document_id: i64,
		signer_name: &str,
		signer_email: &str,
		role: SignerRole,
		expires_in_days: i64,
	) -> Result<(i64, String, OffsetDateTime)> {
		let now = OffsetDateTime::now_utc();
		let expires_at = now + Duration::days(expiry_days(expires_in_days)?);
		let token = tokens::random_hex(SIGNATURE_TOKEN_BYTES);
		let id = counters::next_id(&self.db.pool, "document_signatures").await?;

		sqlx::query(
			"\
INSERT INTO document_signatures (
	id,
	document_id,
	signature_token,
	signer_name,
	signer_email,
	signer_role,
	expires_at,
	status,
	reminder_count,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, $9)",
		)
		.bind(id)
		.bind(document_id)
		.bind(&token)
		.bind(signer_name)
		.bind(signer_email)
		.bind(role.as_str())
		.bind(expires_at)
		.bind(SignatureStatus::Pending.as_str())
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		Ok((id, token, expires_at))
	}

	async fn find_signature_by_token(&self, token: &str) -> Result<Option<DocumentSignature>> {
		let signature = sqlx::query_as::<_, DocumentSignature>(
			"SELECT * FROM document_signatures WHERE signature_token = $1",
		)
		.bind(token.trim())
		.fetch_optional(&self.db.pool)
		.await?;

		Ok(signature)
	}

	fn signature_url(&self, token: &str) -> String {
		format!("{}/sign/{token}", self.cfg.app.public_url)
	}
}

fn expiry_days(days: i64) -> Result<i64> {
	if !(1..=MAX_SIGNATURE_EXPIRY_DAYS).contains(&days) {
		return Err(Error::invalid(format!(
			"expiresInDays must be between 1 and {MAX_SIGNATURE_EXPIRY_DAYS}."
		)));
	}

	Ok(days)
}
