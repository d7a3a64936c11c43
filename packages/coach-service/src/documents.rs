use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use time::{Date, OffsetDateTime};

use crate::{CoachService, Error, IdRequest, Result, SuccessResponse, projects::ClientScopedRequest};
use coach_domain::{
	billing::{self, LineInput, PricedLine},
	status::{DocumentStatus, DocumentType, PaymentMethod},
};
use coach_storage::{
	counters, documents,
	models::{Document, DocumentLine},
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFields {
	pub client_id: Option<i64>,
	pub project_id: Option<i64>,
	#[serde(rename = "type")]
	pub doc_type: Option<DocumentType>,
	#[serde(default, with = "coach_storage::date_serde::option")]
	pub date: Option<Date>,
	#[serde(default, with = "coach_storage::date_serde::option")]
	pub due_date: Option<Date>,
	#[serde(default, with = "coach_storage::date_serde::option")]
	pub validity_date: Option<Date>,
	pub subject: Option<String>,
	pub introduction: Option<String>,
	pub conclusion: Option<String>,
	pub notes: Option<String>,
	pub discount_amount: Option<f64>,
	pub payment_terms: Option<String>,
	pub payment_method: Option<PaymentMethod>,
	pub is_acompte_required: Option<bool>,
	pub acompte_percentage: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
	#[serde(flatten)]
	pub fields: DocumentFields,
	#[serde(default)]
	pub lines: Vec<LineInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentRequest {
	pub id: i64,
	#[serde(flatten)]
	pub fields: DocumentFields,
	#[serde(default)]
	pub lines: Option<Vec<LineInput>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UpdateDocumentStatusRequest {
	pub id: i64,
	pub status: DocumentStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentWithLines {
	pub document: Document,
	pub lines: Vec<DocumentLine>,
}

impl CoachService {
	pub async fn documents_list(&self) -> Result<Vec<Document>> {
		let docs =
			sqlx::query_as::<_, Document>("SELECT * FROM documents ORDER BY date DESC, id DESC")
				.fetch_all(&self.db.pool)
				.await?;

		Ok(docs)
	}

	pub async fn documents_list_by_client(&self, req: ClientScopedRequest) -> Result<Vec<Document>> {
		let docs = sqlx::query_as::<_, Document>(
			"SELECT * FROM documents WHERE client_id = $1 ORDER BY date DESC, id DESC",
		)
		.bind(req.client_id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(docs)
	}

	pub async fn documents_get(&self, req: IdRequest) -> Result<DocumentWithLines> {
		let document = documents::fetch_document(&self.db.pool, req.id)
			.await?
			.ok_or_else(|| Error::not_found("Document not found"))?;
		let lines = documents::fetch_lines(&self.db.pool, req.id).await?;

		Ok(DocumentWithLines { document, lines })
	}

	pub async fn documents_create(&self, req: CreateDocumentRequest) -> Result<DocumentWithLines> {
		let fields = req.fields;
		let Some(client_id) = fields.client_id else {
			return Err(Error::invalid("clientId is required."));
		};
		let Some(doc_type) = fields.doc_type else {
			return Err(Error::invalid("type is required."));
		};
		let now = OffsetDateTime::now_utc();
		let date = fields.date.unwrap_or(now.date());
		let priced = billing::price_lines(&req.lines);
		let totals = billing::document_totals(&priced);
		let is_acompte_required = fields.is_acompte_required.unwrap_or(false);
		let acompte_amount = acompte_for(is_acompte_required, fields.acompte_percentage, totals.total_ttc);
		let mut tx = self.db.pool.begin().await?;
		let prefix = billing::number_prefix(doc_type, date.year());
		let last = documents::last_number_with_prefix(&mut tx, &prefix).await?;
		let id = counters::next_id(&mut *tx, "documents").await?;
		let document = Document {
			id,
			client_id,
			project_id: fields.project_id,
			doc_type: doc_type.as_str().to_string(),
			number: billing::document_number(doc_type, date.year(), last),
			status: DocumentStatus::Draft.as_str().to_string(),
			date,
			due_date: fields.due_date,
			validity_date: fields.validity_date,
			subject: fields.subject,
			introduction: fields.introduction,
			conclusion: fields.conclusion,
			notes: fields.notes,
			total_ht: totals.total_ht,
			total_tva: totals.total_tva,
			total_ttc: totals.total_ttc,
			discount_amount: fields.discount_amount.unwrap_or(0.0),
			payment_terms: fields.payment_terms,
			payment_method: fields.payment_method.map(|method| method.as_str().to_string()),
			is_acompte_required,
			acompte_percentage: fields.acompte_percentage,
			acompte_amount,
			pdf_url: None,
			stripe_payment_intent_id: None,
			stripe_checkout_session_id: None,
			paid_at: None,
			created_at: now,
			updated_at: now,
		};

		documents::insert_document(&mut tx, &document).await?;

		let lines = insert_priced_lines(&mut tx, id, &priced, now).await?;

		tx.commit().await?;

		tracing::info!(document_id = id, number = %document.number, "Document created.");

		Ok(DocumentWithLines { document, lines })
	}

	pub async fn documents_update(&self, req: UpdateDocumentRequest) -> Result<DocumentWithLines> {
		let now = OffsetDateTime::now_utc();
		let fields = req.fields;
		let mut tx = self.db.pool.begin().await?;
		let updated = sqlx::query_as::<_, Document>(
			"\
UPDATE documents
SET
	client_id = COALESCE($2, client_id),
	project_id = COALESCE($3, project_id),
	type = COALESCE($4, type),
	date = COALESCE($5, date),
	due_date = COALESCE($6, due_date),
	validity_date = COALESCE($7, validity_date),
	subject = COALESCE($8, subject),
	introduction = COALESCE($9, introduction),
	conclusion = COALESCE($10, conclusion),
	notes = COALESCE($11, notes),
	discount_amount = COALESCE($12, discount_amount),
	payment_terms = COALESCE($13, payment_terms),
	payment_method = COALESCE($14, payment_method),
	is_acompte_required = COALESCE($15, is_acompte_required),
	acompte_percentage = COALESCE($16, acompte_percentage),
	updated_at = $17
WHERE id = $1
RETURNING *",
		)
		.bind(req.id)
		.bind(fields.client_id)
		.bind(fields.project_id)
		.bind(fields.doc_type.map(DocumentType::as_str))
		.bind(fields.date)
		.bind(fields.due_date)
		.bind(fields.validity_date)
		.bind(fields.subject.as_deref())
		.bind(fields.introduction.as_deref())
		.bind(fields.conclusion.as_deref())
		.bind(fields.notes.as_deref())
		.bind(fields.discount_amount)
		.bind(fields.payment_terms.as_deref())
		.bind(fields.payment_method.map(PaymentMethod::as_str))
		.bind(fields.is_acompte_required)
		.bind(fields.acompte_percentage)
		.bind(now)
		.fetch_optional(&mut *tx)
		.await?
		.ok_or_else(|| Error::not_found("Document not found"))?;
		let totals = match req.lines.as_deref() {
			Some(inputs) => {
				let priced = billing::price_lines(inputs);

				documents::delete_lines(&mut *tx, req.id).await?;
				insert_priced_lines(&mut tx, req.id, &priced, now).await?;

				billing::document_totals(&priced)
			},
			None => billing::DocumentTotals {
				total_ht: updated.total_ht,
				total_tva: updated.total_tva,
				total_ttc: updated.total_ttc,
			},
		};
		let acompte_amount =
			acompte_for(updated.is_acompte_required, updated.acompte_percentage, totals.total_ttc);

		documents::update_totals(
			&mut *tx,
			req.id,
			(totals.total_ht, totals.total_tva, totals.total_ttc),
			acompte_amount,
			now,
		)
		.await?;

		let document = documents::fetch_document(&mut *tx, req.id)
			.await?
			.ok_or_else(|| Error::not_found("Document not found"))?;
		let lines = documents::fetch_lines(&mut *tx, req.id).await?;

		tx.commit().await?;

		Ok(DocumentWithLines { document, lines })
	}

	pub async fn documents_update_status(
		&self,
		req: UpdateDocumentStatusRequest,
	) -> Result<Document> {
		let now = OffsetDateTime::now_utc();
		let paid_at = (req.status == DocumentStatus::Paid).then_some(now);
		let document = sqlx::query_as::<_, Document>(
			"\
UPDATE documents
SET status = $2, paid_at = COALESCE($3, paid_at), updated_at = $4
WHERE id = $1
RETURNING *",
		)
		.bind(req.id)
		.bind(req.status.as_str())
		.bind(paid_at)
		.bind(now)
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found("Document not found"))?;

		Ok(document)
	}

	/// Lines, signatures, tracking rows and views go with the document.
	pub async fn documents_delete(&self, req: IdRequest) -> Result<SuccessResponse> {
		sqlx::query("DELETE FROM documents WHERE id = $1")
			.bind(req.id)
			.execute(&self.db.pool)
			.await?;

		Ok(SuccessResponse::OK)
	}
}

/// `Devis` for quotes, `Facture` for everything else, as printed in owner and signer emails.
pub(crate) fn document_label(document: &Document) -> &'static str {
	match DocumentType::parse(&document.doc_type) {
		Some(DocumentType::Quote) => DocumentType::Quote.label(),
		_ => DocumentType::Invoice.label(),
	}
}

fn acompte_for(required: bool, percentage: Option<f64>, total_ttc: f64) -> Option<f64> {
	match (required, percentage) {
		(true, Some(percentage)) => Some(billing::acompte_amount(total_ttc, percentage)),
		_ => None,
	}
}

async fn insert_priced_lines(
	conn: &mut PgConnection,
	document_id: i64,
	priced: &[PricedLine],
	now: OffsetDateTime,
) -> Result<Vec<DocumentLine>> {
	let mut lines = Vec::with_capacity(priced.len());

	for line in priced {
		let id = counters::next_id(&mut *conn, "document_lines").await?;

		lines.push(DocumentLine {
			id,
			document_id,
			description: line.description.clone(),
			quantity: line.quantity,
			unit: line.unit.clone(),
			unit_price_ht: line.unit_price_ht,
			tva_rate: line.tva_rate,
			total_ht: line.total_ht,
			total_tva: line.total_tva,
			total_ttc: line.total_ttc,
			sort_order: line.sort_order,
			created_at: now,
			updated_at: now,
		});
	}

	documents::insert_lines(conn, &lines).await?;

	Ok(lines)
}
