use sqlx::{PgConnection, PgExecutor};
use time::OffsetDateTime;

use crate::{
	Result,
	models::{Document, DocumentLine},
};

/// Highest numeric suffix already issued under `prefix`, or 0. Holds a transaction-scoped
/// advisory lock on the prefix so two concurrent creations cannot observe the same value.
pub async fn last_number_with_prefix(conn: &mut PgConnection, prefix: &str) -> Result<i64> {
	sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
		.bind(prefix)
		.execute(&mut *conn)
		.await?;

	let last: i64 = sqlx::query_scalar(
		"\
SELECT COALESCE(max(substring(number FROM char_length($1) + 1)::bigint), 0)
FROM documents
WHERE starts_with(number, $1) AND substring(number FROM char_length($1) + 1) ~ '^[0-9]+$'",
	)
	.bind(prefix)
	.fetch_one(&mut *conn)
	.await?;

	Ok(last)
}

pub async fn insert_document(conn: &mut PgConnection, doc: &Document) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO documents (
	id,
	client_id,
	project_id,
	type,
	number,
	status,
	date,
	due_date,
	validity_date,
	subject,
	introduction,
	conclusion,
	notes,
	total_ht,
	total_tva,
	total_ttc,
	discount_amount,
	payment_terms,
	payment_method,
	is_acompte_required,
	acompte_percentage,
	acompte_amount,
	pdf_url,
	stripe_payment_intent_id,
	stripe_checkout_session_id,
	paid_at,
	created_at,
	updated_at
)
VALUES (
	$1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
	$15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28
)",
	)
	.bind(doc.id)
	.bind(doc.client_id)
	.bind(doc.project_id)
	.bind(doc.doc_type.as_str())
	.bind(doc.number.as_str())
	.bind(doc.status.as_str())
	.bind(doc.date)
	.bind(doc.due_date)
	.bind(doc.validity_date)
	.bind(doc.subject.as_deref())
	.bind(doc.introduction.as_deref())
	.bind(doc.conclusion.as_deref())
	.bind(doc.notes.as_deref())
	.bind(doc.total_ht)
	.bind(doc.total_tva)
	.bind(doc.total_ttc)
	.bind(doc.discount_amount)
	.bind(doc.payment_terms.as_deref())
	.bind(doc.payment_method.as_deref())
	.bind(doc.is_acompte_required)
	.bind(doc.acompte_percentage)
	.bind(doc.acompte_amount)
	.bind(doc.pdf_url.as_deref())
	.bind(doc.stripe_payment_intent_id.as_deref())
	.bind(doc.stripe_checkout_session_id.as_deref())
	.bind(doc.paid_at)
	.bind(doc.created_at)
	.bind(doc.updated_at)
	.execute(conn)
	.await?;

	Ok(())
}

pub async fn insert_lines(conn: &mut PgConnection, lines: &[DocumentLine]) -> Result<()> {
	for line in lines {
		sqlx::query(
			"\
INSERT INTO document_lines (
	id,
	document_id,
	description,
	quantity,
	unit,
	unit_price_ht,
	tva_rate,
	total_ht,
	total_tva,
	total_ttc,
	sort_order,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
		)
		.bind(line.id)
		.bind(line.document_id)
		.bind(line.description.as_str())
		.bind(line.quantity)
		.bind(line.unit.as_deref())
		.bind(line.unit_price_ht)
		.bind(line.tva_rate)
		.bind(line.total_ht)
		.bind(line.total_tva)
		.bind(line.total_ttc)
		.bind(line.sort_order)
		.bind(line.created_at)
		.bind(line.updated_at)
		.execute(&mut *conn)
		.await?;
	}

	Ok(())
}

pub async fn delete_lines<'e, E>(executor: E, document_id: i64) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM document_lines WHERE document_id = $1")
		.bind(document_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected())
}

pub async fn update_totals<'e, E>(
	executor: E,
	document_id: i64,
	totals: (f64, f64, f64),
	acompte_amount: Option<f64>,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let (total_ht, total_tva, total_ttc) = totals;

	sqlx::query(
		"\
UPDATE documents
SET
	total_ht = $2,
	total_tva = $3,
	total_ttc = $4,
	acompte_amount = $5,
	updated_at = $6
WHERE id = $1",
	)
	.bind(document_id)
	.bind(total_ht)
	.bind(total_tva)
	.bind(total_ttc)
	.bind(acompte_amount)
	.bind(now)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn fetch_document<'e, E>(executor: E, id: i64) -> Result<Option<Document>>
where
	E: PgExecutor<'e>,
{
	let doc = sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = $1")
		.bind(id)
		.fetch_optional(executor)
		.await?;

	Ok(doc)
}

pub async fn fetch_lines<'e, E>(executor: E, document_id: i64) -> Result<Vec<DocumentLine>>
where
	E: PgExecutor<'e>,
{
	let lines = sqlx::query_as::<_, DocumentLine>(
		"SELECT * FROM document_lines WHERE document_id = $1 ORDER BY sort_order ASC, id ASC",
	)
	.bind(document_id)
	.fetch_all(executor)
	.await?;

	Ok(lines)
}

pub async fn set_status<'e, E>(
	executor: E,
	document_id: i64,
	status: &str,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query("UPDATE documents SET status = $2, updated_at = $3 WHERE id = $1")
		.bind(document_id)
		.bind(status)
		.bind(now)
		.execute(executor)
		.await?;

	Ok(())
}
