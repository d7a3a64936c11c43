//! Spreadsheet exports with French headers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{CoachService, Error, Result};
use coach_domain::status::{DocumentStatus, DocumentType};
use coach_storage::{
	date_serde,
	models::{Client, Document, Lead},
};

const CLIENT_HEADERS: [&str; 15] = [
	"ID",
	"Prénom",
	"Nom",
	"Email",
	"Téléphone",
	"Entreprise",
	"Poste",
	"Adresse",
	"Code Postal",
	"Ville",
	"Pays",
	"Catégorie",
	"Statut",
	"Notes",
	"Créé le",
];
const LEAD_HEADERS: [&str; 12] = [
	"ID",
	"Prénom",
	"Nom",
	"Email",
	"Téléphone",
	"Entreprise",
	"Statut",
	"Montant potentiel",
	"Probabilité",
	"Source",
	"Audience",
	"Créé le",
];
const DOCUMENT_HEADERS: [&str; 8] =
	["Numéro", "Type", "Client", "Date", "Statut", "Total HT", "Total TVA", "Total TTC"];
const INVOICE_HEADERS: [&str; 9] = [
	"Numéro",
	"Client",
	"Date",
	"Échéance",
	"Statut",
	"Total HT",
	"Total TVA",
	"Total TTC",
	"Payé le",
];

/// A table ready for a spreadsheet: one header row and string cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportTable {
	pub headers: Vec<String>,
	pub rows: Vec<Vec<String>>,
}
impl ExportTable {
	fn new(headers: &[&str], rows: Vec<Vec<String>>) -> Self {
		Self { headers: headers.iter().map(|header| header.to_string()).collect(), rows }
	}

	pub fn to_csv(&self) -> Result<String> {
		let mut writer = csv::Writer::from_writer(Vec::new());

		writer.write_record(&self.headers).map_err(csv_error)?;

		for row in &self.rows {
			writer.write_record(row).map_err(csv_error)?;
		}

		let bytes = writer.into_inner().map_err(|err| Error::Storage { message: err.to_string() })?;

		String::from_utf8(bytes).map_err(|err| Error::Storage { message: err.to_string() })
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExportKind {
	Clients,
	Leads,
	Documents,
	InvoicesDetailed,
}
impl ExportKind {
	fn file_stem(self) -> &'static str {
		match self {
			Self::Clients => "clients",
			Self::Leads => "leads",
			Self::Documents => "documents",
			Self::InvoicesDetailed => "factures",
		}
	}
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CsvRequest {
	pub table: ExportKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct CsvFile {
	pub filename: String,
	pub content: String,
}

impl CoachService {
	pub async fn export_clients(&self) -> Result<ExportTable> {
		let clients = sqlx::query_as::<_, Client>("SELECT * FROM clients ORDER BY id ASC")
			.fetch_all(&self.db.pool)
			.await?;

		Ok(ExportTable::new(&CLIENT_HEADERS, clients.iter().map(client_row).collect()))
	}

	pub async fn export_leads(&self) -> Result<ExportTable> {
		let leads = sqlx::query_as::<_, Lead>("SELECT * FROM leads ORDER BY id ASC")
			.fetch_all(&self.db.pool)
			.await?;

		Ok(ExportTable::new(&LEAD_HEADERS, leads.iter().map(lead_row).collect()))
	}

	pub async fn export_documents(&self) -> Result<ExportTable> {
		let documents =
			sqlx::query_as::<_, Document>("SELECT * FROM documents ORDER BY date DESC, id DESC")
				.fetch_all(&self.db.pool)
				.await?;
		let names = self.client_names().await?;
		let rows = documents
			.iter()
			.map(|doc| {
				vec![
					doc.number.clone(),
					document_type_label(&doc.doc_type),
					client_name(&names, doc.client_id),
					date_serde::format_fr(doc.date),
					document_status_label(&doc.status),
					money(doc.total_ht),
					money(doc.total_tva),
					money(doc.total_ttc),
				]
			})
			.collect();

		Ok(ExportTable::new(&DOCUMENT_HEADERS, rows))
	}

	pub async fn export_invoices_detailed(&self) -> Result<ExportTable> {
		let invoices = sqlx::query_as::<_, Document>(
			"SELECT * FROM documents WHERE type = 'invoice' ORDER BY date DESC, id DESC",
		)
		.fetch_all(&self.db.pool)
		.await?;
		let names = self.client_names().await?;
		let rows = invoices
			.iter()
			.map(|doc| {
				vec![
					doc.number.clone(),
					client_name(&names, doc.client_id),
					date_serde::format_fr(doc.date),
					doc.due_date.map(date_serde::format_fr).unwrap_or_default(),
					document_status_label(&doc.status),
					money(doc.total_ht),
					money(doc.total_tva),
					money(doc.total_ttc),
					doc.paid_at.map(timestamp_fr).unwrap_or_default(),
				]
			})
			.collect();

		Ok(ExportTable::new(&INVOICE_HEADERS, rows))
	}

	pub async fn export_csv(&self, req: CsvRequest) -> Result<CsvFile> {
		let table = match req.table {
			ExportKind::Clients => self.export_clients().await?,
			ExportKind::Leads => self.export_leads().await?,
			ExportKind::Documents => self.export_documents().await?,
			ExportKind::InvoicesDetailed => self.export_invoices_detailed().await?,
		};
		let today = date_serde::format(OffsetDateTime::now_utc().date());

		Ok(CsvFile {
			filename: format!("{}_{today}.csv", req.table.file_stem()),
			content: table.to_csv()?,
		})
	}

	async fn client_names(&self) -> Result<HashMap<i64, String>> {
		let rows: Vec<(i64, String, String)> =
			sqlx::query_as("SELECT id, first_name, last_name FROM clients")
				.fetch_all(&self.db.pool)
				.await?;

		Ok(rows
			.into_iter()
			.map(|(id, first, last)| (id, format!("{first} {last}").trim().to_string()))
			.collect())
	}
}

fn client_row(client: &Client) -> Vec<String> {
	vec![
		client.id.to_string(),
		client.first_name.clone(),
		client.last_name.clone(),
		text(client.email.as_deref()),
		text(client.phone.as_deref()),
		text(client.company.as_deref()),
		text(client.position.as_deref()),
		text(client.address.as_deref()),
		text(client.postal_code.as_deref()),
		text(client.city.as_deref()),
		text(client.country.as_deref()),
		client.category.clone(),
		client.status.clone(),
		text(client.notes.as_deref()),
		timestamp_fr(client.created_at),
	]
}

fn lead_row(lead: &Lead) -> Vec<String> {
	vec![
		lead.id.to_string(),
		lead.first_name.clone(),
		lead.last_name.clone(),
		text(lead.email.as_deref()),
		text(lead.phone.as_deref()),
		text(lead.company.as_deref()),
		lead.status.clone(),
		lead.potential_amount.map(money).unwrap_or_default(),
		lead.probability.to_string(),
		text(lead.source.as_deref()),
		text(lead.audience.as_deref()),
		timestamp_fr(lead.created_at),
	]
}

/// Free text on one line.
fn text(value: Option<&str>) -> String {
	value.unwrap_or_default().replace(['\r', '\n'], " ")
}

fn money(value: f64) -> String {
	format!("{value:.2}")
}

fn timestamp_fr(value: OffsetDateTime) -> String {
	date_serde::format_fr(value.date())
}

fn client_name(names: &HashMap<i64, String>, client_id: i64) -> String {
	names
		.get(&client_id)
		.filter(|name| !name.is_empty())
		.cloned()
		.unwrap_or_else(|| format!("Client #{client_id}"))
}

fn document_type_label(raw: &str) -> String {
	DocumentType::parse(raw).map(DocumentType::label).unwrap_or(raw).to_string()
}

fn document_status_label(raw: &str) -> String {
	DocumentStatus::parse(raw).map(DocumentStatus::label).unwrap_or(raw).to_string()
}

fn csv_error(err: csv::Error) -> Error {
	Error::Storage { message: err.to_string() }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn free_text_is_flattened_to_one_line() {
		assert_eq!(text(Some("Rappeler\r\nlundi")), "Rappeler  lundi");
		assert_eq!(text(None), "");
	}

	#[test]
	fn missing_clients_get_a_placeholder_name() {
		let names = HashMap::from([(1, "Léa Martin".to_string())]);

		assert_eq!(client_name(&names, 1), "Léa Martin");
		assert_eq!(client_name(&names, 9), "Client #9");
	}

	#[test]
	fn csv_quotes_cells_with_separators() {
		let table = ExportTable::new(
			&["Numéro", "Client"],
			vec![vec!["FACT-2026-001".to_string(), "Martin, Léa".to_string()]],
		);

		assert_eq!(
			table.to_csv().expect("CSV must render."),
			"Numéro,Client\nFACT-2026-001,\"Martin, Léa\"\n"
		);
	}

	#[test]
	fn labels_are_french() {
		assert_eq!(document_type_label("credit_note"), "Avoir");
		assert_eq!(document_status_label("paid"), "Payée");
	}
}
