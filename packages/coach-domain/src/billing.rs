use serde::{Deserialize, Serialize};

use crate::{round2, status::DocumentType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineInput {
	pub description: String,
	pub quantity: f64,
	#[serde(default)]
	pub unit: Option<String>,
	pub unit_price_ht: f64,
	#[serde(default = "default_tva_rate")]
	pub tva_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
	pub description: String,
	pub quantity: f64,
	pub unit: Option<String>,
	pub unit_price_ht: f64,
	pub tva_rate: f64,
	pub total_ht: f64,
	pub total_tva: f64,
	pub total_ttc: f64,
	pub sort_order: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTotals {
	pub total_ht: f64,
	pub total_tva: f64,
	pub total_ttc: f64,
}

pub fn default_tva_rate() -> f64 {
	20.0
}

/// Prices each line and numbers it from 1 in input order.
pub fn price_lines(lines: &[LineInput]) -> Vec<PricedLine> {
	lines
		.iter()
		.enumerate()
		.map(|(idx, line)| {
			let total_ht = line.quantity * line.unit_price_ht;
			let total_tva = total_ht * line.tva_rate / 100.0;

			PricedLine {
				description: line.description.clone(),
				quantity: line.quantity,
				unit: line.unit.clone(),
				unit_price_ht: line.unit_price_ht,
				tva_rate: line.tva_rate,
				total_ht,
				total_tva,
				total_ttc: total_ht + total_tva,
				sort_order: idx as i32 + 1,
			}
		})
		.collect()
}

pub fn document_totals(lines: &[PricedLine]) -> DocumentTotals {
	let (ht, tva, ttc) = lines.iter().fold((0.0, 0.0, 0.0), |(ht, tva, ttc), line| {
		(ht + line.total_ht, tva + line.total_tva, ttc + line.total_ttc)
	});

	DocumentTotals { total_ht: round2(ht), total_tva: round2(tva), total_ttc: round2(ttc) }
}

/// Deposit owed on a document, rounded to cents.
pub fn acompte_amount(total_ttc: f64, percentage: f64) -> f64 {
	round2(total_ttc * percentage / 100.0)
}

/// Prefix shared by every number issued for `doc_type` in `year`, e.g. `FACT-2026-`.
pub fn number_prefix(doc_type: DocumentType, year: i32) -> String {
	format!("{}-{year}-", doc_type.number_prefix())
}

/// Number following `last`, the highest suffix already issued under the same prefix.
pub fn document_number(doc_type: DocumentType, year: i32, last: i64) -> String {
	format!("{}{:03}", number_prefix(doc_type, year), last + 1)
}
