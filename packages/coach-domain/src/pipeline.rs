use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::status::LeadStatus;

pub const DEFAULT_PROBABILITY: i32 = 25;
pub const DEFAULT_COUNTRY: &str = "France";
pub const DEFAULT_AUDIENCE_COLOR: &str = "#6366F1";
pub const FALLBACK_AUDIENCE: &str = "Général";

static HEX_COLOR: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").ok());

/// The subset of a lead the pipeline statistics look at.
#[derive(Debug, Clone)]
pub struct LeadFigures {
	pub status: Option<LeadStatus>,
	pub potential_amount: Option<f64>,
	pub probability: Option<i32>,
	pub converted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
	pub suspect: i64,
	pub prospect: i64,
	pub analyse: i64,
	pub negociation: i64,
	pub conclusion: i64,
	pub ordre: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadStats {
	pub total: i64,
	pub by_status: StatusCounts,
	pub converted: i64,
	pub total_potential: f64,
	pub weighted_potential: f64,
}

pub fn probability_in_range(probability: i32) -> bool {
	(0..=100).contains(&probability)
}

pub fn is_hex_color(color: &str) -> bool {
	HEX_COLOR.as_ref().map(|re| re.is_match(color)).unwrap_or(false)
}

pub fn lead_stats(leads: &[LeadFigures]) -> LeadStats {
	let mut stats = LeadStats { total: leads.len() as i64, ..LeadStats::default() };

	for lead in leads {
		match lead.status {
			Some(LeadStatus::Suspect) => stats.by_status.suspect += 1,
			Some(LeadStatus::Prospect) => stats.by_status.prospect += 1,
			Some(LeadStatus::Analyse) => stats.by_status.analyse += 1,
			Some(LeadStatus::Negociation) => stats.by_status.negociation += 1,
			Some(LeadStatus::Conclusion) => stats.by_status.conclusion += 1,
			Some(LeadStatus::Ordre) => stats.by_status.ordre += 1,
			None => {},
		}

		if lead.converted {
			stats.converted += 1;
		}

		let amount = lead.potential_amount.unwrap_or(0.0);
		let probability = lead.probability.unwrap_or(0) as f64;

		stats.total_potential += amount;
		stats.weighted_potential += amount * probability / 100.0;
	}

	stats
}
