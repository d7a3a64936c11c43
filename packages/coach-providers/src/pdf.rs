//! Time-invoice rendering on A4 pages with the two standard Helvetica faces.

use lopdf::{
	Dictionary, Document, Object, ObjectId, Stream, StringFormat,
	content::{Content, Operation},
	dictionary,
};

use crate::Result;

pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;

const MARGIN_X: f32 = 50.0;
const TOP_Y: f32 = PAGE_HEIGHT - 50.0;
const BOTTOM_Y: f32 = 100.0;
const ROW_STEP: f32 = 15.0;
const COLUMNS: [f32; 4] = [50.0, 150.0, 250.0, 450.0];
const REGULAR: &str = "F1";
const BOLD: &str = "F2";

#[derive(Debug, Clone)]
pub struct InvoiceClient {
	pub name: String,
	pub email: Option<String>,
	pub company: Option<String>,
}

/// One table row, already formatted for print.
#[derive(Debug, Clone)]
pub struct InvoiceRow {
	pub date: String,
	pub period: String,
	pub description: String,
	pub duration: String,
}

#[derive(Debug, Clone)]
pub struct TimeInvoice {
	pub coach_name: String,
	pub coach_email: String,
	pub client: Option<InvoiceClient>,
	pub project_name: Option<String>,
	pub start_date: String,
	pub end_date: String,
	pub rows: Vec<InvoiceRow>,
	pub total_hours: f64,
	pub hourly_rate: f64,
	pub amount: f64,
}

#[derive(Default)]
struct Layout {
	pages: Vec<Vec<Operation>>,
	current: Vec<Operation>,
	y: f32,
}
impl Layout {
	fn new() -> Self {
		Self { y: TOP_Y, ..Self::default() }
	}

	fn text(&mut self, x: f32, font: &str, size: f32, text: &str) {
		self.current.push(Operation::new("BT", vec![]));
		self.current.push(Operation::new("Tf", vec![font.into(), size.into()]));
		self.current.push(Operation::new("Td", vec![x.into(), self.y.into()]));
		self.current.push(Operation::new(
			"Tj",
			vec![Object::String(win_ansi(text), StringFormat::Literal)],
		));
		self.current.push(Operation::new("ET", vec![]));
	}

	fn colored_text(&mut self, x: f32, font: &str, size: f32, rgb: [f32; 3], text: &str) {
		self.current.push(Operation::new("rg", rgb.iter().map(|c| (*c).into()).collect()));
		self.text(x, font, size, text);
		self.current.push(Operation::new("rg", vec![0.0_f32.into(), 0.0_f32.into(), 0.0_f32.into()]));
	}

	fn rule(&mut self, thickness: f32, gray: f32) {
		self.current.push(Operation::new("w", vec![thickness.into()]));
		self.current.push(Operation::new("RG", vec![gray.into(), gray.into(), gray.into()]));
		self.current.push(Operation::new("m", vec![MARGIN_X.into(), self.y.into()]));
		self.current.push(Operation::new("l", vec![(PAGE_WIDTH - MARGIN_X).into(), self.y.into()]));
		self.current.push(Operation::new("S", vec![]));
	}

	fn down(&mut self, by: f32) {
		self.y -= by;
	}

	fn ensure_room(&mut self) {
		if self.y < BOTTOM_Y {
			self.pages.push(std::mem::take(&mut self.current));
			self.y = TOP_Y;
		}
	}

	fn finish(mut self) -> Vec<Vec<Operation>> {
		self.pages.push(self.current);

		self.pages
	}
}

pub fn render_time_invoice(invoice: &TimeInvoice) -> Result<Vec<u8>> {
	let mut layout = Layout::new();

	layout.text(MARGIN_X, BOLD, 20.0, "FACTURE DE TEMPS");
	layout.down(30.0);
	layout.text(MARGIN_X, BOLD, 12.0, &invoice.coach_name);
	layout.down(15.0);
	layout.text(MARGIN_X, REGULAR, 10.0, &invoice.coach_email);
	layout.down(30.0);

	if let Some(client) = invoice.client.as_ref() {
		layout.text(MARGIN_X, BOLD, 12.0, "Client:");
		layout.down(15.0);
		layout.text(MARGIN_X, REGULAR, 10.0, &client.name);

		for line in [client.email.as_deref(), client.company.as_deref()].into_iter().flatten() {
			layout.down(15.0);
			layout.text(MARGIN_X, REGULAR, 10.0, line);
		}
	}

	layout.down(30.0);

	if let Some(project) = invoice.project_name.as_deref() {
		layout.text(MARGIN_X, BOLD, 12.0, &format!("Projet: {project}"));
		layout.down(20.0);
	}

	layout.text(
		MARGIN_X,
		REGULAR,
		10.0,
		&format!("Période: {} au {}", invoice.start_date, invoice.end_date),
	);
	layout.down(30.0);
	layout.rule(1.0, 0.0);
	layout.down(20.0);

	for (x, header) in COLUMNS.into_iter().zip(["Date", "Période", "Description", "Durée"]) {
		layout.text(x, BOLD, 10.0, header);
	}

	layout.down(ROW_STEP);
	layout.rule(0.5, 0.5);
	layout.down(ROW_STEP);

	for row in &invoice.rows {
		layout.ensure_room();

		for (x, cell) in COLUMNS.into_iter().zip([
			row.date.as_str(),
			row.period.as_str(),
			row.description.as_str(),
			row.duration.as_str(),
		]) {
			layout.text(x, REGULAR, 9.0, cell);
		}

		layout.down(ROW_STEP);
	}

	layout.ensure_room();
	layout.down(10.0);
	layout.rule(1.0, 0.0);
	layout.down(20.0);
	layout.text(MARGIN_X, BOLD, 12.0, "TOTAL");
	layout.text(COLUMNS[3], BOLD, 12.0, &format!("{:.2} heures", invoice.total_hours));
	layout.down(20.0);
	layout.text(MARGIN_X, REGULAR, 10.0, &format!("Taux horaire: {:.2} €", invoice.hourly_rate));
	layout.down(20.0);
	layout.colored_text(
		MARGIN_X,
		BOLD,
		14.0,
		[0.0, 0.4, 0.8],
		&format!("MONTANT TOTAL: {:.2} € HT", invoice.amount),
	);

	assemble(layout.finish())
}

fn assemble(pages: Vec<Vec<Operation>>) -> Result<Vec<u8>> {
	let mut doc = Document::with_version("1.5");
	let pages_id = doc.new_object_id();
	let regular_id = doc.add_object(font("Helvetica"));
	let bold_id = doc.add_object(font("Helvetica-Bold"));
	let resources_id = doc.add_object(dictionary! {
		"Font" => dictionary! {
			REGULAR => regular_id,
			BOLD => bold_id,
		},
	});
	let mut kids: Vec<ObjectId> = Vec::with_capacity(pages.len());

	for operations in pages {
		let content = Content { operations };
		let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
		let page_id = doc.add_object(dictionary! {
			"Type" => "Page",
			"Parent" => pages_id,
			"Contents" => content_id,
		});

		kids.push(page_id);
	}

	let pages_dict = dictionary! {
		"Type" => "Pages",
		"Kids" => kids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
		"Count" => Object::Integer(kids.len() as i64),
		"Resources" => resources_id,
		"MediaBox" => vec![
			Object::Integer(0),
			Object::Integer(0),
			Object::Integer(PAGE_WIDTH as i64),
			Object::Integer(PAGE_HEIGHT as i64),
		],
	};

	doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

	let catalog_id = doc.add_object(dictionary! {
		"Type" => "Catalog",
		"Pages" => pages_id,
	});

	doc.trailer.set("Root", catalog_id);
	doc.compress();

	let mut bytes = Vec::new();

	doc.save_to(&mut bytes)?;

	Ok(bytes)
}

fn font(base: &str) -> Dictionary {
	dictionary! {
		"Type" => "Font",
		"Subtype" => "Type1",
		"BaseFont" => base,
		"Encoding" => "WinAnsiEncoding",
	}
}

/// Standard fonts only cover WinAnsi; anything outside it prints as `?`.
fn win_ansi(text: &str) -> Vec<u8> {
	text.chars()
		.map(|c| match c {
			'€' => 0x80,
			c if (c as u32) < 0x80 => c as u8,
			c if (0xA0..=0xFF).contains(&(c as u32)) => c as u8,
			_ => b'?',
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn invoice(rows: usize) -> TimeInvoice {
		TimeInvoice {
			coach_name: "Coach Digital".to_string(),
			coach_email: "coach@example.com".to_string(),
			client: Some(InvoiceClient {
				name: "Léa Martin".to_string(),
				email: Some("lea@example.com".to_string()),
				company: None,
			}),
			project_name: Some("Site vitrine".to_string()),
			start_date: "2026-03-01".to_string(),
			end_date: "2026-03-31".to_string(),
			rows: (0..rows)
				.map(|i| InvoiceRow {
					date: "2026-03-02".to_string(),
					period: "Matinée".to_string(),
					description: format!("Atelier {i}"),
					duration: "1h 30m".to_string(),
				})
				.collect(),
			total_hours: rows as f64 * 1.5,
			hourly_rate: 80.0,
			amount: rows as f64 * 120.0,
		}
	}

	fn page_count(bytes: &[u8]) -> usize {
		Document::load_mem(bytes).expect("Rendered PDF must parse.").get_pages().len()
	}

	#[test]
	fn short_invoices_fit_on_one_page() {
		let bytes = render_time_invoice(&invoice(3)).expect("Failed to render invoice.");

		assert!(bytes.starts_with(b"%PDF-1.5"));
		assert_eq!(page_count(&bytes), 1);
	}

	#[test]
	fn long_tables_continue_on_new_pages() {
		let bytes = render_time_invoice(&invoice(80)).expect("Failed to render invoice.");

		assert!(page_count(&bytes) >= 2);
	}

	#[test]
	fn text_is_encoded_for_win_ansi() {
		assert_eq!(win_ansi("é€"), vec![0xE9, 0x80]);
		assert_eq!(win_ansi("→a"), vec![b'?', b'a']);
	}
}
