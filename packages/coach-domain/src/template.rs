/// Recipient fields available to `{{...}}` placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct Recipient<'a> {
	pub first_name: &'a str,
	pub last_name: &'a str,
	pub company: Option<&'a str>,
}

/// Fills placeholders verbatim. Use for subjects and other plain text.
pub fn render(text: &str, recipient: Recipient<'_>) -> String {
	text.replace("{{firstName}}", recipient.first_name)
		.replace("{{lastName}}", recipient.last_name)
		.replace("{{company}}", recipient.company.unwrap_or(""))
}

/// Fills placeholders of an HTML body with escaped values.
pub fn render_html(html: &str, recipient: Recipient<'_>) -> String {
	html.replace("{{firstName}}", &escape_html(recipient.first_name))
		.replace("{{lastName}}", &escape_html(recipient.last_name))
		.replace("{{company}}", &escape_html(recipient.company.unwrap_or("")))
}

pub fn escape_html(text: &str) -> String {
	let mut escaped = String::with_capacity(text.len());

	for ch in text.chars() {
		match ch {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&#39;"),
			_ => escaped.push(ch),
		}
	}

	escaped
}

/// Wraps a plain-text body so line breaks survive HTML mail clients.
pub fn html_body(body: &str) -> String {
	format!(r#"<div style="font-family: Arial, sans-serif; white-space: pre-wrap;">{body}</div>"#)
}

pub fn tracking_pixel(public_url: &str, tracking_id: &str) -> String {
	format!(
		r#"<img src="{public_url}/api/track/open/{tracking_id}" width="1" height="1" alt="" style="display:none" />"#
	)
}

pub fn unsubscribe_footer(unsubscribe_url: &str) -> String {
	format!(
		r#"<p style="font-size: 11px; color: #888888; margin-top: 24px;">Vous ne souhaitez plus recevoir nos emails ? <a href="{unsubscribe_url}">Se désinscrire</a></p>"#
	)
}

/// Campaign body as delivered: the queued HTML, then the open pixel, then the unsubscribe footer.
pub fn campaign_html(body: &str, public_url: &str, tracking_id: &str, unsubscribe_url: &str) -> String {
	format!("{body}{}{}", tracking_pixel(public_url, tracking_id), unsubscribe_footer(unsubscribe_url))
}
