use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// URL slug for a blog title: accents dropped, lowercase ASCII alphanumerics joined by `-`.
pub fn slugify(title: &str) -> String {
	let mut slug = String::with_capacity(title.len());
	let mut pending_dash = false;

	for ch in title.to_lowercase().nfd().filter(|ch| !is_combining_mark(*ch)) {
		if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
			if pending_dash && !slug.is_empty() {
				slug.push('-');
			}

			slug.push(ch);

			pending_dash = false;
		} else {
			pending_dash = true;
		}
	}

	slug
}
