use lettre::{
	AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::header::ContentType,
	transport::smtp::authentication::Credentials,
};

use crate::Result;
use coach_config::Smtp;

/// An HTML message addressed to a single recipient.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
	pub to: String,
	pub subject: String,
	pub html: String,
}

pub async fn send(cfg: &Smtp, email: &OutgoingEmail) -> Result<()> {
	let message = Message::builder()
		.from(cfg.from.parse()?)
		.to(email.to.trim().parse()?)
		.subject(email.subject.as_str())
		.header(ContentType::TEXT_HTML)
		.body(email.html.clone())?;

	transport(cfg)?.send(message).await?;

	Ok(())
}

/// Opens a connection to the relay and reports whether it accepted the session.
pub async fn check(cfg: &Smtp) -> Result<bool> {
	Ok(transport(cfg)?.test_connection().await?)
}

fn transport(cfg: &Smtp) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
	let builder = if cfg.secure() {
		AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)?
	} else {
		AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)?
	};
	let mut builder = builder.port(cfg.port);

	if let Some(password) = cfg.password.as_ref() {
		builder = builder.credentials(Credentials::new(cfg.user.clone(), password.clone()));
	}

	Ok(builder.build())
}
