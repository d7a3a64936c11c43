use serde::{Deserialize, Serialize};

use crate::{CoachService, Result};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmtpSummary {
	pub host: String,
	pub port: u16,
	pub user: String,
	pub from: String,
	pub has_password: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmtpStatus {
	pub is_ready: bool,
	pub config: SmtpSummary,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSmtpRequest {
	pub test_email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SmtpTestResult {
	pub success: bool,
	pub message: String,
}

impl CoachService {
	/// Opens a connection to the relay. A failed check reports `isReady: false`.
	pub async fn smtp_check_status(&self) -> Result<SmtpStatus> {
		let smtp = &self.cfg.smtp;
		let is_ready = match self.providers.mailer.check(smtp).await {
			Ok(ready) => ready,
			Err(err) => {
				tracing::warn!(error = %err, host = %smtp.host, "SMTP connection test failed.");

				false
			},
		};

		Ok(SmtpStatus {
			is_ready,
			config: SmtpSummary {
				host: smtp.host.clone(),
				port: smtp.port,
				user: smtp.user.clone(),
				from: smtp.from.clone(),
				has_password: smtp.password.is_some(),
			},
		})
	}

	pub async fn smtp_test_configuration(&self, req: TestSmtpRequest) -> Result<SmtpTestResult> {
		let to = crate::require_text("testEmail", Some(req.test_email.as_str()))?;
		let html = format!(
			"<h2>Test de configuration SMTP</h2>\
<p>Cet email confirme que l'envoi depuis {} fonctionne.</p>",
			self.cfg.smtp.host
		);

		match self.send_email(to, "Test de configuration SMTP", html).await {
			Ok(()) => Ok(SmtpTestResult {
				success: true,
				message: format!("Email de test envoyé à {to}"),
			}),
			Err(err) => Ok(SmtpTestResult { success: false, message: err.message().to_string() }),
		}
	}
}
