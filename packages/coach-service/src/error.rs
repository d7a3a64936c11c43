pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Unauthorized: {message}")]
	Unauthorized { message: String },
	#[error("Forbidden: {message}")]
	Forbidden { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl Error {
	pub(crate) fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into() }
	}

	pub(crate) fn unauthorized(message: impl Into<String>) -> Self {
		Self::Unauthorized { message: message.into() }
	}

	pub(crate) fn not_found(message: impl Into<String>) -> Self {
		Self::NotFound { message: message.into() }
	}

	pub(crate) fn conflict(message: impl Into<String>) -> Self {
		Self::Conflict { message: message.into() }
	}

	/// The bare message, without the variant prefix `Display` adds.
	pub fn message(&self) -> &str {
		match self {
			Self::InvalidRequest { message }
			| Self::Unauthorized { message }
			| Self::Forbidden { message }
			| Self::NotFound { message }
			| Self::Conflict { message }
			| Self::Provider { message }
			| Self::Storage { message } => message,
		}
	}
}

impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<coach_storage::Error> for Error {
	fn from(err: coach_storage::Error) -> Self {
		match err {
			coach_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			coach_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			coach_storage::Error::NotFound(message) => Self::NotFound { message },
			coach_storage::Error::Conflict(message) => Self::Conflict { message },
		}
	}
}

impl From<coach_providers::Error> for Error {
	fn from(err: coach_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
