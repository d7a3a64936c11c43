pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Address(#[from] lettre::address::AddressError),
	#[error(transparent)]
	Message(#[from] lettre::error::Error),
	#[error(transparent)]
	Smtp(#[from] lettre::transport::smtp::Error),
	#[error(transparent)]
	Pdf(#[from] lopdf::Error),
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error("{message}")]
	Signature { message: String },
	#[error("{message}")]
	Token { message: String },
	#[error("{message}")]
	Password { message: String },
}
