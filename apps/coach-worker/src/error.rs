pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0}")]
	Message(String),
	#[error(transparent)]
	Storage(#[from] coach_storage::Error),
	#[error(transparent)]
	Provider(#[from] coach_providers::Error),
	#[error(transparent)]
	Service(#[from] coach_service::Error),
}
