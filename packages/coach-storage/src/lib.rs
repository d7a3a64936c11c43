pub mod campaigns;
pub mod counters;
pub mod date_serde;
pub mod db;
pub mod documents;
pub mod models;
pub mod schema;
pub mod time_serde;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
