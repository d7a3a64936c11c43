//! Adapters for everything that leaves the process or needs a secret: SMTP delivery, Stripe
//! webhook signatures, signed tokens, password hashes and PDF rendering.

pub mod mailer;
pub mod pdf;
pub mod stripe;
pub mod tokens;

mod error;

pub use error::{Error, Result};
