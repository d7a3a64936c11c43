pub mod billing;
pub mod pipeline;
pub mod reminders;
pub mod slug;
pub mod status;
pub mod template;
pub mod timesheet;

/// Rounds a money amount to cents, half away from zero.
pub fn round2(value: f64) -> f64 {
	(value * 100.0).round() / 100.0
}

/// One decimal, used for average ratings.
pub fn round1(value: f64) -> f64 {
	(value * 10.0).round() / 10.0
}
