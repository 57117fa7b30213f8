//! Small cross-cutting helpers that do not belong to any one pipeline
//! stage or action driver.

pub mod confirm;
pub mod human_time;

pub use confirm::confirm;
pub use human_time::{human_time, seconds_to_hms};
