//! Small helpers shared across crates.

mod datetime;

pub use datetime::{format_datetime, parse_datetime};
