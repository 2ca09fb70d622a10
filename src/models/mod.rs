//! Data models for attach requests and option values.

mod attach;
mod value;

pub use attach::{AttachInfo, AttachOptions};
pub use value::{LogicalType, Value};
