//! Core abstractions shared across the pulsehub workspace.
//!
//! This crate contains the foundational types shared across every pulsehub
//! crate: error types (with UUID correlation and backtrace capture), the
//! `ErrorCode` → HTTP status projection, and validated value objects.

pub mod error;
pub mod error_code;
pub mod values;

pub use error::{ServiceError, ServiceErrorKind, ValidationError, ValidationErrorKind};
pub use error_code::ErrorCode;
pub use values::BoundedString;
