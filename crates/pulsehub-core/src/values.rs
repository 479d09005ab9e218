//! Generic validated value objects with smart constructors.
//!
//! Value objects are immutable, equality-compared by value (not identity),
//! and validated at construction time. This module implements the "parse,
//! don't validate" principle: if you have a value object, it is guaranteed
//! to satisfy its invariants.

use crate::error::{ValidationError, ValidationErrorKind};
use std::fmt;
use std::marker::PhantomData;

/// A string with compile-time length bounds.
///
/// Guarantees:
/// - Non-empty (at least `MIN` non-whitespace characters)
/// - At most `MAX` characters
/// - Trimmed of leading/trailing whitespace
///
/// Uses const generics to encode length constraints in the type system.
/// This allows different string types with different bounds to share
/// implementation while remaining distinct types.
///
/// # Example
///
/// ```rust,ignore
/// // Define a custom bounded string type
/// type ShortName = BoundedString<1, 50>;
///
/// let name = ShortName::new("  Alice  ")?;
/// assert_eq!(name.as_str(), "Alice"); // Trimmed
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BoundedString<const MIN: usize, const MAX: usize> {
    value: String,
    /// PhantomData to use the const generics in the type signature
    _marker: PhantomData<()>,
}

impl<const MIN: usize, const MAX: usize> BoundedString<MIN, MAX> {
    /// Create a new BoundedString, validating and normalizing the input.
    ///
    /// The input is trimmed before validation. The character count
    /// (not byte count) is used for length checks.
    ///
    /// # Errors
    ///
    /// - [`ValidationError`] with `TooShort` if trimmed length < MIN
    /// - [`ValidationError`] with `TooLong` if trimmed length > MAX
    pub fn new(value: impl Into<String>, field_name: &str) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        let char_count = trimmed.chars().count();

        if char_count < MIN {
            return Err(ValidationError::new(ValidationErrorKind::TooShort {
                field: field_name.to_string(),
                min_length: MIN,
                actual_length: char_count,
            }));
        }

        if char_count > MAX {
            return Err(ValidationError::new(ValidationErrorKind::TooLong {
                field: field_name.to_string(),
                max_length: MAX,
                actual_length: char_count,
            }));
        }

        Ok(Self {
            value: trimmed.to_string(),
            _marker: PhantomData,
        })
    }

    /// Get the string as a slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Consume self and return the inner String.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.value
    }

    /// Get the minimum allowed length.
    #[must_use]
    pub const fn min_length() -> usize {
        MIN
    }

    /// Get the maximum allowed length.
    #[must_use]
    pub const fn max_length() -> usize {
        MAX
    }
}

impl<const MIN: usize, const MAX: usize> fmt::Debug for BoundedString<MIN, MAX> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedString")
            .field("value", &self.value)
            .field("min", &MIN)
            .field("max", &MAX)
            .finish()
    }
}

impl<const MIN: usize, const MAX: usize> fmt::Display for BoundedString<MIN, MAX> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<const MIN: usize, const MAX: usize> AsRef<str> for BoundedString<MIN, MAX> {
    fn as_ref(&self) -> &str {
        &self.value
    }
}
