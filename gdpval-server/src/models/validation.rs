//! Validation error types

use std::fmt;

/// Validation error for task payloads and query parameters
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// Numeric field is below zero
    Negative { field: &'static str },

    /// Value doesn't match required format
    InvalidFormat { field: &'static str, reason: &'static str },

    /// Invalid enum variant
    InvalidVariant { field: &'static str, value: String },

    /// Error inside one element of a submitted sequence
    Item {
        list: &'static str,
        index: usize,
        error: Box<ValidationError>,
    },

    /// Body or query string could not be decoded at all
    Malformed { reason: String },
}

impl ValidationError {
    pub(crate) fn in_item(list: &'static str, index: usize, error: ValidationError) -> Self {
        Self::Item {
            list,
            index,
            error: Box::new(error),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::Negative { field } => write!(f, "{} cannot be negative", field),
            Self::InvalidFormat { field, reason } => {
                write!(f, "{}: {}", field, reason)
            }
            Self::InvalidVariant { field, value } => {
                write!(f, "invalid {} value: '{}'", field, value)
            }
            Self::Item { list, index, error } => write!(f, "{}[{}]: {}", list, index, error),
            Self::Malformed { reason } => write!(f, "malformed request: {}", reason),
        }
    }
}

impl std::error::Error for ValidationError {}
