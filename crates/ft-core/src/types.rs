//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A duration that must be strictly positive was zero or negative.
    #[error("{field} must be positive, got {value} ms")]
    NonPositiveDuration { field: &'static str, value: i64 },

    /// A duration that must not be negative was negative.
    #[error("{field} cannot be negative, got {value} ms")]
    NegativeDuration { field: &'static str, value: i64 },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Generates a fresh random ID.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated activity identifier.
    ///
    /// Assigned once at creation and never reused, even after the activity is
    /// removed, so orphaned sessions keep pointing at a unique value.
    ActivityId, "activity ID"
);

define_string_id!(
    /// A validated session identifier, assigned when a session starts.
    SessionId, "session ID"
);

/// Validates a user-provided activity name, returning it trimmed.
pub fn validate_activity_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty {
            field: "activity name",
        });
    }
    Ok(trimmed.to_string())
}

/// Validates an optional session target in milliseconds.
pub fn validate_target(target_ms: Option<i64>) -> Result<Option<i64>, ValidationError> {
    match target_ms {
        Some(value) if value <= 0 => Err(ValidationError::NonPositiveDuration {
            field: "target duration",
            value,
        }),
        other => Ok(other),
    }
}
