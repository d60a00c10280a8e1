//! Error taxonomy shared by the booking and session core.
//!
//! The API layer converts these into HTTP responses (see `api::error`); nothing
//! in here knows about status codes.

use std::collections::HashMap;
use thiserror::Error;

use crate::db::Booking;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{}", summarize_validation(.0))]
    Validation(HashMap<String, Vec<String>>),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Room is already booked for the requested time")]
    Conflict { conflicts: Vec<Booking> },

    #[error("Booking was changed by another request")]
    ConcurrentUpdate,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn validation_field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = HashMap::new();
        errors.insert(field.to_string(), vec![message.into()]);
        Self::Validation(errors)
    }
}

fn summarize_validation(errors: &HashMap<String, Vec<String>>) -> String {
    if errors.len() == 1 {
        errors
            .values()
            .next()
            .and_then(|v| v.first())
            .cloned()
            .unwrap_or_else(|| "Validation failed".to_string())
    } else {
        format!("Validation failed for {} fields", errors.len())
    }
}

/// Collects field errors so a request reports every problem at once
#[derive(Debug, Default)]
pub struct ValidationErrorBuilder {
    errors: HashMap<String, Vec<String>>,
}

impl ValidationErrorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    pub fn into_error(self) -> ServiceError {
        ServiceError::Validation(self.errors)
    }

    /// Return Ok(()) if no errors were collected
    pub fn finish(self) -> Result<(), ServiceError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self.errors))
        }
    }
}
