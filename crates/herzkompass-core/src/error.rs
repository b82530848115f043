// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for herzkompass-core.
//!
//! Provides a unified error type used across the store, the reconciler and
//! the delivery pipeline.

use std::fmt;

/// Result type using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur while processing orders and payment events.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CoreError {
    /// Order was not found in the database.
    OrderNotFound {
        /// The order ID that was not found.
        order_id: String,
    },

    /// Lead was not found in the database.
    LeadNotFound {
        /// The lead ID that was not found.
        lead_id: String,
    },

    /// Input validation failed.
    ValidationError {
        /// The field that failed validation.
        field: String,
        /// The validation error message.
        message: String,
    },

    /// A call to the payment provider failed.
    ProviderError {
        /// The provider operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },

    /// Report rendering failed.
    GenerationError {
        /// The order the report was rendered for.
        order_id: String,
        /// Error details.
        details: String,
    },

    /// Persisting a rendered report failed.
    StorageError {
        /// The storage operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },

    /// Database operation failed.
    DatabaseError {
        /// The operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },
}

impl CoreError {
    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::OrderNotFound { .. } => "ORDER_NOT_FOUND",
            Self::LeadNotFound { .. } => "LEAD_NOT_FOUND",
            Self::ValidationError { .. } => "VALIDATION_ERROR",
            Self::ProviderError { .. } => "PROVIDER_ERROR",
            Self::GenerationError { .. } => "GENERATION_ERROR",
            Self::StorageError { .. } => "STORAGE_ERROR",
            Self::DatabaseError { .. } => "DATABASE_ERROR",
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrderNotFound { order_id } => {
                write!(f, "Order '{}' not found", order_id)
            }
            Self::LeadNotFound { lead_id } => {
                write!(f, "Lead '{}' not found", lead_id)
            }
            Self::ValidationError { field, message } => {
                write!(f, "Validation error for '{}': {}", field, message)
            }
            Self::ProviderError { operation, details } => {
                write!(f, "Payment provider error during '{}': {}", operation, details)
            }
            Self::GenerationError { order_id, details } => {
                write!(f, "Failed to render report for order '{}': {}", order_id, details)
            }
            Self::StorageError { operation, details } => {
                write!(f, "Report storage error during '{}': {}", operation, details)
            }
            Self::DatabaseError { operation, details } => {
                write!(f, "Database error during '{}': {}", operation, details)
            }
        }
    }
}

impl std::error::Error for CoreError {}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::DatabaseError {
            operation: "query".to_string(),
            details: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::DatabaseError {
            operation: "json".to_string(),
            details: err.to_string(),
        }
    }
}
