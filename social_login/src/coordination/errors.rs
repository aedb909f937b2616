//! Error types for sign-in reconciliation

use std::fmt;
use thiserror::Error;

use crate::account::AccountError;
use crate::credential::CredentialError;
use crate::storage::{ConflictField, StorageError};
use crate::utils::UtilError;

/// Attribute a validation failure is reported on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationField {
    Login,
    Email,
    Credentials,
}

impl fmt::Display for ValidationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Login => "login",
            Self::Email => "email",
            Self::Credentials => "credentials",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    Uniqueness,
}

/// User-correctable failure attached to an account or credential attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationError {
    pub field: ValidationField,
    pub kind: ValidationKind,
}

impl ValidationError {
    pub fn uniqueness(field: ValidationField) -> Self {
        Self {
            field,
            kind: ValidationKind::Uniqueness,
        }
    }

    pub fn message(&self) -> &'static str {
        match (self.field, self.kind) {
            (ValidationField::Credentials, ValidationKind::Uniqueness) => {
                "is already linked to another user"
            }
            (_, ValidationKind::Uniqueness) => "has already been taken",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message())
    }
}

impl std::error::Error for ValidationError {}

impl From<ConflictField> for ValidationError {
    fn from(field: ConflictField) -> Self {
        Self::uniqueness(match field {
            ConflictField::Login => ValidationField::Login,
            ConflictField::Email => ValidationField::Email,
            ConflictField::CredentialProvider | ConflictField::CredentialRemoteId => {
                ValidationField::Credentials
            }
        })
    }
}

/// Errors that can occur while reconciling a sign-in payload
#[derive(Error, Debug, Clone)]
pub enum ReconcileError {
    /// Uniqueness conflict the caller can surface to the user
    #[error("Validation failed: {0}")]
    Validation(ValidationError),

    /// Store failure, never swallowed
    #[error("Storage error: {0}")]
    Storage(StorageError),

    /// Error from utils operations
    #[error("Utils error: {0}")]
    Utils(UtilError),
}

impl ReconcileError {
    /// Log the error and return self
    pub fn log(self) -> Self {
        match &self {
            Self::Validation(err) => tracing::error!("Validation failed: {}", err),
            Self::Storage(err) => tracing::error!("Storage error: {}", err),
            Self::Utils(err) => tracing::error!("Utils error: {}", err),
        }
        self
    }

    /// Validation details when the failure is user-correctable
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

// Custom From implementations that automatically log errors

impl From<ValidationError> for ReconcileError {
    fn from(err: ValidationError) -> Self {
        let error = Self::Validation(err);
        tracing::error!("{}", error);
        error
    }
}

impl From<StorageError> for ReconcileError {
    fn from(err: StorageError) -> Self {
        let error = match err {
            StorageError::Conflict(field) => Self::Validation(field.into()),
            other => Self::Storage(other),
        };
        tracing::error!("{}", error);
        error
    }
}

impl From<UtilError> for ReconcileError {
    fn from(err: UtilError) -> Self {
        let error = Self::Utils(err);
        tracing::error!("{}", error);
        error
    }
}

impl From<AccountError> for ReconcileError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Storage(e) => e.into(),
            AccountError::Utils(e) => e.into(),
        }
    }
}

impl From<CredentialError> for ReconcileError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::AlreadyLinked { .. } => {
                ValidationError::uniqueness(ValidationField::Credentials).into()
            }
            CredentialError::Storage(e) => e.into(),
        }
    }
}
