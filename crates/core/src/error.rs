//! Engine error types.
//!
//! One taxonomy covers the whole engine: storage failures propagate, logic
//! errors (imbalanced bundles, missing document fields) are returned without
//! partial writes, and a do-phase failure after a successful undo surfaces as
//! `RedoPartial` so the caller can retry `redo`.

use rust_decimal::Decimal;
use thiserror::Error;
use tillbook_shared::{AccountId, DocumentId};

use crate::document::DocumentKind;
use crate::store::StorageError;

/// Errors that can occur during accounting engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The storage layer failed or exceeded its deadline.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// An explicitly referenced account does not exist.
    ///
    /// Never raised by `find_or_create`; absence there triggers creation.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// The journal builder produced a non-zero net within a bundle.
    #[error(
        "Journal bundle {group_id} is imbalanced: debits {debits} != credits {credits}"
    )]
    ImbalancedBundle {
        /// The offending bundle's group id.
        group_id: i32,
        /// Total debits within the bundle (rounded).
        debits: Decimal,
        /// Total credits within the bundle (rounded).
        credits: Decimal,
    },

    /// A document arrived without a field the adapter requires.
    #[error("{kind} document is missing required field '{field}'")]
    MissingField {
        /// The document kind being adapted.
        kind: DocumentKind,
        /// The absent field.
        field: &'static str,
    },

    /// A payment method outside cash, customer_account, and the bank set.
    #[error("Unknown payment method: '{0}'")]
    UnknownPaymentMethod(String),

    /// Undo succeeded but a do-phase write failed; retry `redo`.
    #[error("Redo of document {reference_id} failed after undo; retry redo")]
    RedoPartial {
        /// The document whose redo was interrupted.
        reference_id: DocumentId,
        /// The write failure that interrupted the do phase.
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Returns the stable machine code for this error.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Storage(_) => "STORAGE_UNAVAILABLE",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::ImbalancedBundle { .. } => "IMBALANCED_BUNDLE",
            Self::MissingField { .. } => "MISSING_REQUIRED_DOC_FIELD",
            Self::UnknownPaymentMethod(_) => "UNKNOWN_PAYMENT_METHOD",
            Self::RedoPartial { .. } => "REDO_PARTIAL",
        }
    }

    /// Returns true if retrying the operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::RedoPartial { .. })
    }
}
