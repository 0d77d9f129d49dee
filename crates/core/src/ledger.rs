//! The persisted record of a document's journal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tillbook_shared::{AccountId, DocumentId, LedgerId, StoreId};

use crate::document::DocumentDescription;
use crate::error::EngineError;
use crate::journal::builder::validate_bundles;
use crate::journal::line::JournalLine;

/// One ledger per business document (per payment for withdrawals).
///
/// Ledgers are created on Do and destroyed on Undo; they are never updated
/// in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    /// Unique identifier.
    pub id: LedgerId,
    /// The tenant.
    pub store_id: StoreId,
    /// The source document's id.
    pub reference_id: DocumentId,
    /// The source document's kind tag ("sales", "capital", ...).
    pub reference_model: String,
    /// The source document's human-readable code.
    pub reference_code: String,
    /// The balanced journal lines.
    pub journals: Vec<JournalLine>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Ledger {
    /// Assembles a ledger from a description and its built journal.
    #[must_use]
    pub fn assemble(
        description: &DocumentDescription,
        journals: Vec<JournalLine>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LedgerId::new(),
            store_id: description.store_id,
            reference_id: description.reference_id,
            reference_model: description.kind.reference_model().to_string(),
            reference_code: description.reference_code.clone(),
            journals,
            created_at: now,
            updated_at: now,
        }
    }

    /// The distinct accounts this ledger touches, in order of appearance.
    #[must_use]
    pub fn account_ids(&self) -> Vec<AccountId> {
        let mut seen = Vec::new();
        for line in &self.journals {
            if !seen.contains(&line.account_id) {
                seen.push(line.account_id);
            }
        }
        seen
    }

    /// Validates that every bundle balances.
    ///
    /// # Errors
    ///
    /// Returns `ImbalancedBundle` for the first imbalanced group.
    pub fn validate_balanced(&self) -> Result<(), EngineError> {
        validate_bundles(&self.journals)
    }
}
