//! Storage traits for the accounting engine.
//!
//! The engine owns its semantics; storage is a seam. `tillbook-db` provides
//! the PostgreSQL implementation, `MemoryStore` a hermetic in-memory one.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tillbook_shared::{AccountId, DocumentId, StoreId};

use crate::account::{Account, AccountSpec};
use crate::ledger::Ledger;
use crate::posting::Posting;

pub mod memory;

pub use memory::MemoryStore;

/// Errors from the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The storage backend failed.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A storage call exceeded its deadline.
    #[error("{op} exceeded its {deadline:?} deadline")]
    DeadlineExceeded {
        /// The operation that timed out.
        op: &'static str,
        /// The deadline that was exceeded.
        deadline: Duration,
    },
}

/// Bounds a storage call by a deadline.
///
/// On timeout the operation fails atomically at that call; callers treat the
/// document as partially processed and retry `redo`.
///
/// # Errors
///
/// Returns `DeadlineExceeded` when the future does not complete in time, or
/// the future's own error.
pub async fn bounded<T, F>(
    deadline: Duration,
    op: &'static str,
    future: F,
) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    tokio::time::timeout(deadline, future)
        .await
        .map_err(|_| StorageError::DeadlineExceeded { op, deadline })?
}

/// Persistence for chart-of-accounts entries.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Point lookup by id.
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StorageError>;

    /// Lookup by the find-or-create key: `(store_id, reference_id)` for
    /// party accounts, `(store_id, name)` with no reference for named ones.
    async fn find_by_spec(&self, spec: &AccountSpec) -> Result<Option<Account>, StorageError>;

    /// The next monotonic per-store account number.
    async fn next_number(&self, store_id: StoreId) -> Result<i64, StorageError>;

    /// Inserts a freshly created account.
    async fn insert(&self, account: Account) -> Result<(), StorageError>;

    /// Rewrites an account's derived aggregates (totals, balance, type, open).
    async fn update_aggregates(&self, account: &Account) -> Result<(), StorageError>;

    /// Every account of a store, for reporting and conservation checks.
    async fn list_by_store(&self, store_id: StoreId) -> Result<Vec<Account>, StorageError>;
}

/// Persistence for ledgers.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Inserts a ledger with its journal lines.
    async fn insert(&self, ledger: Ledger) -> Result<(), StorageError>;

    /// The first ledger for a document, if any.
    async fn find_by_reference(
        &self,
        reference_id: DocumentId,
        store_id: StoreId,
    ) -> Result<Option<Ledger>, StorageError>;

    /// All ledgers for a document (withdrawals produce one per payment).
    async fn find_many_by_reference(
        &self,
        reference_id: DocumentId,
        store_id: StoreId,
    ) -> Result<Vec<Ledger>, StorageError>;

    /// Removes every ledger for a document; returns the number removed.
    async fn remove_by_reference(
        &self,
        reference_id: DocumentId,
        store_id: StoreId,
    ) -> Result<u64, StorageError>;
}

/// Persistence for postings.
#[async_trait]
pub trait PostingStore: Send + Sync {
    /// Inserts a posting with its paired counterparty rows.
    async fn insert(&self, posting: Posting) -> Result<(), StorageError>;

    /// Every posting for an account.
    async fn find_by_account(&self, account_id: AccountId) -> Result<Vec<Posting>, StorageError>;

    /// Storage-side `(Σ debit_total, Σ credit_total)` over an account's
    /// postings.
    async fn totals_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<(Decimal, Decimal), StorageError>;

    /// Removes every posting for a document; returns the number removed.
    async fn remove_by_reference(
        &self,
        reference_id: DocumentId,
        store_id: StoreId,
    ) -> Result<u64, StorageError>;
}
