//! Repository abstractions for data access.
//!
//! Repositories implement the `tillbook-core` storage traits on top of
//! `SeaORM`, hiding the entity layer from the engine.

pub mod account;
pub mod ledger;
pub mod posting;

pub use account::SeaAccountStore;
pub use ledger::SeaLedgerStore;
pub use posting::SeaPostingStore;

use sea_orm::DbErr;
use tillbook_core::store::StorageError;

/// Maps a database error into the engine's storage error.
pub(crate) fn db_err(err: DbErr) -> StorageError {
    StorageError::Unavailable(err.to_string())
}
