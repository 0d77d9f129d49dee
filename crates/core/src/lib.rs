//! Double-entry accounting engine for Tillbook.
//!
//! This crate turns business documents (sales, sales returns, customer
//! deposits, customer withdrawals, capital injections) into balanced
//! ledgers, per-account postings, and derived running balances, with
//! deterministic undo/redo per document.
//!
//! # Modules
//!
//! - `account` - Chart-of-accounts entries and aggregate rules
//! - `document` - Business documents and the uniform description shape
//! - `adapter` - Per-kind document adapters
//! - `journal` - Journal lines and the journal builder
//! - `ledger` - The persisted record of a document's journal
//! - `posting` - Per-account projections of a ledger
//! - `registry` - Account registry and balance recomputation
//! - `engine` - The redo coordinator (undo-then-do)
//! - `store` - Storage traits and the in-memory store

pub mod account;
pub mod adapter;
pub mod document;
pub mod engine;
pub mod error;
pub mod journal;
pub mod ledger;
pub mod posting;
pub mod registry;
pub mod store;

#[cfg(test)]
mod engine_props;

pub use account::{Account, AccountSpec, AccountType, PartyModel, SystemAccount};
pub use adapter::describe;
pub use document::{
    CapitalDocument, DepositDocument, Document, DocumentDescription, DocumentKind, PartySpec,
    Payment, SaleDocument, SalesReturnDocument, Settlement, WithdrawalDocument,
};
pub use engine::PostingEngine;
pub use error::EngineError;
pub use journal::builder::{AccountResolver, JournalBuilder};
pub use journal::line::{AccountRef, JournalLine, Side};
pub use ledger::Ledger;
pub use posting::{CounterpartyPost, Posting};
pub use registry::AccountRegistry;
pub use store::{AccountStore, LedgerStore, MemoryStore, PostingStore, StorageError};
