//! Shared types, monetary helpers, and configuration for Tillbook.
//!
//! This crate contains the pieces every other Tillbook crate depends on:
//! typed identifiers, the money rounding rules, and application
//! configuration. No web or database dependencies live here.

pub mod config;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, EngineConfig};
pub use types::id::{AccountId, DocumentId, LedgerId, PartyId, PostingId, StoreId};
pub use types::money::{money_eq, round_money};
