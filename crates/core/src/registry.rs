//! The account registry and balance recomputer.
//!
//! Owns the identity and lifecycle of chart-of-accounts entries. Accounts
//! are created on first reference and never hard-deleted; their aggregates
//! are recomputed from posting sums, so recomputation is idempotent and the
//! last writer always lands on the correct value.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tillbook_shared::{AccountId, EngineConfig};

use crate::account::{Account, AccountSpec};
use crate::error::EngineError;
use crate::journal::builder::AccountResolver;
use crate::journal::line::AccountRef;
use crate::store::{bounded, AccountStore, PostingStore};

/// Identity, lifecycle, and derived aggregates of accounts.
pub struct AccountRegistry {
    accounts: Arc<dyn AccountStore>,
    postings: Arc<dyn PostingStore>,
    lookup_deadline: Duration,
}

impl AccountRegistry {
    /// Creates a registry over the given stores.
    #[must_use]
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        postings: Arc<dyn PostingStore>,
        engine: &EngineConfig,
    ) -> Self {
        Self {
            accounts,
            postings,
            lookup_deadline: Duration::from_secs(engine.lookup_timeout_secs),
        }
    }

    /// Finds the account a spec describes, creating it on first reference.
    ///
    /// Absence is not a failure here; it triggers creation with the next
    /// per-store monotonic number.
    pub async fn find_or_create(&self, spec: AccountSpec) -> Result<Account, EngineError> {
        if let Some(account) = bounded(
            self.lookup_deadline,
            "account lookup",
            self.accounts.find_by_spec(&spec),
        )
        .await?
        {
            return Ok(account);
        }

        let number = bounded(
            self.lookup_deadline,
            "account numbering",
            self.accounts.next_number(spec.store_id),
        )
        .await?;
        let account = Account::create(spec, number, Utc::now());
        tracing::debug!(
            account_id = %account.id,
            store_id = %account.store_id,
            number = account.number,
            name = %account.name,
            "created account"
        );
        bounded(
            self.lookup_deadline,
            "account insert",
            self.accounts.insert(account.clone()),
        )
        .await?;
        Ok(account)
    }

    /// Point lookup by id.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` when the id does not exist.
    pub async fn find(&self, id: AccountId) -> Result<Account, EngineError> {
        bounded(
            self.lookup_deadline,
            "account lookup",
            self.accounts.find_by_id(id),
        )
        .await?
        .ok_or(EngineError::AccountNotFound(id))
    }

    /// Re-derives an account's aggregates from its posting sums.
    ///
    /// Rewrites `debit_total`, `credit_total`, `balance`, the customer
    /// asset/liability/closed classification, and the `open` flag.
    pub async fn recompute_balance(&self, id: AccountId) -> Result<Account, EngineError> {
        let mut account = self.find(id).await?;
        let (debit_total, credit_total) = bounded(
            self.lookup_deadline,
            "posting aggregation",
            self.postings.totals_for_account(id),
        )
        .await?;
        account.apply_aggregates(debit_total, credit_total, Utc::now());
        bounded(
            self.lookup_deadline,
            "account aggregate update",
            self.accounts.update_aggregates(&account),
        )
        .await?;
        tracing::debug!(
            account_id = %account.id,
            balance = %account.balance,
            open = account.open,
            "recomputed balance"
        );
        Ok(account)
    }

    /// Recomputes every account in the set. Order is irrelevant; each
    /// recompute is idempotent.
    pub async fn set_balances(&self, ids: &BTreeSet<AccountId>) -> Result<(), EngineError> {
        for &id in ids {
            self.recompute_balance(id).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl AccountResolver for AccountRegistry {
    async fn resolve(&self, spec: AccountSpec) -> Result<AccountRef, EngineError> {
        let account = self.find_or_create(spec).await?;
        Ok(AccountRef::from(&account))
    }
}
