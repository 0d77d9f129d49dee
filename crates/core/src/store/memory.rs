//! In-memory storage for tests and embedded use.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tillbook_shared::{AccountId, DocumentId, LedgerId, PostingId, StoreId};
use tokio::sync::RwLock;

use crate::account::{Account, AccountSpec};
use crate::ledger::Ledger;
use crate::posting::Posting;

use super::{AccountStore, LedgerStore, PostingStore, StorageError};

/// A `RwLock`-protected in-memory implementation of all three stores.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<AccountId, Account>>,
    ledgers: RwLock<HashMap<LedgerId, Ledger>>,
    postings: RwLock<HashMap<PostingId, Posting>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ledgers currently held.
    pub async fn ledger_count(&self) -> usize {
        self.ledgers.read().await.len()
    }

    /// Number of postings currently held.
    pub async fn posting_count(&self) -> usize {
        self.postings.read().await.len()
    }
}

fn matches_spec(account: &Account, spec: &AccountSpec) -> bool {
    if account.store_id != spec.store_id {
        return false;
    }
    match spec.reference_id {
        // Party accounts are keyed by (store_id, reference_id).
        Some(reference_id) => account.reference_id == Some(reference_id),
        // Named accounts by (store_id, name) with no reference.
        None => account.reference_id.is_none() && account.name == spec.name,
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StorageError> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_by_spec(&self, spec: &AccountSpec) -> Result<Option<Account>, StorageError> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|account| matches_spec(account, spec))
            .cloned())
    }

    async fn next_number(&self, store_id: StoreId) -> Result<i64, StorageError> {
        let accounts = self.accounts.read().await;
        let max = accounts
            .values()
            .filter(|account| account.store_id == store_id)
            .map(|account| account.number)
            .max()
            .unwrap_or(0);
        Ok(max + 1)
    }

    async fn insert(&self, account: Account) -> Result<(), StorageError> {
        self.accounts.write().await.insert(account.id, account);
        Ok(())
    }

    async fn update_aggregates(&self, account: &Account) -> Result<(), StorageError> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(&account.id) {
            Some(stored) => {
                stored.debit_total = account.debit_total;
                stored.credit_total = account.credit_total;
                stored.balance = account.balance;
                stored.account_type = account.account_type;
                stored.open = account.open;
                stored.updated_at = account.updated_at;
                Ok(())
            }
            None => Err(StorageError::Unavailable(format!(
                "account {} vanished during aggregate update",
                account.id
            ))),
        }
    }

    async fn list_by_store(&self, store_id: StoreId) -> Result<Vec<Account>, StorageError> {
        let mut accounts: Vec<Account> = self
            .accounts
            .read()
            .await
            .values()
            .filter(|account| account.store_id == store_id)
            .cloned()
            .collect();
        accounts.sort_by_key(|account| account.number);
        Ok(accounts)
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn insert(&self, ledger: Ledger) -> Result<(), StorageError> {
        self.ledgers.write().await.insert(ledger.id, ledger);
        Ok(())
    }

    async fn find_by_reference(
        &self,
        reference_id: DocumentId,
        store_id: StoreId,
    ) -> Result<Option<Ledger>, StorageError> {
        Ok(self
            .find_many_by_reference(reference_id, store_id)
            .await?
            .into_iter()
            .next())
    }

    async fn find_many_by_reference(
        &self,
        reference_id: DocumentId,
        store_id: StoreId,
    ) -> Result<Vec<Ledger>, StorageError> {
        let mut ledgers: Vec<Ledger> = self
            .ledgers
            .read()
            .await
            .values()
            .filter(|ledger| ledger.reference_id == reference_id && ledger.store_id == store_id)
            .cloned()
            .collect();
        ledgers.sort_by_key(|ledger| ledger.id);
        Ok(ledgers)
    }

    async fn remove_by_reference(
        &self,
        reference_id: DocumentId,
        store_id: StoreId,
    ) -> Result<u64, StorageError> {
        let mut ledgers = self.ledgers.write().await;
        let before = ledgers.len();
        ledgers
            .retain(|_, ledger| !(ledger.reference_id == reference_id && ledger.store_id == store_id));
        Ok((before - ledgers.len()) as u64)
    }
}

#[async_trait]
impl PostingStore for MemoryStore {
    async fn insert(&self, posting: Posting) -> Result<(), StorageError> {
        self.postings.write().await.insert(posting.id, posting);
        Ok(())
    }

    async fn find_by_account(&self, account_id: AccountId) -> Result<Vec<Posting>, StorageError> {
        let mut postings: Vec<Posting> = self
            .postings
            .read()
            .await
            .values()
            .filter(|posting| posting.account_id == account_id)
            .cloned()
            .collect();
        postings.sort_by_key(|posting| posting.id);
        Ok(postings)
    }

    async fn totals_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<(Decimal, Decimal), StorageError> {
        let postings = self.postings.read().await;
        let mut debit_total = Decimal::ZERO;
        let mut credit_total = Decimal::ZERO;
        for posting in postings.values() {
            if posting.account_id == account_id {
                debit_total += posting.debit_total;
                credit_total += posting.credit_total;
            }
        }
        Ok((debit_total, credit_total))
    }

    async fn remove_by_reference(
        &self,
        reference_id: DocumentId,
        store_id: StoreId,
    ) -> Result<u64, StorageError> {
        let mut postings = self.postings.write().await;
        let before = postings.len();
        postings.retain(|_, posting| {
            !(posting.reference_id == reference_id && posting.store_id == store_id)
        });
        Ok((before - postings.len()) as u64)
    }
}
