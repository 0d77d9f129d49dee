//! The redo coordinator.
//!
//! `redo` is the only mutating entry point for a document's accounting
//! effect: it undoes whatever the document previously posted, then rebuilds
//! the effect from current document state. Delete handlers call `undo`
//! alone. Callers serialize redos per `reference_id`; the engine takes no
//! locks of its own.

use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tillbook_shared::{AccountId, DocumentId, EngineConfig, StoreId};

use crate::adapter::describe;
use crate::document::Document;
use crate::error::EngineError;
use crate::journal::builder::JournalBuilder;
use crate::ledger::Ledger;
use crate::posting;
use crate::registry::AccountRegistry;
use crate::store::{bounded, AccountStore, LedgerStore, PostingStore};

/// Orchestrates undo-then-do per document across the registry, the ledger
/// store, and the posting projector.
pub struct PostingEngine {
    ledgers: Arc<dyn LedgerStore>,
    postings: Arc<dyn PostingStore>,
    registry: AccountRegistry,
    config: EngineConfig,
    lookup_deadline: Duration,
    insert_deadline: Duration,
}

impl PostingEngine {
    /// Creates an engine over the given stores.
    #[must_use]
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        ledgers: Arc<dyn LedgerStore>,
        postings: Arc<dyn PostingStore>,
        config: EngineConfig,
    ) -> Self {
        let registry = AccountRegistry::new(accounts, postings.clone(), &config);
        let lookup_deadline = Duration::from_secs(config.lookup_timeout_secs);
        let insert_deadline = Duration::from_secs(config.insert_timeout_secs);
        Self {
            ledgers,
            postings,
            registry,
            config,
            lookup_deadline,
            insert_deadline,
        }
    }

    /// The engine's account registry.
    #[must_use]
    pub fn registry(&self) -> &AccountRegistry {
        &self.registry
    }

    /// Removes a document's ledgers and postings and recomputes the touched
    /// accounts against what remains.
    ///
    /// Removal is best-effort-then-assert: rows are gone even if a recompute
    /// fails afterwards, and recomputes can be retried.
    pub async fn undo(
        &self,
        reference_id: DocumentId,
        store_id: StoreId,
    ) -> Result<BTreeSet<AccountId>, EngineError> {
        let ledgers = bounded(
            self.lookup_deadline,
            "ledger lookup",
            self.ledgers.find_many_by_reference(reference_id, store_id),
        )
        .await?;

        let touched: BTreeSet<AccountId> = ledgers
            .iter()
            .flat_map(Ledger::account_ids)
            .collect();

        let removed_ledgers = bounded(
            self.lookup_deadline,
            "ledger removal",
            self.ledgers.remove_by_reference(reference_id, store_id),
        )
        .await?;
        let removed_postings = bounded(
            self.lookup_deadline,
            "posting removal",
            self.postings.remove_by_reference(reference_id, store_id),
        )
        .await?;
        tracing::debug!(
            %reference_id,
            removed_ledgers,
            removed_postings,
            accounts = touched.len(),
            "undid document"
        );

        self.registry.set_balances(&touched).await?;
        Ok(touched)
    }

    /// Rebuilds a document's accounting effect: undo, adapt, build, write.
    ///
    /// Logic errors (missing fields, unknown methods, imbalanced bundles)
    /// are returned before any ledger is written. Storage failures after the
    /// undo surface as `REDO_PARTIAL`; retrying `redo` is safe because undo
    /// always runs first.
    pub async fn redo(&self, document: &Document) -> Result<Vec<Ledger>, EngineError> {
        let reference_id = document.reference_id();
        let store_id = document
            .store_id()
            .ok_or(EngineError::MissingField {
                kind: document.kind(),
                field: "store_id",
            })?;

        self.undo(reference_id, store_id).await?;

        let descriptions = describe(document)?;

        // Build every journal before writing any ledger, so logic errors
        // cannot leave a partial do phase behind.
        let builder = JournalBuilder::new(&self.registry, &self.config);
        let now = Utc::now();
        let mut built = Vec::with_capacity(descriptions.len());
        for description in &descriptions {
            let journals = builder.build(description).await?;
            built.push(Ledger::assemble(description, journals, now));
        }

        match self.apply(&built).await {
            Ok(()) => {
                tracing::info!(
                    %reference_id,
                    kind = %document.kind(),
                    ledgers = built.len(),
                    "redid document"
                );
                Ok(built)
            }
            Err(source) => Err(EngineError::RedoPartial {
                reference_id,
                source: Box::new(source),
            }),
        }
    }

    /// The do phase: persist ledgers, project postings, recompute accounts.
    async fn apply(&self, ledgers: &[Ledger]) -> Result<(), EngineError> {
        for ledger in ledgers {
            bounded(
                self.insert_deadline,
                "ledger insert",
                self.ledgers.insert(ledger.clone()),
            )
            .await?;

            let now = Utc::now();
            for posting in posting::project(ledger, now) {
                let account_id = posting.account_id;
                bounded(
                    self.insert_deadline,
                    "posting insert",
                    self.postings.insert(posting),
                )
                .await?;
                self.registry.recompute_balance(account_id).await?;
            }
        }
        Ok(())
    }
}
