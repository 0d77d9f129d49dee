//! Ledger repository.
//!
//! A ledger row plus its ordered `journal_lines` children persist the
//! embedded journal of the domain model.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tillbook_core::journal::line::{JournalLine, Side};
use tillbook_core::ledger::Ledger;
use tillbook_core::store::{LedgerStore, StorageError};
use tillbook_shared::{AccountId, DocumentId, LedgerId, StoreId};
use uuid::Uuid;

use super::db_err;
use crate::entities::{journal_lines, ledgers};

pub(crate) fn side_tag(side: Side) -> &'static str {
    match side {
        Side::Debit => "debit",
        Side::Credit => "credit",
    }
}

pub(crate) fn parse_side(tag: &str) -> Side {
    if tag == "credit" {
        Side::Credit
    } else {
        Side::Debit
    }
}

fn ledger_to_active(ledger: &Ledger) -> ledgers::ActiveModel {
    ledgers::ActiveModel {
        id: Set(ledger.id.into_inner()),
        store_id: Set(ledger.store_id.into_inner()),
        reference_id: Set(ledger.reference_id.into_inner()),
        reference_model: Set(ledger.reference_model.clone()),
        reference_code: Set(ledger.reference_code.clone()),
        created_at: Set(ledger.created_at.fixed_offset()),
        updated_at: Set(ledger.updated_at.fixed_offset()),
    }
}

fn lines_to_active(ledger: &Ledger) -> Vec<journal_lines::ActiveModel> {
    ledger
        .journals
        .iter()
        .enumerate()
        .map(|(index, line)| journal_lines::ActiveModel {
            id: Set(Uuid::now_v7()),
            ledger_id: Set(ledger.id.into_inner()),
            line_index: Set(index as i32),
            date: Set(line.date.fixed_offset()),
            account_id: Set(line.account_id.into_inner()),
            account_number: Set(line.account_number),
            account_name: Set(line.account_name.clone()),
            debit_or_credit: Set(side_tag(line.side).to_string()),
            debit: Set(line.debit),
            credit: Set(line.credit),
            group_id: Set(line.group_id),
            created_at: Set(ledger.created_at.fixed_offset()),
            updated_at: Set(ledger.updated_at.fixed_offset()),
        })
        .collect()
}

pub(crate) fn line_to_domain(model: journal_lines::Model) -> JournalLine {
    JournalLine {
        date: model.date.to_utc(),
        account_id: AccountId::from_uuid(model.account_id),
        account_number: model.account_number,
        account_name: model.account_name,
        side: parse_side(&model.debit_or_credit),
        debit: model.debit,
        credit: model.credit,
        group_id: model.group_id,
    }
}

fn to_domain(model: ledgers::Model, lines: Vec<journal_lines::Model>) -> Ledger {
    Ledger {
        id: LedgerId::from_uuid(model.id),
        store_id: StoreId::from_uuid(model.store_id),
        reference_id: DocumentId::from_uuid(model.reference_id),
        reference_model: model.reference_model,
        reference_code: model.reference_code,
        journals: lines.into_iter().map(line_to_domain).collect(),
        created_at: model.created_at.to_utc(),
        updated_at: model.updated_at.to_utc(),
    }
}

/// `LedgerStore` on PostgreSQL.
#[derive(Debug, Clone)]
pub struct SeaLedgerStore {
    db: DatabaseConnection,
}

impl SeaLedgerStore {
    /// Creates a new ledger store over the given connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn load_lines(
        &self,
        ledger_id: Uuid,
    ) -> Result<Vec<journal_lines::Model>, StorageError> {
        journal_lines::Entity::find()
            .filter(journal_lines::Column::LedgerId.eq(ledger_id))
            .order_by_asc(journal_lines::Column::LineIndex)
            .all(&self.db)
            .await
            .map_err(db_err)
    }
}

#[async_trait]
impl LedgerStore for SeaLedgerStore {
    async fn insert(&self, ledger: Ledger) -> Result<(), StorageError> {
        tracing::debug!(
            ledger_id = %ledger.id,
            reference_id = %ledger.reference_id,
            lines = ledger.journals.len(),
            "inserting ledger"
        );
        let txn = self.db.begin().await.map_err(db_err)?;
        let lines = lines_to_active(&ledger);
        ledger_to_active(&ledger)
            .insert(&txn)
            .await
            .map_err(db_err)?;
        if !lines.is_empty() {
            journal_lines::Entity::insert_many(lines)
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }
        txn.commit().await.map_err(db_err)?;
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
        let models = ledgers::Entity::find()
            .filter(ledgers::Column::ReferenceId.eq(reference_id.into_inner()))
            .filter(ledgers::Column::StoreId.eq(store_id.into_inner()))
            .order_by_asc(ledgers::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut result = Vec::with_capacity(models.len());
        for model in models {
            let lines = self.load_lines(model.id).await?;
            result.push(to_domain(model, lines));
        }
        Ok(result)
    }

    async fn remove_by_reference(
        &self,
        reference_id: DocumentId,
        store_id: StoreId,
    ) -> Result<u64, StorageError> {
        // journal_lines cascade with their ledger.
        let removed = ledgers::Entity::delete_many()
            .filter(ledgers::Column::ReferenceId.eq(reference_id.into_inner()))
            .filter(ledgers::Column::StoreId.eq(store_id.into_inner()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        tracing::debug!(
            %reference_id,
            removed = removed.rows_affected,
            "removed ledgers"
        );
        Ok(removed.rows_affected)
    }
}
