//! Posting repository.
//!
//! A posting row plus its ordered `posting_lines` children persist the
//! per-account projection; aggregate sums run storage-side.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tillbook_core::posting::{CounterpartyPost, Posting};
use tillbook_core::store::{PostingStore, StorageError};
use tillbook_shared::{AccountId, DocumentId, PostingId, StoreId};
use uuid::Uuid;

use super::db_err;
use super::ledger::{parse_side, side_tag};
use crate::entities::{posting_lines, postings};

fn posting_to_active(posting: &Posting) -> postings::ActiveModel {
    postings::ActiveModel {
        id: Set(posting.id.into_inner()),
        date: Set(posting.date.fixed_offset()),
        store_id: Set(posting.store_id.into_inner()),
        account_id: Set(posting.account_id.into_inner()),
        account_number: Set(posting.account_number),
        account_name: Set(posting.account_name.clone()),
        reference_id: Set(posting.reference_id.into_inner()),
        reference_model: Set(posting.reference_model.clone()),
        reference_code: Set(posting.reference_code.clone()),
        debit_total: Set(posting.debit_total),
        credit_total: Set(posting.credit_total),
        created_at: Set(posting.created_at.fixed_offset()),
        updated_at: Set(posting.updated_at.fixed_offset()),
    }
}

fn lines_to_active(posting: &Posting) -> Vec<posting_lines::ActiveModel> {
    posting
        .posts
        .iter()
        .enumerate()
        .map(|(index, post)| posting_lines::ActiveModel {
            id: Set(Uuid::now_v7()),
            posting_id: Set(posting.id.into_inner()),
            line_index: Set(index as i32),
            date: Set(post.date.fixed_offset()),
            account_id: Set(post.account_id.into_inner()),
            account_number: Set(post.account_number),
            account_name: Set(post.account_name.clone()),
            debit_or_credit: Set(side_tag(post.side).to_string()),
            debit: Set(post.debit),
            credit: Set(post.credit),
            created_at: Set(posting.created_at.fixed_offset()),
            updated_at: Set(posting.updated_at.fixed_offset()),
        })
        .collect()
}

fn post_to_domain(model: posting_lines::Model) -> CounterpartyPost {
    CounterpartyPost {
        date: model.date.to_utc(),
        account_id: AccountId::from_uuid(model.account_id),
        account_number: model.account_number,
        account_name: model.account_name,
        side: parse_side(&model.debit_or_credit),
        debit: model.debit,
        credit: model.credit,
    }
}

fn to_domain(model: postings::Model, lines: Vec<posting_lines::Model>) -> Posting {
    Posting {
        id: PostingId::from_uuid(model.id),
        date: model.date.to_utc(),
        store_id: StoreId::from_uuid(model.store_id),
        account_id: AccountId::from_uuid(model.account_id),
        account_number: model.account_number,
        account_name: model.account_name,
        reference_id: DocumentId::from_uuid(model.reference_id),
        reference_model: model.reference_model,
        reference_code: model.reference_code,
        posts: lines.into_iter().map(post_to_domain).collect(),
        debit_total: model.debit_total,
        credit_total: model.credit_total,
        created_at: model.created_at.to_utc(),
        updated_at: model.updated_at.to_utc(),
    }
}

#[derive(Debug, FromQueryResult)]
struct PostingTotals {
    debit: Option<Decimal>,
    credit: Option<Decimal>,
}

/// `PostingStore` on PostgreSQL.
#[derive(Debug, Clone)]
pub struct SeaPostingStore {
    db: DatabaseConnection,
}

impl SeaPostingStore {
    /// Creates a new posting store over the given connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PostingStore for SeaPostingStore {
    async fn insert(&self, posting: Posting) -> Result<(), StorageError> {
        tracing::debug!(
            posting_id = %posting.id,
            account_id = %posting.account_id,
            reference_id = %posting.reference_id,
            "inserting posting"
        );
        let txn = self.db.begin().await.map_err(db_err)?;
        let lines = lines_to_active(&posting);
        posting_to_active(&posting)
            .insert(&txn)
            .await
            .map_err(db_err)?;
        if !lines.is_empty() {
            posting_lines::Entity::insert_many(lines)
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }
        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_account(&self, account_id: AccountId) -> Result<Vec<Posting>, StorageError> {
        let models = postings::Entity::find()
            .filter(postings::Column::AccountId.eq(account_id.into_inner()))
            .order_by_asc(postings::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut result = Vec::with_capacity(models.len());
        for model in models {
            let lines = posting_lines::Entity::find()
                .filter(posting_lines::Column::PostingId.eq(model.id))
                .order_by_asc(posting_lines::Column::LineIndex)
                .all(&self.db)
                .await
                .map_err(db_err)?;
            result.push(to_domain(model, lines));
        }
        Ok(result)
    }

    async fn totals_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<(Decimal, Decimal), StorageError> {
        let totals = postings::Entity::find()
            .select_only()
            .column_as(postings::Column::DebitTotal.sum(), "debit")
            .column_as(postings::Column::CreditTotal.sum(), "credit")
            .filter(postings::Column::AccountId.eq(account_id.into_inner()))
            .into_model::<PostingTotals>()
            .one(&self.db)
            .await
            .map_err(db_err)?;
        let totals = totals.unwrap_or(PostingTotals {
            debit: None,
            credit: None,
        });
        Ok((
            totals.debit.unwrap_or(Decimal::ZERO),
            totals.credit.unwrap_or(Decimal::ZERO),
        ))
    }

    async fn remove_by_reference(
        &self,
        reference_id: DocumentId,
        store_id: StoreId,
    ) -> Result<u64, StorageError> {
        // posting_lines cascade with their posting.
        let removed = postings::Entity::delete_many()
            .filter(postings::Column::ReferenceId.eq(reference_id.into_inner()))
            .filter(postings::Column::StoreId.eq(store_id.into_inner()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        tracing::debug!(
            %reference_id,
            removed = removed.rows_affected,
            "removed postings"
        );
        Ok(removed.rows_affected)
    }
}
