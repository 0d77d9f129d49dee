//! `SeaORM` Entity for the posting_lines table.
//!
//! Each row pairs a posting's account with one counterparty contribution.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "posting_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub posting_id: Uuid,
    /// Preserves the pairing order within its posting.
    pub line_index: i32,
    pub date: DateTimeWithTimeZone,
    pub account_id: Uuid,
    pub account_number: i64,
    pub account_name: String,
    pub debit_or_credit: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::postings::Entity",
        from = "Column::PostingId",
        to = "super::postings::Column::Id"
    )]
    Postings,
}

impl Related<super::postings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Postings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
