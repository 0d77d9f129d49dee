//! `SeaORM` Entity for the postings table.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "postings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub date: DateTimeWithTimeZone,
    pub store_id: Uuid,
    pub account_id: Uuid,
    pub account_number: i64,
    pub account_name: String,
    pub reference_id: Uuid,
    pub reference_model: String,
    pub reference_code: String,
    pub debit_total: Decimal,
    pub credit_total: Decimal,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::posting_lines::Entity")]
    PostingLines,
}

impl Related<super::posting_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PostingLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
