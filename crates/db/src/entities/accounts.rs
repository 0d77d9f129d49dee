//! `SeaORM` Entity for the accounts table.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store_id: Uuid,
    pub reference_id: Option<Uuid>,
    pub reference_model: Option<String>,
    pub account_type: String,
    pub number: i64,
    pub name: String,
    pub phone: Option<String>,
    pub balance: Decimal,
    pub debit_total: Decimal,
    pub credit_total: Decimal,
    pub open: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
