//! Account repository for chart-of-accounts database operations.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tillbook_core::account::{Account, AccountSpec, AccountType, PartyModel};
use tillbook_core::store::{AccountStore, StorageError};
use tillbook_shared::{AccountId, PartyId, StoreId};

use super::db_err;
use crate::entities::accounts;

/// The tag persisted for an account type.
fn account_type_tag(account_type: AccountType) -> &'static str {
    match account_type {
        AccountType::Asset => "asset",
        AccountType::Liability => "liability",
        AccountType::Equity => "equity",
        AccountType::Revenue => "revenue",
        AccountType::Expense => "expense",
        AccountType::Drawing => "drawing",
        AccountType::Closed => "closed",
    }
}

fn parse_account_type(tag: &str) -> AccountType {
    match tag {
        "asset" => AccountType::Asset,
        "liability" => AccountType::Liability,
        "equity" => AccountType::Equity,
        "revenue" => AccountType::Revenue,
        "expense" => AccountType::Expense,
        "drawing" => AccountType::Drawing,
        _ => AccountType::Closed,
    }
}

fn party_model_tag(model: PartyModel) -> &'static str {
    match model {
        PartyModel::Customer => "customer",
        PartyModel::Investor => "investor",
    }
}

fn parse_party_model(tag: &str) -> Option<PartyModel> {
    match tag {
        "customer" => Some(PartyModel::Customer),
        "investor" => Some(PartyModel::Investor),
        _ => None,
    }
}

pub(crate) fn to_domain(model: accounts::Model) -> Account {
    Account {
        id: AccountId::from_uuid(model.id),
        store_id: StoreId::from_uuid(model.store_id),
        reference_id: model.reference_id.map(PartyId::from_uuid),
        reference_model: model.reference_model.as_deref().and_then(parse_party_model),
        account_type: parse_account_type(&model.account_type),
        number: model.number,
        name: model.name,
        phone: model.phone,
        balance: model.balance,
        debit_total: model.debit_total,
        credit_total: model.credit_total,
        open: model.open,
        created_at: model.created_at.to_utc(),
        updated_at: model.updated_at.to_utc(),
    }
}

pub(crate) fn to_active(account: &Account) -> accounts::ActiveModel {
    accounts::ActiveModel {
        id: Set(account.id.into_inner()),
        store_id: Set(account.store_id.into_inner()),
        reference_id: Set(account.reference_id.map(PartyId::into_inner)),
        reference_model: Set(account
            .reference_model
            .map(|model| party_model_tag(model).to_string())),
        account_type: Set(account_type_tag(account.account_type).to_string()),
        number: Set(account.number),
        name: Set(account.name.clone()),
        phone: Set(account.phone.clone()),
        balance: Set(account.balance),
        debit_total: Set(account.debit_total),
        credit_total: Set(account.credit_total),
        open: Set(account.open),
        created_at: Set(account.created_at.fixed_offset()),
        updated_at: Set(account.updated_at.fixed_offset()),
    }
}

/// `AccountStore` on PostgreSQL.
#[derive(Debug, Clone)]
pub struct SeaAccountStore {
    db: DatabaseConnection,
}

impl SeaAccountStore {
    /// Creates a new account store over the given connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountStore for SeaAccountStore {
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StorageError> {
        let model = accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(to_domain))
    }

    async fn find_by_spec(&self, spec: &AccountSpec) -> Result<Option<Account>, StorageError> {
        let query = accounts::Entity::find()
            .filter(accounts::Column::StoreId.eq(spec.store_id.into_inner()));
        let query = match spec.reference_id {
            Some(reference_id) => {
                query.filter(accounts::Column::ReferenceId.eq(reference_id.into_inner()))
            }
            None => query
                .filter(accounts::Column::ReferenceId.is_null())
                .filter(accounts::Column::Name.eq(spec.name.clone())),
        };
        let model = query.one(&self.db).await.map_err(db_err)?;
        Ok(model.map(to_domain))
    }

    async fn next_number(&self, store_id: StoreId) -> Result<i64, StorageError> {
        let highest = accounts::Entity::find()
            .filter(accounts::Column::StoreId.eq(store_id.into_inner()))
            .order_by_desc(accounts::Column::Number)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(highest.map_or(1, |model| model.number + 1))
    }

    async fn insert(&self, account: Account) -> Result<(), StorageError> {
        tracing::debug!(account_id = %account.id, name = %account.name, "inserting account");
        to_active(&account).insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn update_aggregates(&self, account: &Account) -> Result<(), StorageError> {
        let update = accounts::ActiveModel {
            id: Set(account.id.into_inner()),
            account_type: Set(account_type_tag(account.account_type).to_string()),
            balance: Set(account.balance),
            debit_total: Set(account.debit_total),
            credit_total: Set(account.credit_total),
            open: Set(account.open),
            updated_at: Set(account.updated_at.fixed_offset()),
            ..Default::default()
        };
        update.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn list_by_store(&self, store_id: StoreId) -> Result<Vec<Account>, StorageError> {
        let models = accounts::Entity::find()
            .filter(accounts::Column::StoreId.eq(store_id.into_inner()))
            .order_by_asc(accounts::Column::Number)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(to_domain).collect())
    }
}
