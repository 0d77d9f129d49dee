//! Chart-of-accounts entries and their aggregate rules.
//!
//! Accounts are created on first reference and never hard-deleted. Their
//! aggregates (`debit_total`, `credit_total`, `balance`, `type`, `open`) are
//! derived from postings and rewritten on every recompute.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tillbook_shared::{round_money, AccountId, PartyId, StoreId};

/// Account classification.
///
/// Customer accounts flip between `Asset` (customer owes us) and `Liability`
/// (we owe the customer) on every recompute, and become `Closed` when their
/// debits and credits are equal. Other accounts keep the type assigned at
/// creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Resources we hold (Cash, Bank, receivables).
    Asset,
    /// What we owe (customer credit balances).
    Liability,
    /// Owner capital.
    Equity,
    /// Income accounts (Sales, Cash discount received).
    Revenue,
    /// Expense accounts (Cash discount allowed).
    Expense,
    /// Owner drawings.
    Drawing,
    /// Balanced out; no outstanding amount either way.
    Closed,
}

/// The kind of party an account represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyModel {
    /// A customer account.
    Customer,
    /// An investor capital account.
    Investor,
}

impl std::fmt::Display for PartyModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Investor => write!(f, "investor"),
        }
    }
}

/// Named system accounts, one of each per store.
///
/// Looked up (and created on first use) by `(store_id, name)` with no party
/// reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemAccount {
    /// Cash on hand.
    Cash,
    /// All bank-settled methods.
    Bank,
    /// Sales revenue.
    Sales,
    /// Sales returns.
    SalesReturn,
    /// Discounts granted to customers at settlement.
    CashDiscountAllowed,
    /// Discounts recovered on returns.
    CashDiscountReceived,
}

impl SystemAccount {
    /// The display name the account is keyed by.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Cash => "Cash",
            Self::Bank => "Bank",
            Self::Sales => "Sales",
            Self::SalesReturn => "Sales Return",
            Self::CashDiscountAllowed => "Cash discount allowed",
            Self::CashDiscountReceived => "Cash discount received",
        }
    }

    /// The classification assigned at creation.
    #[must_use]
    pub fn account_type(self) -> AccountType {
        match self {
            Self::Cash | Self::Bank => AccountType::Asset,
            Self::Sales | Self::SalesReturn | Self::CashDiscountReceived => AccountType::Revenue,
            Self::CashDiscountAllowed => AccountType::Expense,
        }
    }
}

/// The find-or-create key for an account.
///
/// Party accounts (customer/investor) are keyed by `(store_id, reference_id)`;
/// named system accounts by `(store_id, name)` with no reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSpec {
    /// The tenant.
    pub store_id: StoreId,
    /// The party this account represents, if any.
    pub reference_id: Option<PartyId>,
    /// The party kind, if any.
    pub reference_model: Option<PartyModel>,
    /// Display name; the lookup key for system accounts.
    pub name: String,
    /// Contact phone, carried onto the account at creation.
    pub phone: Option<String>,
    /// Classification assigned when the account is created.
    pub account_type: AccountType,
}

impl AccountSpec {
    /// Spec for a named system account.
    #[must_use]
    pub fn system(store_id: StoreId, account: SystemAccount) -> Self {
        Self {
            store_id,
            reference_id: None,
            reference_model: None,
            name: account.name().to_string(),
            phone: None,
            account_type: account.account_type(),
        }
    }

    /// Spec for a customer account, named after the customer.
    #[must_use]
    pub fn customer(store_id: StoreId, id: PartyId, name: &str, phone: Option<String>) -> Self {
        Self {
            store_id,
            reference_id: Some(id),
            reference_model: Some(PartyModel::Customer),
            name: name.to_string(),
            phone,
            // Until the first recompute there is nothing outstanding.
            account_type: AccountType::Closed,
        }
    }

    /// Spec for an investor capital account, named "<name> Capital".
    #[must_use]
    pub fn investor_capital(
        store_id: StoreId,
        id: PartyId,
        name: &str,
        phone: Option<String>,
    ) -> Self {
        Self {
            store_id,
            reference_id: Some(id),
            reference_model: Some(PartyModel::Investor),
            name: format!("{name} Capital"),
            phone,
            account_type: AccountType::Equity,
        }
    }
}

/// A chart-of-accounts entry with running aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// The tenant.
    pub store_id: StoreId,
    /// The party this account represents, if any.
    pub reference_id: Option<PartyId>,
    /// The party kind, if any.
    pub reference_model: Option<PartyModel>,
    /// Classification; re-derived for customer accounts on every recompute.
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// Monotonic per-store account number.
    pub number: i64,
    /// Display name.
    pub name: String,
    /// Contact phone.
    pub phone: Option<String>,
    /// `|debit_total - credit_total|`, rounded.
    pub balance: Decimal,
    /// Sum of posting debit totals, rounded.
    pub debit_total: Decimal,
    /// Sum of posting credit totals, rounded.
    pub credit_total: Decimal,
    /// True while the balance is non-zero.
    pub open: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Creates a fresh account from a spec with the given per-store number.
    #[must_use]
    pub fn create(spec: AccountSpec, number: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: AccountId::new(),
            store_id: spec.store_id,
            reference_id: spec.reference_id,
            reference_model: spec.reference_model,
            account_type: spec.account_type,
            number,
            name: spec.name,
            phone: spec.phone,
            balance: Decimal::ZERO,
            debit_total: Decimal::ZERO,
            credit_total: Decimal::ZERO,
            open: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rewrites the derived aggregates from posting sums.
    ///
    /// `balance = |debit_total - credit_total|`, `open <=> balance != 0`,
    /// and customer accounts flip between asset and liability (closed when
    /// equal). All values are rounded to 2 decimals before being recorded.
    pub fn apply_aggregates(
        &mut self,
        debit_total: Decimal,
        credit_total: Decimal,
        now: DateTime<Utc>,
    ) {
        self.debit_total = round_money(debit_total);
        self.credit_total = round_money(credit_total);
        self.balance = round_money((self.debit_total - self.credit_total).abs());
        self.open = !self.balance.is_zero();
        if self.reference_model == Some(PartyModel::Customer) {
            self.account_type = if self.debit_total > self.credit_total {
                AccountType::Asset
            } else if self.credit_total > self.debit_total {
                AccountType::Liability
            } else {
                AccountType::Closed
            };
        }
        self.updated_at = now;
    }

    /// True if this account represents a customer.
    #[must_use]
    pub fn is_customer(&self) -> bool {
        self.reference_model == Some(PartyModel::Customer)
    }
}
