//! Business documents and the uniform description the builder consumes.
//!
//! Document records arrive from an external, loosely validated document
//! store, so the fields the engine depends on (`store_id`, `date`, totals)
//! are optional here and checked by the adapters.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tillbook_shared::{round_money, DocumentId, EngineConfig, PartyId, StoreId};

use crate::account::PartyModel;
use crate::error::EngineError;

/// The kinds of business document the engine accounts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// A sales order.
    Sales,
    /// A sales return.
    SalesReturn,
    /// A customer deposit.
    CustomerDeposit,
    /// A customer withdrawal.
    CustomerWithdrawal,
    /// A capital injection.
    Capital,
}

impl DocumentKind {
    /// The `reference_model` tag recorded on ledgers and postings.
    #[must_use]
    pub fn reference_model(self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::SalesReturn => "sales_return",
            Self::CustomerDeposit => "customer_deposit",
            Self::CustomerWithdrawal => "customer_withdrawal",
            Self::Capital => "capital",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reference_model())
    }
}

/// A payment attached to a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// When the payment happened.
    pub date: DateTime<Utc>,
    /// The paid amount.
    pub amount: Decimal,
    /// The payment method string ("cash", "customer_account", or a member of
    /// the configured bank set).
    pub method: String,
}

impl Payment {
    /// Creates a payment with the amount rounded to 2 decimals.
    #[must_use]
    pub fn new(date: DateTime<Utc>, amount: Decimal, method: impl Into<String>) -> Self {
        Self {
            date,
            amount: round_money(amount),
            method: method.into(),
        }
    }
}

/// Where a payment settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The Cash account.
    Cash,
    /// The Bank account.
    Bank,
    /// The customer's own account (payment via credit balance).
    CustomerAccount,
}

impl Settlement {
    /// Classifies a payment method string against the configured bank set.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPaymentMethod` for anything outside `cash`,
    /// `customer_account`, and the bank set.
    pub fn classify(method: &str, engine: &EngineConfig) -> Result<Self, EngineError> {
        match method {
            "cash" => Ok(Self::Cash),
            "customer_account" => Ok(Self::CustomerAccount),
            m if engine.is_bank_method(m) => Ok(Self::Bank),
            other => Err(EngineError::UnknownPaymentMethod(other.to_string())),
        }
    }
}

/// The party (customer or investor) a document belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartySpec {
    /// The party's id in the external system.
    pub id: PartyId,
    /// Customer or investor.
    pub model: PartyModel,
    /// Display name.
    pub name: String,
    /// Contact phone, carried onto the account at creation.
    pub phone: Option<String>,
}

/// The uniform document description the journal builder consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentDescription {
    /// The document kind.
    pub kind: DocumentKind,
    /// The tenant.
    pub store_id: StoreId,
    /// The document's id.
    pub reference_id: DocumentId,
    /// The document's human-readable code.
    pub reference_code: String,
    /// The document date.
    pub date: DateTime<Utc>,
    /// The document's net total (rounded).
    pub net_total: Decimal,
    /// The cash discount granted (rounded; zero when absent).
    pub cash_discount: Decimal,
    /// The party the document belongs to.
    pub party: PartySpec,
    /// The document's payments.
    pub payments: Vec<Payment>,
}

impl DocumentDescription {
    /// The amount due after the cash discount.
    #[must_use]
    pub fn due(&self) -> Decimal {
        round_money(self.net_total - self.cash_discount)
    }
}

/// A sales order as stored by the external document layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleDocument {
    /// Document id.
    pub id: DocumentId,
    /// Human-readable code.
    pub code: String,
    /// The tenant, if recorded.
    pub store_id: Option<StoreId>,
    /// The customer.
    pub customer: PartySpec,
    /// The sale date, if recorded.
    pub date: Option<DateTime<Utc>>,
    /// Net total including VAT, if recorded.
    pub net_total: Option<Decimal>,
    /// Cash discount granted at settlement.
    pub cash_discount: Decimal,
    /// Line-item discount already inside `net_total`.
    pub discount: Decimal,
    /// Payments against the sale.
    pub payments: Vec<Payment>,
}

/// A sales return as stored by the external document layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesReturnDocument {
    /// Document id.
    pub id: DocumentId,
    /// Human-readable code.
    pub code: String,
    /// The tenant, if recorded.
    pub store_id: Option<StoreId>,
    /// The customer.
    pub customer: PartySpec,
    /// The return date, if recorded.
    pub date: Option<DateTime<Utc>>,
    /// Net total of the returned goods, if recorded.
    pub net_total: Option<Decimal>,
    /// Cash discount recovered on the return.
    pub cash_discount: Decimal,
    /// Line-item discount already inside `net_total`.
    pub discount: Decimal,
    /// Refund payments to the customer.
    pub payments: Vec<Payment>,
}

/// A customer deposit as stored by the external document layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositDocument {
    /// Document id.
    pub id: DocumentId,
    /// Human-readable code.
    pub code: String,
    /// The tenant, if recorded.
    pub store_id: Option<StoreId>,
    /// The customer.
    pub customer: PartySpec,
    /// The deposit date, if recorded.
    pub date: Option<DateTime<Utc>>,
    /// The deposited amount, if recorded.
    pub amount: Option<Decimal>,
    /// How the deposit was received.
    pub payment_method: String,
}

/// A customer withdrawal as stored by the external document layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalDocument {
    /// Document id.
    pub id: DocumentId,
    /// Human-readable code.
    pub code: String,
    /// The tenant, if recorded.
    pub store_id: Option<StoreId>,
    /// The customer.
    pub customer: PartySpec,
    /// The withdrawal date, if recorded.
    pub date: Option<DateTime<Utc>>,
    /// The individual payouts; each becomes its own ledger.
    pub payments: Vec<Payment>,
}

/// A capital injection as stored by the external document layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalDocument {
    /// Document id.
    pub id: DocumentId,
    /// Human-readable code.
    pub code: String,
    /// The tenant, if recorded.
    pub store_id: Option<StoreId>,
    /// The investor.
    pub investor: PartySpec,
    /// The injection date, if recorded.
    pub date: Option<DateTime<Utc>>,
    /// The injected amount, if recorded.
    pub amount: Option<Decimal>,
    /// How the capital was received.
    pub payment_method: String,
}

/// Any business document the engine accounts for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Document {
    /// A sales order.
    Sale(SaleDocument),
    /// A sales return.
    SalesReturn(SalesReturnDocument),
    /// A customer deposit.
    Deposit(DepositDocument),
    /// A customer withdrawal.
    Withdrawal(WithdrawalDocument),
    /// A capital injection.
    Capital(CapitalDocument),
}

impl Document {
    /// The document kind.
    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Sale(_) => DocumentKind::Sales,
            Self::SalesReturn(_) => DocumentKind::SalesReturn,
            Self::Deposit(_) => DocumentKind::CustomerDeposit,
            Self::Withdrawal(_) => DocumentKind::CustomerWithdrawal,
            Self::Capital(_) => DocumentKind::Capital,
        }
    }

    /// The document's id (the ledger reference).
    #[must_use]
    pub fn reference_id(&self) -> DocumentId {
        match self {
            Self::Sale(d) => d.id,
            Self::SalesReturn(d) => d.id,
            Self::Deposit(d) => d.id,
            Self::Withdrawal(d) => d.id,
            Self::Capital(d) => d.id,
        }
    }

    /// The tenant, when recorded on the document.
    #[must_use]
    pub fn store_id(&self) -> Option<StoreId> {
        match self {
            Self::Sale(d) => d.store_id,
            Self::SalesReturn(d) => d.store_id,
            Self::Deposit(d) => d.store_id,
            Self::Withdrawal(d) => d.store_id,
            Self::Capital(d) => d.store_id,
        }
    }
}
