//! Journal line domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tillbook_shared::{round_money, AccountId};

use crate::account::Account;

/// Which side of the ledger a line sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Debit line.
    Debit,
    /// Credit line.
    Credit,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debit => write!(f, "debit"),
            Self::Credit => write!(f, "credit"),
        }
    }
}

/// A lightweight account handle carried on journal lines.
///
/// Number and name are denormalized at write time for offline reporting and
/// never rewritten when the account is renamed later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
    /// The account id.
    pub id: AccountId,
    /// The per-store account number.
    pub number: i64,
    /// The account name at write time.
    pub name: String,
}

impl From<&Account> for AccountRef {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            number: account.number,
            name: account.name.clone(),
        }
    }
}

/// One debit or credit line inside a ledger.
///
/// Exactly one of `debit`/`credit` is non-zero. Lines that balance each
/// other share a `group_id`; the posting projector pairs lines only within
/// their group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalLine {
    /// Effect date of the line.
    pub date: DateTime<Utc>,
    /// The account the line posts to.
    pub account_id: AccountId,
    /// Denormalized per-store account number.
    pub account_number: i64,
    /// Denormalized account name at write time.
    pub account_name: String,
    /// Debit or credit marker.
    #[serde(rename = "debit_or_credit")]
    pub side: Side,
    /// Debit amount (zero for credit lines), rounded.
    pub debit: Decimal,
    /// Credit amount (zero for debit lines), rounded.
    pub credit: Decimal,
    /// The balancing bundle this line belongs to, sequential per ledger.
    pub group_id: i32,
}

impl JournalLine {
    /// Creates a debit line with the amount rounded to 2 decimals.
    #[must_use]
    pub fn debit(date: DateTime<Utc>, account: &AccountRef, amount: Decimal, group_id: i32) -> Self {
        Self {
            date,
            account_id: account.id,
            account_number: account.number,
            account_name: account.name.clone(),
            side: Side::Debit,
            debit: round_money(amount),
            credit: Decimal::ZERO,
            group_id,
        }
    }

    /// Creates a credit line with the amount rounded to 2 decimals.
    #[must_use]
    pub fn credit(
        date: DateTime<Utc>,
        account: &AccountRef,
        amount: Decimal,
        group_id: i32,
    ) -> Self {
        Self {
            date,
            account_id: account.id,
            account_number: account.number,
            account_name: account.name.clone(),
            side: Side::Credit,
            debit: Decimal::ZERO,
            credit: round_money(amount),
            group_id,
        }
    }

    /// The line's single non-zero amount.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        match self.side {
            Side::Debit => self.debit,
            Side::Credit => self.credit,
        }
    }
}
