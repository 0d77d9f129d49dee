//! Per-account projections of a ledger.
//!
//! A posting views one ledger from a single account's side: its `posts[]`
//! name the counterparty lines that balanced the account's own lines, and
//! its totals feed the account's recomputed aggregates.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tillbook_shared::{round_money, AccountId, DocumentId, PostingId, StoreId};

use crate::journal::line::{JournalLine, Side};
use crate::ledger::Ledger;

/// One paired counterparty contribution inside a posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterpartyPost {
    /// Effect date of the counterparty line.
    pub date: DateTime<Utc>,
    /// The counterparty account.
    pub account_id: AccountId,
    /// Denormalized counterparty account number.
    pub account_number: i64,
    /// Denormalized counterparty account name.
    pub account_name: String,
    /// Which side the counterparty line sat on.
    #[serde(rename = "debit_or_credit")]
    pub side: Side,
    /// Paired debit amount (zero when the counterparty credited).
    pub debit: Decimal,
    /// Paired credit amount (zero when the counterparty debited).
    pub credit: Decimal,
}

/// A ledger projected from one account's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    /// Unique identifier.
    pub id: PostingId,
    /// Effect date (the account's first line in the ledger).
    pub date: DateTime<Utc>,
    /// The tenant.
    pub store_id: StoreId,
    /// The account this posting belongs to.
    pub account_id: AccountId,
    /// Denormalized account number.
    pub account_number: i64,
    /// Denormalized account name.
    pub account_name: String,
    /// The source document's id.
    pub reference_id: DocumentId,
    /// The source document's kind tag.
    pub reference_model: String,
    /// The source document's human-readable code.
    pub reference_code: String,
    /// The paired counterparty contributions.
    pub posts: Vec<CounterpartyPost>,
    /// Sum of the account's paired debits, rounded.
    pub debit_total: Decimal,
    /// Sum of the account's paired credits, rounded.
    pub credit_total: Decimal,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Projects a ledger into one posting per distinct account.
///
/// For each account line `x` and each other-account line `y` within the same
/// bundle: a debit `x` pairs with credit `y` for `min(x.debit, y.credit)`
/// accumulated into the posting's `debit_total` (and vice versa). Same-side
/// pairs contribute nothing, and bundle boundaries prevent cross-bundle
/// pairing. Accounts appearing in several bundles still get a single posting
/// accumulated across all of them.
#[must_use]
pub fn project(ledger: &Ledger, now: DateTime<Utc>) -> Vec<Posting> {
    ledger
        .account_ids()
        .into_iter()
        .map(|account_id| project_account(ledger, account_id, now))
        .collect()
}

fn project_account(ledger: &Ledger, account_id: AccountId, now: DateTime<Utc>) -> Posting {
    let own_lines: Vec<&JournalLine> = ledger
        .journals
        .iter()
        .filter(|line| line.account_id == account_id)
        .collect();
    // account_ids() only yields accounts that appear in the journals.
    let first = own_lines[0];

    let mut posts = Vec::new();
    let mut debit_total = Decimal::ZERO;
    let mut credit_total = Decimal::ZERO;

    for x in &own_lines {
        for y in &ledger.journals {
            if y.group_id != x.group_id || y.account_id == account_id {
                continue;
            }
            if x.debit > Decimal::ZERO && y.credit > Decimal::ZERO {
                let amount = x.debit.min(y.credit);
                posts.push(CounterpartyPost {
                    date: y.date,
                    account_id: y.account_id,
                    account_number: y.account_number,
                    account_name: y.account_name.clone(),
                    side: Side::Credit,
                    debit: Decimal::ZERO,
                    credit: amount,
                });
                debit_total += amount;
            } else if x.credit > Decimal::ZERO && y.debit > Decimal::ZERO {
                let amount = x.credit.min(y.debit);
                posts.push(CounterpartyPost {
                    date: y.date,
                    account_id: y.account_id,
                    account_number: y.account_number,
                    account_name: y.account_name.clone(),
                    side: Side::Debit,
                    debit: amount,
                    credit: Decimal::ZERO,
                });
                credit_total += amount;
            }
            // Same-side pairs contribute nothing.
        }
    }

    Posting {
        id: PostingId::new(),
        date: first.date,
        store_id: ledger.store_id,
        account_id,
        account_number: first.account_number,
        account_name: first.account_name.clone(),
        reference_id: ledger.reference_id,
        reference_model: ledger.reference_model.clone(),
        reference_code: ledger.reference_code.clone(),
        posts,
        debit_total: round_money(debit_total),
        credit_total: round_money(credit_total),
        created_at: now,
        updated_at: now,
    }
}
