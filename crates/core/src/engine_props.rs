//! Property-based tests for the redo coordinator.
//!
//! - Every persisted ledger balances per bundle and globally.
//! - Account aggregates equal the sums of the account's postings.
//! - `balance = |debit_total - credit_total|`; `open <=> balance != 0`.
//! - Customer type follows the sign of `debit_total - credit_total`.
//! - `redo` is idempotent; `undo` after `redo` is history-neutral.
//! - Per-store conservation: `sum(debit_total - credit_total) = 0`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tillbook_shared::{DocumentId, EngineConfig, StoreId};

use crate::account::{Account, AccountType, PartyModel};
use crate::document::{
    CapitalDocument, DepositDocument, Document, PartySpec, Payment, SaleDocument,
    SalesReturnDocument, WithdrawalDocument,
};
use crate::engine::PostingEngine;
use crate::store::{AccountStore, MemoryStore, PostingStore};

fn base_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

/// Monetary amounts from 0.01 to 10,000.00.
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn method_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("cash".to_string()),
        Just("bank_account".to_string()),
        Just("bank_card".to_string()),
    ]
}

/// (day offset, amount, method) triples for payments.
fn payment_strategy() -> impl Strategy<Value = (i64, Decimal, String)> {
    (0i64..10, amount_strategy(), method_strategy())
}

#[derive(Debug, Clone)]
enum DocumentShape {
    Sale {
        net_cents: i64,
        discount_cents: i64,
        payments: Vec<(i64, Decimal, String)>,
    },
    SalesReturn {
        net_cents: i64,
        discount_cents: i64,
        payments: Vec<(i64, Decimal, String)>,
    },
    Deposit {
        amount: Decimal,
        method: String,
    },
    Withdrawal {
        payments: Vec<(i64, Decimal, String)>,
    },
    Capital {
        amount: Decimal,
        method: String,
    },
}

fn sale_shape() -> impl Strategy<Value = DocumentShape> {
    (
        200_000i64..1_000_000,
        0i64..50_000,
        prop::collection::vec(payment_strategy(), 0..3),
    )
        .prop_map(|(net_cents, discount_cents, mut payments)| {
            // Keep the paid total within the amount due; a sale overpaid at
            // sale time is rejected by the builder.
            let due = net_cents - discount_cents;
            let mut remaining = due;
            for payment in &mut payments {
                let cents = (payment.1.mantissa() as i64).min(remaining).max(0);
                payment.1 = Decimal::new(cents, 2);
                remaining -= cents;
            }
            payments.retain(|p| p.1 > Decimal::ZERO);
            DocumentShape::Sale {
                net_cents,
                discount_cents,
                payments,
            }
        })
}

fn sales_return_shape() -> impl Strategy<Value = DocumentShape> {
    (
        100_000i64..500_000,
        0i64..20_000,
        prop::collection::vec(payment_strategy(), 0..3),
    )
        .prop_map(|(net_cents, discount_cents, payments)| DocumentShape::SalesReturn {
            net_cents,
            discount_cents,
            payments,
        })
}

fn document_shape() -> impl Strategy<Value = DocumentShape> {
    prop_oneof![
        sale_shape(),
        sales_return_shape(),
        (amount_strategy(), method_strategy())
            .prop_map(|(amount, method)| DocumentShape::Deposit { amount, method }),
        prop::collection::vec(payment_strategy(), 1..3)
            .prop_map(|payments| DocumentShape::Withdrawal { payments }),
        (amount_strategy(), method_strategy())
            .prop_map(|(amount, method)| DocumentShape::Capital { amount, method }),
    ]
}

/// A fixed pool of parties so generated documents share accounts.
fn party(index: usize) -> PartySpec {
    let ids = [
        "00000000-0000-7000-8000-000000000001",
        "00000000-0000-7000-8000-000000000002",
        "00000000-0000-7000-8000-000000000003",
    ];
    let names = ["Alice", "Bob", "Ivy"];
    let model = if index == 2 {
        PartyModel::Investor
    } else {
        PartyModel::Customer
    };
    PartySpec {
        id: ids[index].parse().unwrap(),
        model,
        name: names[index].to_string(),
        phone: None,
    }
}

fn realize(shape: &DocumentShape, party_index: usize) -> Document {
    let date = base_date();
    let to_payments = |raw: &[(i64, Decimal, String)]| -> Vec<Payment> {
        raw.iter()
            .map(|(offset, amount, method)| {
                Payment::new(date + Duration::days(*offset), *amount, method.clone())
            })
            .collect()
    };
    match shape {
        DocumentShape::Sale {
            net_cents,
            discount_cents,
            payments,
        } => Document::Sale(SaleDocument {
            id: DocumentId::new(),
            code: "SO-GEN".to_string(),
            store_id: None, // assigned by the caller
            customer: party(party_index.min(1)),
            date: Some(date),
            net_total: Some(Decimal::new(*net_cents, 2)),
            cash_discount: Decimal::new(*discount_cents, 2),
            discount: Decimal::ZERO,
            payments: to_payments(payments),
        }),
        DocumentShape::SalesReturn {
            net_cents,
            discount_cents,
            payments,
        } => Document::SalesReturn(SalesReturnDocument {
            id: DocumentId::new(),
            code: "SR-GEN".to_string(),
            store_id: None,
            customer: party(party_index.min(1)),
            date: Some(date),
            net_total: Some(Decimal::new(*net_cents, 2)),
            cash_discount: Decimal::new(*discount_cents, 2),
            discount: Decimal::ZERO,
            payments: to_payments(payments),
        }),
        DocumentShape::Deposit { amount, method } => Document::Deposit(DepositDocument {
            id: DocumentId::new(),
            code: "CD-GEN".to_string(),
            store_id: None,
            customer: party(party_index.min(1)),
            date: Some(date),
            amount: Some(*amount),
            payment_method: method.clone(),
        }),
        DocumentShape::Withdrawal { payments } => Document::Withdrawal(WithdrawalDocument {
            id: DocumentId::new(),
            code: "CW-GEN".to_string(),
            store_id: None,
            customer: party(party_index.min(1)),
            date: Some(date),
            payments: to_payments(payments),
        }),
        DocumentShape::Capital { amount, method } => Document::Capital(CapitalDocument {
            id: DocumentId::new(),
            code: "CAP-GEN".to_string(),
            store_id: None,
            investor: party(2),
            date: Some(date),
            amount: Some(*amount),
            payment_method: method.clone(),
        }),
    }
}

fn with_store(document: Document, store_id: StoreId) -> Document {
    match document {
        Document::Sale(mut d) => {
            d.store_id = Some(store_id);
            Document::Sale(d)
        }
        Document::SalesReturn(mut d) => {
            d.store_id = Some(store_id);
            Document::SalesReturn(d)
        }
        Document::Deposit(mut d) => {
            d.store_id = Some(store_id);
            Document::Deposit(d)
        }
        Document::Withdrawal(mut d) => {
            d.store_id = Some(store_id);
            Document::Withdrawal(d)
        }
        Document::Capital(mut d) => {
            d.store_id = Some(store_id);
            Document::Capital(d)
        }
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime")
}

async fn check_invariants(
    store: &Arc<MemoryStore>,
    store_id: StoreId,
) -> Result<(), TestCaseError> {
    let accounts = store.list_by_store(store_id).await.unwrap();
    let mut net = Decimal::ZERO;
    for account in &accounts {
        let (debit_sum, credit_sum) = store.totals_for_account(account.id).await.unwrap();
        prop_assert_eq!(
            account.debit_total,
            debit_sum,
            "debit aggregate of {}",
            account.name
        );
        prop_assert_eq!(
            account.credit_total,
            credit_sum,
            "credit aggregate of {}",
            account.name
        );
        prop_assert_eq!(
            account.balance,
            (account.debit_total - account.credit_total).abs()
        );
        prop_assert_eq!(account.open, !account.balance.is_zero());
        if account.is_customer() {
            let expected = if account.debit_total > account.credit_total {
                AccountType::Asset
            } else if account.credit_total > account.debit_total {
                AccountType::Liability
            } else {
                AccountType::Closed
            };
            prop_assert_eq!(account.account_type, expected);
        }
        net += account.debit_total - account.credit_total;
    }
    prop_assert_eq!(net, Decimal::ZERO, "chart-of-accounts conservation");
    Ok(())
}

fn aggregates(accounts: &[Account]) -> BTreeMap<String, (Decimal, Decimal, Decimal, bool)> {
    accounts
        .iter()
        .map(|account| {
            (
                account.name.clone(),
                (
                    account.debit_total,
                    account.credit_total,
                    account.balance,
                    account.open,
                ),
            )
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every redone document leaves balanced ledgers and consistent
    /// aggregates behind, whatever the payment shape.
    #[test]
    fn prop_redo_preserves_invariants(
        shapes in prop::collection::vec((document_shape(), 0usize..2), 1..4),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let store = Arc::new(MemoryStore::new());
            let engine = PostingEngine::new(
                store.clone(),
                store.clone(),
                store.clone(),
                EngineConfig::default(),
            );
            let store_id = StoreId::new();

            for (shape, party_index) in &shapes {
                let document = with_store(realize(shape, *party_index), store_id);
                let ledgers = engine.redo(&document).await.unwrap();

                for ledger in &ledgers {
                    prop_assert!(ledger.validate_balanced().is_ok());
                    let mut groups: HashMap<i32, (Decimal, Decimal)> = HashMap::new();
                    let mut total = (Decimal::ZERO, Decimal::ZERO);
                    for line in &ledger.journals {
                        let entry = groups.entry(line.group_id).or_default();
                        entry.0 += line.debit;
                        entry.1 += line.credit;
                        total.0 += line.debit;
                        total.1 += line.credit;
                    }
                    for (group, (debits, credits)) in groups {
                        prop_assert_eq!(debits, credits, "group {} balance", group);
                    }
                    prop_assert_eq!(total.0, total.1, "whole-ledger balance");
                }
            }
            check_invariants(&store, store_id).await
        })?;
    }

    /// `redo(d); redo(d)` yields identical journal content and identical
    /// account aggregates.
    #[test]
    fn prop_redo_is_idempotent(
        shape in document_shape(),
        party_index in 0usize..2,
    ) {
        let rt = runtime();
        rt.block_on(async {
            let store = Arc::new(MemoryStore::new());
            let engine = PostingEngine::new(
                store.clone(),
                store.clone(),
                store.clone(),
                EngineConfig::default(),
            );
            let store_id = StoreId::new();
            let document = with_store(realize(&shape, party_index), store_id);

            let first = engine.redo(&document).await.unwrap();
            let accounts_first = aggregates(&store.list_by_store(store_id).await.unwrap());

            let second = engine.redo(&document).await.unwrap();
            let accounts_second = aggregates(&store.list_by_store(store_id).await.unwrap());

            prop_assert_eq!(first.len(), second.len());
            for (a, b) in first.iter().zip(&second) {
                prop_assert_eq!(&a.journals, &b.journals);
            }
            prop_assert_eq!(accounts_first, accounts_second);
            prop_assert_eq!(store.ledger_count().await, first.len());
            Ok(())
        })?;
    }

    /// `redo(d)` followed by `undo(d)` restores every touched account to its
    /// prior aggregates; the engine is history-neutral per document.
    #[test]
    fn prop_undo_is_history_neutral(
        warmup in document_shape(),
        shape in document_shape(),
        party_index in 0usize..2,
    ) {
        let rt = runtime();
        rt.block_on(async {
            let store = Arc::new(MemoryStore::new());
            let engine = PostingEngine::new(
                store.clone(),
                store.clone(),
                store.clone(),
                EngineConfig::default(),
            );
            let store_id = StoreId::new();

            // Some unrelated history so undo has survivors to recompute
            // against.
            let warmup_doc = with_store(realize(&warmup, 0), store_id);
            engine.redo(&warmup_doc).await.unwrap();

            let before = aggregates(&store.list_by_store(store_id).await.unwrap());
            let ledger_count_before = store.ledger_count().await;
            let posting_count_before = store.posting_count().await;

            let document = with_store(realize(&shape, party_index), store_id);
            engine.redo(&document).await.unwrap();
            engine.undo(document.reference_id(), store_id).await.unwrap();

            let after = aggregates(&store.list_by_store(store_id).await.unwrap());
            for (name, values) in &before {
                prop_assert_eq!(after.get(name), Some(values), "account {}", name);
            }
            // Accounts created by the undone document remain, but at zero.
            for (name, (debit, credit, balance, open)) in &after {
                if !before.contains_key(name) {
                    prop_assert_eq!(*debit, Decimal::ZERO, "new account {}", name);
                    prop_assert_eq!(*credit, Decimal::ZERO, "new account {}", name);
                    prop_assert_eq!(*balance, Decimal::ZERO, "new account {}", name);
                    prop_assert!(!open, "new account {} must be closed", name);
                }
            }
            prop_assert_eq!(store.ledger_count().await, ledger_count_before);
            prop_assert_eq!(store.posting_count().await, posting_count_before);
            check_invariants(&store, store_id).await
        })?;
    }
}
