//! Per-kind document adapters.
//!
//! Adapters read external document state, check the fields the engine cannot
//! work without, and emit the uniform `DocumentDescription` shape. A customer
//! withdrawal emits one description per payment so that each payout gets its
//! own ledger.

use rust_decimal::Decimal;
use tillbook_shared::round_money;

use crate::document::{
    CapitalDocument, DepositDocument, Document, DocumentDescription, DocumentKind, Payment,
    SaleDocument, SalesReturnDocument, WithdrawalDocument,
};
use crate::error::EngineError;

/// Converts a document into the description(s) the journal builder consumes.
///
/// # Errors
///
/// Returns `MissingField` when the document lacks `store_id`, `date`, or the
/// numeric total the kind requires. Fatal; nothing is written.
pub fn describe(document: &Document) -> Result<Vec<DocumentDescription>, EngineError> {
    match document {
        Document::Sale(doc) => describe_sale(doc),
        Document::SalesReturn(doc) => describe_sales_return(doc),
        Document::Deposit(doc) => describe_deposit(doc),
        Document::Withdrawal(doc) => describe_withdrawal(doc),
        Document::Capital(doc) => describe_capital(doc),
    }
}

fn missing(kind: DocumentKind, field: &'static str) -> EngineError {
    EngineError::MissingField { kind, field }
}

fn describe_sale(doc: &SaleDocument) -> Result<Vec<DocumentDescription>, EngineError> {
    let kind = DocumentKind::Sales;
    let store_id = doc.store_id.ok_or_else(|| missing(kind, "store_id"))?;
    let date = doc.date.ok_or_else(|| missing(kind, "date"))?;
    let net_total = doc.net_total.ok_or_else(|| missing(kind, "net_total"))?;

    Ok(vec![DocumentDescription {
        kind,
        store_id,
        reference_id: doc.id,
        reference_code: doc.code.clone(),
        date,
        net_total: round_money(net_total),
        cash_discount: round_money(doc.cash_discount),
        party: doc.customer.clone(),
        payments: doc.payments.clone(),
    }])
}

fn describe_sales_return(
    doc: &SalesReturnDocument,
) -> Result<Vec<DocumentDescription>, EngineError> {
    let kind = DocumentKind::SalesReturn;
    let store_id = doc.store_id.ok_or_else(|| missing(kind, "store_id"))?;
    let date = doc.date.ok_or_else(|| missing(kind, "date"))?;
    let net_total = doc.net_total.ok_or_else(|| missing(kind, "net_total"))?;

    Ok(vec![DocumentDescription {
        kind,
        store_id,
        reference_id: doc.id,
        reference_code: doc.code.clone(),
        date,
        net_total: round_money(net_total),
        cash_discount: round_money(doc.cash_discount),
        party: doc.customer.clone(),
        payments: doc.payments.clone(),
    }])
}

fn describe_deposit(doc: &DepositDocument) -> Result<Vec<DocumentDescription>, EngineError> {
    let kind = DocumentKind::CustomerDeposit;
    let store_id = doc.store_id.ok_or_else(|| missing(kind, "store_id"))?;
    let date = doc.date.ok_or_else(|| missing(kind, "date"))?;
    let amount = doc.amount.ok_or_else(|| missing(kind, "amount"))?;

    Ok(vec![DocumentDescription {
        kind,
        store_id,
        reference_id: doc.id,
        reference_code: doc.code.clone(),
        date,
        net_total: round_money(amount),
        cash_discount: Decimal::ZERO,
        party: doc.customer.clone(),
        payments: vec![Payment::new(date, amount, doc.payment_method.clone())],
    }])
}

fn describe_capital(doc: &CapitalDocument) -> Result<Vec<DocumentDescription>, EngineError> {
    let kind = DocumentKind::Capital;
    let store_id = doc.store_id.ok_or_else(|| missing(kind, "store_id"))?;
    let date = doc.date.ok_or_else(|| missing(kind, "date"))?;
    let amount = doc.amount.ok_or_else(|| missing(kind, "amount"))?;

    Ok(vec![DocumentDescription {
        kind,
        store_id,
        reference_id: doc.id,
        reference_code: doc.code.clone(),
        date,
        net_total: round_money(amount),
        cash_discount: Decimal::ZERO,
        party: doc.investor.clone(),
        payments: vec![Payment::new(date, amount, doc.payment_method.clone())],
    }])
}

fn describe_withdrawal(doc: &WithdrawalDocument) -> Result<Vec<DocumentDescription>, EngineError> {
    let kind = DocumentKind::CustomerWithdrawal;
    let store_id = doc.store_id.ok_or_else(|| missing(kind, "store_id"))?;
    let date = doc.date.ok_or_else(|| missing(kind, "date"))?;

    // One ledger per payout.
    Ok(doc
        .payments
        .iter()
        .map(|payment| DocumentDescription {
            kind,
            store_id,
            reference_id: doc.id,
            reference_code: doc.code.clone(),
            date,
            net_total: payment.amount,
            cash_discount: Decimal::ZERO,
            party: doc.customer.clone(),
            payments: vec![payment.clone()],
        })
        .collect())
}
