//! Initial database migration.
//!
//! Creates the chart of accounts, ledger, and posting tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(LEDGERS_SQL).await?;
        db.execute_unprepared(JOURNAL_LINES_SQL).await?;
        db.execute_unprepared(POSTINGS_SQL).await?;
        db.execute_unprepared(POSTING_LINES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    store_id UUID NOT NULL,
    reference_id UUID,
    reference_model TEXT,
    account_type TEXT NOT NULL,
    number BIGINT NOT NULL,
    name TEXT NOT NULL,
    phone TEXT,
    balance NUMERIC(19, 2) NOT NULL DEFAULT 0,
    debit_total NUMERIC(19, 2) NOT NULL DEFAULT 0,
    credit_total NUMERIC(19, 2) NOT NULL DEFAULT 0,
    open BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

-- Party accounts are keyed by (store_id, reference_id); named system
-- accounts by (store_id, name) with no reference.
CREATE UNIQUE INDEX idx_accounts_store_reference
    ON accounts (store_id, reference_id)
    WHERE reference_id IS NOT NULL;
CREATE UNIQUE INDEX idx_accounts_store_name
    ON accounts (store_id, name)
    WHERE reference_id IS NULL;
CREATE UNIQUE INDEX idx_accounts_store_number ON accounts (store_id, number);
";

const LEDGERS_SQL: &str = r"
CREATE TABLE ledgers (
    id UUID PRIMARY KEY,
    store_id UUID NOT NULL,
    reference_id UUID NOT NULL,
    reference_model TEXT NOT NULL,
    reference_code TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

-- Not unique: customer withdrawals write one ledger per payout.
CREATE INDEX idx_ledgers_store_reference ON ledgers (store_id, reference_id);
";

const JOURNAL_LINES_SQL: &str = r"
CREATE TABLE journal_lines (
    id UUID PRIMARY KEY,
    ledger_id UUID NOT NULL REFERENCES ledgers (id) ON DELETE CASCADE,
    line_index INTEGER NOT NULL,
    date TIMESTAMPTZ NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts (id),
    account_number BIGINT NOT NULL,
    account_name TEXT NOT NULL,
    debit_or_credit TEXT NOT NULL CHECK (debit_or_credit IN ('debit', 'credit')),
    debit NUMERIC(19, 2) NOT NULL DEFAULT 0,
    credit NUMERIC(19, 2) NOT NULL DEFAULT 0,
    group_id INTEGER NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    UNIQUE (ledger_id, line_index)
);

CREATE INDEX idx_journal_lines_ledger ON journal_lines (ledger_id);
CREATE INDEX idx_journal_lines_account ON journal_lines (account_id);
";

const POSTINGS_SQL: &str = r"
CREATE TABLE postings (
    id UUID PRIMARY KEY,
    date TIMESTAMPTZ NOT NULL,
    store_id UUID NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts (id),
    account_number BIGINT NOT NULL,
    account_name TEXT NOT NULL,
    reference_id UUID NOT NULL,
    reference_model TEXT NOT NULL,
    reference_code TEXT NOT NULL,
    debit_total NUMERIC(19, 2) NOT NULL DEFAULT 0,
    credit_total NUMERIC(19, 2) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX idx_postings_account ON postings (account_id);
CREATE INDEX idx_postings_store_reference ON postings (store_id, reference_id);
";

const POSTING_LINES_SQL: &str = r"
CREATE TABLE posting_lines (
    id UUID PRIMARY KEY,
    posting_id UUID NOT NULL REFERENCES postings (id) ON DELETE CASCADE,
    line_index INTEGER NOT NULL,
    date TIMESTAMPTZ NOT NULL,
    account_id UUID NOT NULL,
    account_number BIGINT NOT NULL,
    account_name TEXT NOT NULL,
    debit_or_credit TEXT NOT NULL CHECK (debit_or_credit IN ('debit', 'credit')),
    debit NUMERIC(19, 2) NOT NULL DEFAULT 0,
    credit NUMERIC(19, 2) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    UNIQUE (posting_id, line_index)
);

CREATE INDEX idx_posting_lines_posting ON posting_lines (posting_id);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS posting_lines;
DROP TABLE IF EXISTS postings;
DROP TABLE IF EXISTS journal_lines;
DROP TABLE IF EXISTS ledgers;
DROP TABLE IF EXISTS accounts;
";
