//! `SeaORM` entity definitions.

pub mod accounts;
pub mod journal_lines;
pub mod ledgers;
pub mod posting_lines;
pub mod postings;
