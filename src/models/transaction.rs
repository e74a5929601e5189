//! This file defines the type `Transaction`, the core type of the budgeting part of the
//! application.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::UserID;

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
}

impl TransactionType {
    /// The name used for the type in documents and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// Transactions are owned by the document store. The core only ever holds
/// read-only snapshots of them; see [crate::record::parse_transaction] for how
/// raw documents are normalized into this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction's document in the store.
    pub id: String,
    /// The user that recorded the transaction.
    pub user_id: UserID,
    /// Whether the transaction is income or an expense.
    pub kind: TransactionType,
    /// The amount of money earned or spent. Always a finite number.
    pub amount: f64,
    /// A free-form category, e.g. "Food".
    pub category: String,
    /// A short name for the transaction.
    pub label: String,
    /// When the transaction happened, if the record had a readable date.
    pub date: Option<Date>,
    /// An optional note. Never `Some("")`.
    pub note: Option<String>,
    /// When the record was created. `None` while a server timestamp is pending.
    pub created_at: Option<OffsetDateTime>,
    /// When the record was last edited.
    pub updated_at: Option<OffsetDateTime>,
}

impl Transaction {
    /// Create a transaction with empty text fields and no dates.
    ///
    /// Mostly useful for tests and fixtures, the store is the usual source of
    /// transactions.
    pub fn build(kind: TransactionType, amount: f64) -> Self {
        Self {
            id: String::new(),
            user_id: UserID::new(""),
            kind,
            amount,
            category: String::new(),
            label: String::new(),
            date: None,
            note: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Set the category.
    pub fn category(mut self, category: &str) -> Self {
        self.category = category.to_owned();
        self
    }

    /// Set the date.
    pub fn date(mut self, date: Date) -> Self {
        self.date = Some(date);
        self
    }

    /// Set the note. An empty note is stored as no note.
    pub fn note(mut self, note: &str) -> Self {
        self.note = (!note.is_empty()).then(|| note.to_owned());
        self
    }

    /// Whether the transaction is income.
    pub fn is_income(&self) -> bool {
        self.kind == TransactionType::Income
    }
}

#[cfg(test)]
mod tests {
    use super::{Transaction, TransactionType};

    #[test]
    fn empty_note_is_none() {
        let transaction = Transaction::build(TransactionType::Expense, 1.0).note("");

        assert_eq!(transaction.note, None);
    }

    #[test]
    fn type_names_are_lowercase() {
        assert_eq!(TransactionType::Income.to_string(), "income");
        assert_eq!(TransactionType::Expense.to_string(), "expense");
    }
}
