//! The per-user budget and monthly income records.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::UserID;

/// The amount a user plans to spend in a month.
///
/// A user is expected to have at most one budget document. No document is
/// treated the same as a budget of zero, which disables the over-budget alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// The ID of the budget's document in the store.
    pub id: String,
    /// The user the budget belongs to.
    pub user_id: UserID,
    /// The budgeted amount.
    pub amount: f64,
}

/// A monthly income target entered by the user.
///
/// Users may append several entries. Only the first entry of the latest
/// snapshot is shown as the current monthly income.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyIncomeEntry {
    /// The ID of the entry's document in the store.
    pub id: String,
    /// The user the entry belongs to.
    pub user_id: UserID,
    /// The expected monthly income.
    pub amount: f64,
    /// When the entry was created.
    pub created_at: Option<OffsetDateTime>,
}
