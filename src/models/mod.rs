//! This module defines the domain data types.

pub use budget::{Budget, MonthlyIncomeEntry};
pub use transaction::{Transaction, TransactionType};

mod budget;
mod transaction;
