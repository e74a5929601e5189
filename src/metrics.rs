//! Financial metrics derived from the current transaction snapshot.
//!
//! Everything here is a pure function of its inputs. Metrics are recomputed
//! from the whole snapshot on every change rather than updated incrementally,
//! so they always match the latest state exactly.

use serde::Serialize;

use crate::models::{Transaction, TransactionType};

/// Income, expense and balance totals over a set of transactions.
///
/// `balance` is always `income - expense`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    /// The sum of all income amounts.
    pub income: f64,
    /// The sum of all expense amounts.
    pub expense: f64,
    /// Income minus expenses.
    pub balance: f64,
}

/// Sums the income and expense amounts of `transactions`.
///
/// # Returns
/// The totals, all zero for an empty slice.
pub fn compute_totals(transactions: &[Transaction]) -> Totals {
    let (income, expense) =
        transactions
            .iter()
            .fold((0.0, 0.0), |(income, expense), transaction| {
                match transaction.kind {
                    TransactionType::Income => (income + transaction.amount, expense),
                    TransactionType::Expense => (income, expense + transaction.amount),
                }
            });

    Totals {
        income,
        expense,
        balance: income - expense,
    }
}

/// Whether spending has gone past the budget.
///
/// A budget of zero means no budget has been set, which never raises the alert.
pub fn is_over_budget(expense: f64, budget: f64) -> bool {
    budget > 0.0 && expense > budget
}

/// Sums expenses by category.
///
/// # Returns
/// Vector of (category, total) pairs in the order each category first
/// appears in `transactions`. Income is ignored.
pub fn expenses_by_category(transactions: &[Transaction]) -> Vec<(String, f64)> {
    let mut totals: Vec<(String, f64)> = Vec::new();

    for transaction in transactions.iter().filter(|t| !t.is_income()) {
        match totals
            .iter_mut()
            .find(|(category, _)| *category == transaction.category)
        {
            Some((_, total)) => *total += transaction.amount,
            None => totals.push((transaction.category.clone(), transaction.amount)),
        }
    }

    totals
}

/// The two bars of the income vs expense chart.
pub fn income_vs_expense(totals: &Totals) -> [(&'static str, f64); 2] {
    [("Income", totals.income), ("Expense", totals.expense)]
}
