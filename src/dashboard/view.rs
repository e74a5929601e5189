//! A serializable snapshot of the dashboard state.

use serde::Serialize;

use crate::{UserID, metrics::Totals};

/// Where the dashboard is in its life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardPhase {
    /// Nobody is signed in. There are no subscriptions and all values are zero.
    Unauthenticated,
    /// A user is signed in but no snapshot has arrived yet.
    Loading,
    /// At least one snapshot has arrived for the signed in user.
    Live,
}

/// What the dashboard currently shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    /// The life cycle phase.
    pub phase: DashboardPhase,
    /// The signed in user.
    pub user: Option<UserID>,
    /// Income, expense and balance over all transactions.
    pub totals: Totals,
    /// The monthly budget, zero if none is set.
    pub budget: f64,
    /// The current monthly income, zero if none is entered.
    pub monthly_income: f64,
    /// Whether expenses exceed a non-zero budget.
    pub over_budget: bool,
    /// How many transactions the snapshot holds.
    pub transaction_count: usize,
    /// Whether there is anything to export.
    pub can_export: bool,
}

impl DashboardView {
    /// The view shown while nobody is signed in.
    pub fn signed_out() -> Self {
        Self {
            phase: DashboardPhase::Unauthenticated,
            user: None,
            totals: Totals::default(),
            budget: 0.0,
            monthly_income: 0.0,
            over_budget: false,
            transaction_count: 0,
            can_export: false,
        }
    }
}
