//! Dashboard module
//!
//! Drives the live financial overview of the signed in user: keeps the
//! transaction, budget and monthly income snapshots current, derives the
//! totals and budget alert from them and exports reports on request.

mod controller;
mod view;

pub use controller::Dashboard;
pub use view::{DashboardPhase, DashboardView};
