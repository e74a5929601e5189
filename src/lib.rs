//! CashPilot is a personal finance tracker.
//!
//! This library is the core of the tracker: it keeps live, per-user views of
//! transactions, the monthly budget and monthly income in sync with a
//! document store, derives totals and the over-budget alert from them and
//! exports the current state as CSV and PDF reports.
//!
//! The [dashboard::Dashboard] ties these parts together. The document store,
//! the identity provider and the chart capture are traits so they can be
//! swapped out; [stores::sqlite::SQLiteDocumentStore], [identity::Session]
//! and [capture::EchartsCapturer] are the implementations shipped here.

#![warn(missing_docs)]

use tokio::signal;

pub mod capture;
pub mod charts;
pub mod config;
pub mod dashboard;
mod db;
mod error;
pub mod identity;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod record;
pub mod report;
pub mod stores;
pub mod sync;
mod timezone;
mod user;

#[cfg(test)]
mod test_utils;

pub use db::initialize as initialize_db;
pub use error::Error;
pub use timezone::{get_local_offset, local_today};
pub use user::UserID;

/// Wait for either the ctrl+c or terminate signal, whichever comes first.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::debug!("Received ctrl+c signal."),
        _ = terminate => tracing::debug!("Received terminate signal."),
    }
}
