//! Keeps live, per-user views of the transactions, budget and monthly income
//! collections.
//!
//! [LiveSync] owns one store subscription per collection for the signed in
//! user. Switching users closes every subscription of the previous user
//! before the new ones are opened, so snapshots of two users are never live
//! at the same time.

use std::sync::Arc;

use crate::{
    UserID,
    models::Transaction,
    record::{parse_budget, parse_monthly_income, parse_transaction},
    stores::{Collection, Document, DocumentStore, OrderBy, Query, Snapshot, Subscription},
};

/// The latest state of one of the synchronized collections.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncUpdate {
    /// The user's transactions, newest first.
    Transactions(Vec<Transaction>),
    /// The user's budget, zero if no budget has been set.
    Budget(f64),
    /// The user's current monthly income, zero if none has been entered.
    MonthlyIncome(f64),
}

/// A [SyncUpdate] tagged with the user whose subscription produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct UserUpdate {
    /// The user the data belongs to.
    pub user: UserID,
    /// The new state.
    pub update: SyncUpdate,
}

/// The open subscriptions of one user. A stream is `None` once the store has
/// ended it.
struct Feeds {
    user: UserID,
    transactions: Option<Subscription>,
    budget: Option<Subscription>,
    monthly_income: Option<Subscription>,
}

impl Feeds {
    fn is_closed(&self) -> bool {
        self.transactions.is_none() && self.budget.is_none() && self.monthly_income.is_none()
    }

    fn stream(&mut self, collection: Collection) -> &mut Option<Subscription> {
        match collection {
            Collection::Transactions => &mut self.transactions,
            Collection::Budgets => &mut self.budget,
            Collection::MonthlyIncome => &mut self.monthly_income,
        }
    }

    /// Turn a delivery from `collection` into an update.
    ///
    /// Errors and ended streams produce no update, which leaves consumers
    /// with the last good snapshot.
    fn handle(&mut self, collection: Collection, delivery: Option<Snapshot>) -> Option<UserUpdate> {
        let documents = match delivery {
            Some(Ok(documents)) => documents,
            Some(Err(error)) => {
                tracing::error!(
                    "{collection} listener error for user {}: {error}",
                    self.user
                );
                return None;
            }
            None => {
                tracing::warn!(
                    "{collection} subscription for user {} was ended by the store",
                    self.user
                );
                *self.stream(collection) = None;
                return None;
            }
        };

        tracing::debug!(
            "received {} {collection} for user {}",
            documents.len(),
            self.user
        );

        let update = match collection {
            Collection::Transactions => {
                SyncUpdate::Transactions(documents.iter().map(parse_transaction).collect())
            }
            Collection::Budgets => SyncUpdate::Budget(
                first_record(collection, &documents, parse_budget)
                    .map_or(0.0, |budget| budget.amount),
            ),
            Collection::MonthlyIncome => SyncUpdate::MonthlyIncome(
                first_record(collection, &documents, parse_monthly_income)
                    .map_or(0.0, |income| income.amount),
            ),
        };

        Some(UserUpdate {
            user: self.user.clone(),
            update,
        })
    }
}

/// Parse the first document with `parse`.
///
/// Budgets and monthly income are expected to have a single document per
/// user. If there are several, the store's order decides which one is used.
fn first_record<T>(
    collection: Collection,
    documents: &[Document],
    parse: fn(&Document) -> T,
) -> Option<T> {
    if documents.len() > 1 {
        tracing::warn!(
            "found {} {collection} documents, using the first one ({})",
            documents.len(),
            documents[0].id
        );
    }

    documents.first().map(parse)
}

/// Wait for the next delivery on `stream`, or forever if it has ended.
async fn next_delivery(stream: &mut Option<Subscription>) -> Option<Snapshot> {
    match stream {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}

/// Owns the live subscriptions for the current user.
pub struct LiveSync<S> {
    store: Arc<S>,
    feeds: Option<Feeds>,
}

impl<S: DocumentStore> LiveSync<S> {
    /// Create a coordinator with no open subscriptions.
    pub fn new(store: Arc<S>) -> Self {
        Self { store, feeds: None }
    }

    /// Subscribe to the collections of `user`.
    ///
    /// All subscriptions of the previous user are closed first.
    pub fn subscribe(&mut self, user: UserID) {
        self.teardown();

        let transactions = self.store.subscribe(
            Query::new(Collection::Transactions, user.clone())
                .order_by(OrderBy::CreatedAtDescending),
        );
        let budget = self
            .store
            .subscribe(Query::new(Collection::Budgets, user.clone()));
        let monthly_income = self
            .store
            .subscribe(Query::new(Collection::MonthlyIncome, user.clone()));

        tracing::debug!("subscribed to live data for user {user}");

        self.feeds = Some(Feeds {
            user,
            transactions: Some(transactions),
            budget: Some(budget),
            monthly_income: Some(monthly_income),
        });
    }

    /// Close all open subscriptions.
    ///
    /// Snapshots that were delivered but not yet read are discarded.
    pub fn teardown(&mut self) {
        if let Some(feeds) = self.feeds.take() {
            tracing::debug!("closing live data subscriptions for user {}", feeds.user);
            for subscription in [feeds.transactions, feeds.budget, feeds.monthly_income]
                .into_iter()
                .flatten()
            {
                subscription.close();
            }
        }
    }

    /// The user whose collections are being synchronized.
    pub fn user(&self) -> Option<&UserID> {
        self.feeds.as_ref().map(|feeds| &feeds.user)
    }

    /// Whether any subscription is still open.
    pub fn is_active(&self) -> bool {
        self.feeds.as_ref().is_some_and(|feeds| !feeds.is_closed())
    }

    /// Wait for the next update on any of the streams.
    ///
    /// Subscription errors are logged and skipped. Returns `None` when there
    /// are no open subscriptions. This method is cancel safe.
    pub async fn next_update(&mut self) -> Option<UserUpdate> {
        loop {
            let feeds = self.feeds.as_mut().filter(|feeds| !feeds.is_closed())?;

            let (collection, delivery) = tokio::select! {
                delivery = next_delivery(&mut feeds.transactions) => (Collection::Transactions, delivery),
                delivery = next_delivery(&mut feeds.budget) => (Collection::Budgets, delivery),
                delivery = next_delivery(&mut feeds.monthly_income) => (Collection::MonthlyIncome, delivery),
            };

            if let Some(update) = feeds.handle(collection, delivery) {
                return Some(update);
            }
        }
    }

    /// Get the next update that has already been delivered, without waiting.
    pub fn try_next_update(&mut self) -> Option<UserUpdate> {
        let feeds = self.feeds.as_mut()?;

        for collection in [
            Collection::Transactions,
            Collection::Budgets,
            Collection::MonthlyIncome,
        ] {
            while let Some(delivery) = feeds
                .stream(collection)
                .as_mut()
                .and_then(Subscription::try_next)
            {
                if let Some(update) = feeds.handle(collection, Some(delivery)) {
                    return Some(update);
                }
            }
        }

        None
    }
}
