//! Defines the document store trait and the query types used to subscribe to it.

use std::{fmt::Display, future::Future};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, UserID, stores::Subscription};

/// A raw record as held by the document store.
///
/// Fields are kept as untyped JSON. Use the functions in [crate::record] to
/// turn a document into one of the domain models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The ID the store assigned to the document.
    pub id: String,
    /// The document's fields, e.g. `amount`, `userId` and `createdAt`.
    pub fields: Map<String, Value>,
}

impl Document {
    /// Create a document from its ID and fields.
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Get the field `name`, if present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// The collections the core reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Income and expense transactions.
    Transactions,
    /// The per-user monthly budget. At most one document per user is expected.
    Budgets,
    /// Monthly income entries. Users may append several.
    MonthlyIncome,
}

impl Collection {
    /// The collection name used in the store.
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Transactions => "transactions",
            Collection::Budgets => "budgets",
            Collection::MonthlyIncome => "monthlyIncome",
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How the documents in a snapshot are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    /// Newest `createdAt` first. Documents without a `createdAt` come last.
    CreatedAtDescending,
}

/// A live query: all documents in `collection` whose `userId` equals `user_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// The collection to watch.
    pub collection: Collection,
    /// Only documents belonging to this user are included.
    pub user_id: UserID,
    /// The snapshot order. `None` leaves the order up to the store.
    pub order_by: Option<OrderBy>,
}

impl Query {
    /// Query the documents in `collection` that belong to `user_id`, in store order.
    pub fn new(collection: Collection, user_id: UserID) -> Self {
        Self {
            collection,
            user_id,
            order_by: None,
        }
    }

    /// Set the order of the documents in each snapshot.
    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }
}

/// A real-time source of documents.
///
/// Implementers deliver the full, ordered result set of a [Query] every time
/// it changes, starting with the current result set as soon as the
/// subscription opens.
pub trait DocumentStore: Send + Sync + 'static {
    /// Open a live subscription for `query`.
    ///
    /// Errors encountered while evaluating the query are delivered through
    /// the subscription rather than returned here, so that a failing query
    /// does not close the subscription.
    fn subscribe(&self, query: Query) -> Subscription;

    /// Delete the document `id` from `collection`.
    ///
    /// Subscribers see the result through their next snapshot.
    ///
    /// # Errors
    /// Returns [Error::DeleteMissingDocument] if there is no such document, or
    /// another [Error] if the store could not carry out the write.
    fn delete(
        &self,
        collection: Collection,
        id: &str,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}
