#![allow(missing_docs)]

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex},
};

use rusqlite::Connection;
use serde_json::{Map, Value};

use crate::{
    Error,
    db::initialize,
    models::{Transaction, TransactionType},
    stores::{
        Collection, Document, DocumentStore, Query, Snapshot, SnapshotSender, Subscription,
        sqlite::SQLiteDocumentStore,
    },
};

/// Create a document store backed by an in-memory database.
pub(crate) fn get_test_store() -> SQLiteDocumentStore {
    let connection = Connection::open_in_memory().unwrap();
    initialize(&connection).unwrap();

    SQLiteDocumentStore::new(Arc::new(Mutex::new(connection)))
}

/// Unwrap a `json!` object literal into a field map.
pub(crate) fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(fields) => fields,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub(crate) fn document(id: &str, value: Value) -> Document {
    Document::new(id, fields(value))
}

pub(crate) fn income(amount: f64) -> Transaction {
    Transaction::build(TransactionType::Income, amount)
}

pub(crate) fn expense(amount: f64) -> Transaction {
    Transaction::build(TransactionType::Expense, amount)
}

/// A document store whose snapshots, and errors, are pushed by the test.
#[derive(Default)]
pub(crate) struct ScriptedStore {
    senders: Mutex<HashMap<Collection, SnapshotSender>>,
}

impl ScriptedStore {
    /// Deliver `snapshot` to the latest subscription on `collection`.
    pub(crate) fn push(&self, collection: Collection, snapshot: Snapshot) {
        let senders = self.senders.lock().unwrap();
        senders[&collection].send(snapshot).unwrap();
    }
}

impl DocumentStore for ScriptedStore {
    fn subscribe(&self, query: Query) -> Subscription {
        let (sender, subscription) = Subscription::channel(|| {});
        self.senders.lock().unwrap().insert(query.collection, sender);
        subscription
    }

    fn delete(
        &self,
        _collection: Collection,
        _id: &str,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        std::future::ready(Ok(()))
    }
}
