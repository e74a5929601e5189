//! Implements a SQLite backed document store with live queries.

use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard},
};

use rusqlite::{Connection, OptionalExtension};
use serde_json::{Map, Value};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    Error, UserID,
    db::CreateTable,
    record::parse_timestamp,
    stores::{
        Collection, Document, DocumentStore, OrderBy, Query, SnapshotSender, Subscription,
    },
};

/// A subscriber waiting for changes to the result set of `query`.
struct Listener {
    id: u64,
    query: Query,
    sender: SnapshotSender,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<Listener>,
}

/// Stores documents as JSON in a SQLite database.
///
/// Writes made through this store are pushed to every open subscription
/// whose query they affect: after each write, the subscription's query is run
/// again and the full result set is sent as a new snapshot.
#[derive(Clone)]
pub struct SQLiteDocumentStore {
    connection: Arc<Mutex<Connection>>,
    listeners: Arc<Mutex<Listeners>>,
}

impl std::fmt::Debug for SQLiteDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SQLiteDocumentStore")
            .field("listeners", &self.listener_count().ok())
            .finish()
    }
}

impl CreateTable for SQLiteDocumentStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute_batch(
            "CREATE TABLE IF NOT EXISTS document (
                row_id INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                collection TEXT NOT NULL,
                user_id TEXT,
                created_at INTEGER,
                fields TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_document_collection_user
                ON document(collection, user_id);",
        )
    }
}

impl SQLiteDocumentStore {
    /// Create a new store for the SQLite `connection`.
    ///
    /// The document table must already exist, see [crate::db::initialize].
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            connection,
            listeners: Arc::new(Mutex::new(Listeners::default())),
        }
    }

    /// Add a new document to `collection` and return it.
    ///
    /// If `fields` has no `createdAt`, the store stamps the current time, the
    /// same way a server timestamp would be filled in.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if there is an unexpected SQL error.
    pub fn insert(
        &self,
        collection: Collection,
        mut fields: Map<String, Value>,
    ) -> Result<Document, Error> {
        if !fields.contains_key("createdAt") {
            let now = OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .map_err(|error| Error::InvalidDocument(error.to_string()))?;
            fields.insert("createdAt".to_owned(), Value::String(now));
        }

        let id: String = {
            let connection = self.lock_connection()?;
            connection
                .prepare(
                    "INSERT INTO document (id, collection, user_id, created_at, fields)
                     VALUES (lower(hex(randomblob(10))), ?1, ?2, ?3, ?4)
                     RETURNING id",
                )?
                .query_row(
                    (
                        collection.name(),
                        user_id_column(&fields),
                        created_at_column(&fields),
                        serde_json::to_string(&fields)?,
                    ),
                    |row| row.get(0),
                )?
        };

        let document = Document::new(id, fields);
        self.notify(collection, &[user_id_column(&document.fields)]);

        Ok(document)
    }

    /// Merge `patch` into the document `id`, creating the document if it does
    /// not exist.
    ///
    /// Fields in `patch` replace fields of the same name; other fields are kept.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if there is an unexpected SQL error, or an
    /// [Error::InvalidDocument] if the stored fields are not a JSON object.
    pub fn merge(
        &self,
        collection: Collection,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<Document, Error> {
        let (document, previous_user) = {
            let connection = self.lock_connection()?;

            let existing: Option<String> = connection
                .query_row(
                    "SELECT fields FROM document WHERE collection = ?1 AND id = ?2",
                    (collection.name(), id),
                    |row| row.get(0),
                )
                .optional()?;

            match existing {
                Some(text) => {
                    let mut fields = parse_fields(id, &text)?;
                    let previous_user = user_id_column(&fields);
                    fields.extend(patch);

                    connection.execute(
                        "UPDATE document SET user_id = ?1, created_at = ?2, fields = ?3
                         WHERE collection = ?4 AND id = ?5",
                        (
                            user_id_column(&fields),
                            created_at_column(&fields),
                            serde_json::to_string(&fields)?,
                            collection.name(),
                            id,
                        ),
                    )?;

                    (Document::new(id, fields), previous_user)
                }
                None => {
                    connection.execute(
                        "INSERT INTO document (id, collection, user_id, created_at, fields)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        (
                            id,
                            collection.name(),
                            user_id_column(&patch),
                            created_at_column(&patch),
                            serde_json::to_string(&patch)?,
                        ),
                    )?;

                    (Document::new(id, patch), None)
                }
            }
        };

        self.notify(
            collection,
            &[previous_user, user_id_column(&document.fields)],
        );

        Ok(document)
    }

    /// Set the budget of `user_id` to `amount`.
    ///
    /// Updates the user's first budget document if there is one, otherwise
    /// creates it.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if there is an unexpected SQL error.
    pub fn upsert_budget(&self, user_id: &UserID, amount: f64) -> Result<Document, Error> {
        let mut fields = Map::new();
        fields.insert("userId".to_owned(), Value::String(user_id.to_string()));
        fields.insert("amount".to_owned(), Value::from(amount));

        let existing = self.query(&Query::new(Collection::Budgets, user_id.clone()))?;

        match existing.first() {
            Some(budget) => self.merge(Collection::Budgets, &budget.id, fields),
            None => self.insert(Collection::Budgets, fields),
        }
    }

    /// Get the document `id` from `collection`.
    ///
    /// # Errors
    /// Returns an [Error::NotFound] if there is no such document.
    pub fn get(&self, collection: Collection, id: &str) -> Result<Document, Error> {
        let text: String = self.lock_connection()?.query_row(
            "SELECT fields FROM document WHERE collection = ?1 AND id = ?2",
            (collection.name(), id),
            |row| row.get(0),
        )?;

        Ok(Document::new(id, parse_fields(id, &text)?))
    }

    /// Run `query` once and return its current result set.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if there is an unexpected SQL error, or an
    /// [Error::InvalidDocument] if a stored document is not a JSON object.
    pub fn query(&self, query: &Query) -> Result<Vec<Document>, Error> {
        let order = match query.order_by {
            Some(OrderBy::CreatedAtDescending) => {
                "ORDER BY created_at IS NULL, created_at DESC, row_id DESC"
            }
            None => "ORDER BY row_id",
        };

        let rows = {
            let connection = self.lock_connection()?;
            let mut statement = connection.prepare(&format!(
                "SELECT id, fields FROM document WHERE collection = ?1 AND user_id = ?2 {order}"
            ))?;

            statement
                .query_map((query.collection.name(), query.user_id.as_str()), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<Result<Vec<_>, rusqlite::Error>>()?
        };

        rows.into_iter()
            .map(|(id, text)| {
                let fields = parse_fields(&id, &text)?;
                Ok(Document::new(id, fields))
            })
            .collect()
    }

    /// The number of open subscriptions.
    ///
    /// # Errors
    /// Returns [Error::DatabaseLockError] if the listener lock is poisoned.
    pub fn listener_count(&self) -> Result<usize, Error> {
        self.listeners
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire the listener lock: {error}"))
            .map(|listeners| listeners.entries.len())
            .map_err(|_| Error::DatabaseLockError)
    }

    fn delete_document(&self, collection: Collection, id: &str) -> Result<(), Error> {
        let user_id: Option<Option<String>> = self
            .lock_connection()?
            .query_row(
                "DELETE FROM document WHERE collection = ?1 AND id = ?2 RETURNING user_id",
                (collection.name(), id),
                |row| row.get(0),
            )
            .optional()?;

        match user_id {
            Some(user_id) => {
                self.notify(collection, &[user_id]);
                Ok(())
            }
            None => Err(Error::DeleteMissingDocument),
        }
    }

    /// Send fresh snapshots to the listeners on `collection` for any of `users`.
    ///
    /// Listeners whose subscription has been dropped are removed.
    fn notify(&self, collection: Collection, users: &[Option<String>]) {
        let Ok(mut listeners) = self.listeners.lock() else {
            tracing::error!("could not acquire the listener lock, skipping change notification");
            return;
        };

        listeners.entries.retain(|listener| {
            let affected = listener.query.collection == collection
                && users
                    .iter()
                    .flatten()
                    .any(|user| user == listener.query.user_id.as_str());

            if !affected {
                return true;
            }

            let snapshot = self.query(&listener.query);
            if let Err(error) = &snapshot {
                tracing::error!(
                    "could not refresh {} for user {}: {error}",
                    listener.query.collection,
                    listener.query.user_id
                );
            }

            listener.sender.send(snapshot).is_ok()
        });
    }

    fn lock_connection(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)
    }
}

impl DocumentStore for SQLiteDocumentStore {
    fn subscribe(&self, query: Query) -> Subscription {
        let Ok(mut listeners) = self.listeners.lock() else {
            tracing::error!("could not acquire the listener lock, subscription will stay empty");
            let (sender, subscription) = Subscription::channel(|| {});
            let _ = sender.send(Err(Error::DatabaseLockError));
            return subscription;
        };

        let id = listeners.next_id;
        listeners.next_id += 1;

        let registry = Arc::downgrade(&self.listeners);
        let (sender, subscription) = Subscription::channel(move || {
            if let Some(registry) = registry.upgrade() {
                if let Ok(mut listeners) = registry.lock() {
                    listeners.entries.retain(|listener| listener.id != id);
                }
            }
        });

        // The initial snapshot is sent while the listener lock is held so that
        // no write can slip in between it and the registration.
        let _ = sender.send(self.query(&query));
        tracing::debug!(
            "opened subscription {id} on {} for user {}",
            query.collection,
            query.user_id
        );
        listeners.entries.push(Listener { id, query, sender });

        subscription
    }

    fn delete(
        &self,
        collection: Collection,
        id: &str,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        async move { self.delete_document(collection, id) }
    }
}

fn parse_fields(id: &str, text: &str) -> Result<Map<String, Value>, Error> {
    match serde_json::from_str(text)? {
        Value::Object(fields) => Ok(fields),
        other => Err(Error::InvalidDocument(format!(
            "document {id} is not an object: {other}"
        ))),
    }
}

fn user_id_column(fields: &Map<String, Value>) -> Option<String> {
    fields
        .get("userId")
        .and_then(Value::as_str)
        .map(str::to_owned)
}

fn created_at_column(fields: &Map<String, Value>) -> Option<i64> {
    fields
        .get("createdAt")
        .and_then(parse_timestamp)
        .and_then(|timestamp| i64::try_from(timestamp.unix_timestamp_nanos()).ok())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{
        Error, UserID,
        stores::{Collection, DocumentStore, OrderBy, Query},
        test_utils::{fields, get_test_store},
    };

    fn transactions_of(user: &str) -> Query {
        Query::new(Collection::Transactions, UserID::new(user))
            .order_by(OrderBy::CreatedAtDescending)
    }

    #[test]
    fn insert_assigns_id_and_created_at() {
        let store = get_test_store();

        let document = store
            .insert(
                Collection::Transactions,
                fields(json!({"userId": "alice", "amount": 5})),
            )
            .unwrap();

        assert!(!document.id.is_empty());
        assert!(document.get("createdAt").is_some());
        assert_eq!(
            store.get(Collection::Transactions, &document.id).unwrap(),
            document
        );
    }

    #[test]
    fn query_orders_by_created_at_descending() {
        let store = get_test_store();
        for (id, created_at) in [
            ("a", "2024-01-01T00:00:00Z"),
            ("c", "2024-03-01T00:00:00Z"),
            ("b", "2024-02-01T00:00:00Z"),
        ] {
            store
                .insert(
                    Collection::Transactions,
                    fields(json!({"userId": "alice", "label": id, "createdAt": created_at})),
                )
                .unwrap();
        }

        let labels: Vec<_> = store
            .query(&transactions_of("alice"))
            .unwrap()
            .iter()
            .map(|document| document.get("label").unwrap().as_str().unwrap().to_owned())
            .collect();

        assert_eq!(labels, vec!["c", "b", "a"]);
    }

    #[test]
    fn query_only_returns_documents_of_the_user() {
        let store = get_test_store();
        store
            .insert(Collection::Transactions, fields(json!({"userId": "alice"})))
            .unwrap();
        store
            .insert(Collection::Transactions, fields(json!({"userId": "bob"})))
            .unwrap();
        store
            .insert(Collection::Budgets, fields(json!({"userId": "alice"})))
            .unwrap();

        assert_eq!(store.query(&transactions_of("alice")).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn subscribe_delivers_initial_and_changed_snapshots() {
        let store = get_test_store();
        let mut subscription = store.subscribe(transactions_of("alice"));

        assert_eq!(subscription.next().await, Some(Ok(vec![])));

        let document = store
            .insert(
                Collection::Transactions,
                fields(json!({"userId": "alice", "amount": 3})),
            )
            .unwrap();

        assert_eq!(subscription.next().await, Some(Ok(vec![document.clone()])));

        store
            .delete(Collection::Transactions, &document.id)
            .await
            .unwrap();

        assert_eq!(subscription.next().await, Some(Ok(vec![])));
    }

    #[tokio::test]
    async fn writes_for_other_users_do_not_notify() {
        let store = get_test_store();
        let mut subscription = store.subscribe(transactions_of("alice"));
        subscription.next().await;

        store
            .insert(Collection::Transactions, fields(json!({"userId": "bob"})))
            .unwrap();

        assert_eq!(subscription.try_next(), None);
    }

    #[test]
    fn closing_a_subscription_removes_the_listener() {
        let store = get_test_store();
        let subscription = store.subscribe(transactions_of("alice"));
        assert_eq!(store.listener_count().unwrap(), 1);

        subscription.close();

        assert_eq!(store.listener_count().unwrap(), 0);
    }

    #[test]
    fn listener_count_fails_on_poisoned_lock() {
        let store = get_test_store();
        let listeners = store.listeners.clone();
        let _ = std::thread::spawn(move || {
            let _guard = listeners.lock().unwrap();
            panic!("poisoning the listener lock");
        })
        .join();

        assert_eq!(store.listener_count(), Err(Error::DatabaseLockError));
    }

    #[tokio::test]
    async fn delete_missing_document_fails() {
        let store = get_test_store();

        let result = store.delete(Collection::Transactions, "nope").await;

        assert_eq!(result, Err(Error::DeleteMissingDocument));
    }

    #[test]
    fn merge_keeps_existing_fields() {
        let store = get_test_store();
        let document = store
            .insert(
                Collection::Budgets,
                fields(json!({"userId": "alice", "amount": 100, "note": "keep"})),
            )
            .unwrap();

        let merged = store
            .merge(
                Collection::Budgets,
                &document.id,
                fields(json!({"amount": 250})),
            )
            .unwrap();

        assert_eq!(merged.get("amount"), Some(&json!(250)));
        assert_eq!(merged.get("note"), Some(&json!("keep")));
    }

    #[test]
    fn upsert_budget_updates_the_existing_document() {
        let store = get_test_store();
        let alice = UserID::new("alice");

        let created = store.upsert_budget(&alice, 100.0).unwrap();
        let updated = store.upsert_budget(&alice, 400.0).unwrap();

        assert_eq!(created.id, updated.id);
        let budgets = store
            .query(&Query::new(Collection::Budgets, alice))
            .unwrap();
        assert_eq!(budgets.len(), 1);
        assert_eq!(budgets[0].get("amount"), Some(&json!(400.0)));
    }
}
