//! Contains the SQLite backed document store and a convenience function for
//! opening one.

pub mod document;

pub use document::SQLiteDocumentStore;

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use rusqlite::Connection;

use crate::{Error, db::initialize};

/// Open (or create) the SQLite database at `path` and wrap it in a document store.
///
/// This function will modify the database by adding the document table if it
/// does not exist yet.
///
/// # Errors
/// Returns an [Error::SqlError] if the database cannot be opened or initialized.
pub fn open_store(path: &Path) -> Result<SQLiteDocumentStore, Error> {
    let connection = Connection::open(path)?;
    initialize(&connection)?;

    Ok(SQLiteDocumentStore::new(Arc::new(Mutex::new(connection))))
}
