//! Sets up the application's SQLite database.

use rusqlite::{Connection, Error, Transaction as SqlTransaction};

use crate::stores::sqlite::SQLiteDocumentStore;

/// A trait for adding an object schema to a database.
pub trait CreateTable {
    /// Create the tables for the type if they do not exist yet.
    ///
    /// # Errors
    /// Returns an error if there is an SQL error.
    fn create_table(connection: &Connection) -> Result<(), Error>;
}

/// Create the tables for all stored types.
///
/// Safe to call on a database that has already been initialized.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    SQLiteDocumentStore::create_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
