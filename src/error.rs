//! Defines the crate level error type.

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to delete a document that does not exist.
    ///
    /// The document may already have been deleted by another session. The
    /// live subscription will reflect the current state either way.
    #[error("tried to delete a document that is not in the store")]
    DeleteMissingDocument,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// A document could not be stored because its fields are not valid JSON
    /// or have the wrong shape (e.g., a non-object payload).
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// An error occurred while serializing or deserializing JSON.
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// A user action needs a signed in user but nobody is signed in.
    #[error("no user is signed in")]
    Unauthenticated,

    /// An export was requested while the transaction snapshot is empty.
    #[error("there are no transactions to export")]
    NothingToExport,

    /// The CSV writer failed.
    #[error("could not write the CSV report: {0}")]
    CsvError(String),

    /// The PDF document could not be assembled or serialized.
    #[error("could not write the PDF report: {0}")]
    PdfError(String),

    /// An image (logo or chart capture) could not be decoded.
    #[error("could not decode image: {0}")]
    ImageError(String),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// The log subscriber could not be installed.
    #[error("could not set up logging: {0}")]
    LoggingError(String),

    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::JSONSerializationError(value.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::IoError(value.to_string())
    }
}
