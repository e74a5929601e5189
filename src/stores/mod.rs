//! Contains the document store interface the core subscribes to, and a SQLite
//! backed implementation of it.

mod document;
mod subscription;

pub mod sqlite;

pub use document::{Collection, Document, DocumentStore, OrderBy, Query};
pub use subscription::{Snapshot, SnapshotSender, Subscription};
