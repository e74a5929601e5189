//! The identifier of a signed in user.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A newtype wrapper for user IDs issued by the identity provider.
///
/// This helps disambiguate user IDs from document IDs, leading to better compile time
/// errors when the two are mixed up in store queries.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserID(String);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The user ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for UserID {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
