//! Who is signed in.

use std::sync::Arc;

use tokio::sync::watch;

use crate::UserID;

/// Provides the signed in user and notifies about changes.
pub trait IdentityProvider {
    /// The signed in user, if any.
    fn current_user(&self) -> Option<UserID>;

    /// A receiver that is notified whenever the user signs in or out.
    fn watch(&self) -> watch::Receiver<Option<UserID>>;
}

/// An in-process sign in session.
#[derive(Debug, Clone)]
pub struct Session {
    sender: Arc<watch::Sender<Option<UserID>>>,
}

impl Session {
    /// A session with nobody signed in.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);

        Self {
            sender: Arc::new(sender),
        }
    }

    /// A session with `user` already signed in.
    pub fn signed_in(user: UserID) -> Self {
        let session = Self::new();
        session.sign_in(user);
        session
    }

    /// Sign `user` in, replacing any previous user.
    pub fn sign_in(&self, user: UserID) {
        tracing::info!("user {user} signed in");
        self.sender.send_replace(Some(user));
    }

    /// Sign the current user out.
    pub fn sign_out(&self) {
        if let Some(user) = self.sender.send_replace(None) {
            tracing::info!("user {user} signed out");
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for Session {
    fn current_user(&self) -> Option<UserID> {
        self.sender.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<UserID>> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use crate::UserID;

    use super::{IdentityProvider, Session};

    #[test]
    fn new_session_is_signed_out() {
        assert_eq!(Session::new().current_user(), None);
    }

    #[tokio::test]
    async fn watchers_see_sign_in_and_out() {
        let session = Session::new();
        let mut receiver = session.watch();

        session.sign_in(UserID::new("alice"));
        receiver.changed().await.unwrap();
        assert_eq!(*receiver.borrow_and_update(), Some(UserID::new("alice")));

        session.sign_out();
        receiver.changed().await.unwrap();
        assert_eq!(*receiver.borrow_and_update(), None);
    }
}
