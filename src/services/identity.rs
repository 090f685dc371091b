//! Identity provider seam for Kizuna.
//!
//! The archive only needs to know who is signed in and when that changes.
//! "No owner" means there is nothing to reconcile.

use tokio::sync::watch;

/// Supplies the authenticated owner id and a stream of changes to it.
pub trait IdentityProvider: Send + Sync {
    fn current_owner(&self) -> Option<String>;
    fn subscribe(&self) -> watch::Receiver<Option<String>>;
}

/// Identity held in memory and switched explicitly by the host.
pub struct SessionIdentity {
    tx: watch::Sender<Option<String>>,
}

impl SessionIdentity {
    pub fn new(owner: Option<String>) -> Self {
        let (tx, _) = watch::channel(owner);
        Self { tx }
    }

    pub fn sign_in(&self, owner_id: &str) {
        let owner = Some(owner_id.to_string());
        self.tx.send_if_modified(|current| {
            if *current == owner {
                false
            } else {
                *current = owner;
                true
            }
        });
    }

    pub fn sign_out(&self) {
        self.tx.send_if_modified(|current| current.take().is_some());
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_owner(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}
