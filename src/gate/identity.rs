//! Allow-list authorization gate.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::event::{Event, Principal};

use super::{Decision, Denial, Gate};

/// Holds the set of authorized principals and answers membership queries.
///
/// The set is fixed at construction in normal operation; `revoke` exists so
/// privileged actions can be re-validated against current state.
pub struct IdentityStore {
    /// Principals permitted through the identity gate
    authorized: RwLock<HashSet<Principal>>,
}

impl IdentityStore {
    /// Build the store from the configured allow-list.
    pub fn new(principals: impl IntoIterator<Item = Principal>) -> Self {
        Self {
            authorized: RwLock::new(principals.into_iter().collect()),
        }
    }

    /// Whether the principal is authorized.
    ///
    /// An absent principal is never authorized; system-generated events do
    /// not pass the identity gate.
    pub fn is_authorized(&self, principal: Option<Principal>) -> bool {
        match principal {
            Some(p) => self.authorized.read().contains(&p),
            None => false,
        }
    }

    /// Remove a principal from the authorized set.
    ///
    /// Returns `true` if the principal was present.
    pub fn revoke(&self, principal: Principal) -> bool {
        let removed = self.authorized.write().remove(&principal);
        if removed {
            debug!(principal = %principal, "Principal revoked");
        }
        removed
    }

    /// Number of authorized principals.
    pub fn len(&self) -> usize {
        self.authorized.read().len()
    }

    /// Whether the authorized set is empty.
    pub fn is_empty(&self) -> bool {
        self.authorized.read().is_empty()
    }
}

/// Gate that denies any event whose originator is not allow-listed.
pub struct AuthGate {
    identity: Arc<IdentityStore>,
}

impl AuthGate {
    /// Create an authorization gate over the given store.
    pub fn new(identity: Arc<IdentityStore>) -> Self {
        Self { identity }
    }
}

impl Gate for AuthGate {
    fn evaluate(&self, event: &Event) -> Decision {
        if self.identity.is_authorized(event.principal()) {
            Decision::Admit
        } else {
            debug!(principal = ?event.principal(), "Unauthorized event rejected");
            Decision::Deny(Denial::Forbidden)
        }
    }
}
