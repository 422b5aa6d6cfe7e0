//! Per-identity critical sections.
//!
//! Submissions for the same URL identity run one at a time; different
//! identities never wait on each other. Entries are dropped once no task
//! holds or waits for them, including waiters that are cancelled.

use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::types::identity::UrlIdentity;

#[derive(Default)]
struct Slot {
    mutex: Arc<Mutex<()>>,
    /// Tasks holding or waiting for `mutex`; only changed under the shard lock
    users: AtomicUsize,
}

#[derive(Default)]
pub struct IdentityLocks {
    slots: DashMap<UrlIdentity, Arc<Slot>>,
}

impl IdentityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `identity`.
    pub async fn lock(&self, identity: &UrlIdentity) -> IdentityGuard<'_> {
        let mutex = {
            let slot = self.slots.entry(identity.clone()).or_default();
            slot.users.fetch_add(1, Ordering::SeqCst);
            Arc::clone(&slot.mutex)
        };

        // Registered before waiting so a cancelled wait still releases its slot
        let lease = Lease {
            locks: self,
            identity: identity.clone(),
        };
        let guard = mutex.lock_owned().await;

        IdentityGuard {
            _guard: guard,
            _lease: lease,
        }
    }

    /// Number of identities currently locked or waited on.
    pub fn active(&self) -> usize {
        self.slots.len()
    }
}

struct Lease<'a> {
    locks: &'a IdentityLocks,
    identity: UrlIdentity,
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        self.locks.slots.remove_if(&self.identity, |_, slot| {
            slot.users.fetch_sub(1, Ordering::SeqCst) == 1
        });
    }
}

/// Held for the duration of one decide-and-write sequence.
pub struct IdentityGuard<'a> {
    // Fields drop in order: unlock first, then release the slot
    _guard: OwnedMutexGuard<()>,
    _lease: Lease<'a>,
}
