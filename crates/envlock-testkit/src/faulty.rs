//! A [`MetadataStore`] wrapper that fails on demand.
//!
//! Used to interrupt multi-write operations at a chosen point.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use envlock_core::{EnrollmentRequest, Invite, InviteId, RecipientRegistry, RequestId};
use envlock_store::{MetadataStore, Result, StoreError};

/// The operations of the metadata port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    LoadRecipients,
    WriteRecipients,
    SaveInvite,
    LoadInvite,
    ListInvites,
    SaveRequest,
    LoadRequest,
    ListRequests,
}

#[derive(Default)]
struct Faults {
    /// Armed op -> number of successful calls to let through first.
    armed: HashMap<StoreOp, usize>,
    calls: HashMap<StoreOp, usize>,
}

/// Delegates to `inner` until an armed operation is reached.
pub struct FaultyStore<S> {
    inner: S,
    faults: Mutex<Faults>,
}

impl<S: MetadataStore> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: Mutex::new(Faults::default()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Fail every call to `op` from now on.
    pub fn fail_on(&self, op: StoreOp) {
        self.fail_after(op, 0);
    }

    /// Let `successes` calls to `op` through, then fail the rest.
    pub fn fail_after(&self, op: StoreOp, successes: usize) {
        self.faults().armed.insert(op, successes);
    }

    /// Disarm all faults.
    pub fn heal(&self) {
        self.faults().armed.clear();
    }

    /// Number of calls made to `op`, failed ones included.
    pub fn calls(&self, op: StoreOp) -> usize {
        self.faults().calls.get(&op).copied().unwrap_or(0)
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self, op: StoreOp) -> Result<()> {
        let mut faults = self.faults();
        *faults.calls.entry(op).or_default() += 1;
        match faults.armed.get_mut(&op) {
            Some(0) => Err(StoreError::Backend(format!("injected failure on {op:?}"))),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<S: MetadataStore> MetadataStore for FaultyStore<S> {
    async fn load_recipients(&self) -> Result<RecipientRegistry> {
        self.check(StoreOp::LoadRecipients)?;
        self.inner.load_recipients().await
    }

    async fn write_recipients(&self, registry: &RecipientRegistry) -> Result<()> {
        self.check(StoreOp::WriteRecipients)?;
        self.inner.write_recipients(registry).await
    }

    async fn save_invite(&self, invite: &Invite) -> Result<()> {
        self.check(StoreOp::SaveInvite)?;
        self.inner.save_invite(invite).await
    }

    async fn load_invite(&self, id: &InviteId) -> Result<Invite> {
        self.check(StoreOp::LoadInvite)?;
        self.inner.load_invite(id).await
    }

    async fn list_invites(&self) -> Result<Vec<Invite>> {
        self.check(StoreOp::ListInvites)?;
        self.inner.list_invites().await
    }

    async fn save_request(&self, request: &EnrollmentRequest) -> Result<()> {
        self.check(StoreOp::SaveRequest)?;
        self.inner.save_request(request).await
    }

    async fn load_request(&self, id: &RequestId) -> Result<EnrollmentRequest> {
        self.check(StoreOp::LoadRequest)?;
        self.inner.load_request(id).await
    }

    async fn list_requests(&self) -> Result<Vec<EnrollmentRequest>> {
        self.check(StoreOp::ListRequests)?;
        self.inner.list_requests().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::memory_project;

    #[tokio::test]
    async fn test_passes_through_until_armed() {
        let store = FaultyStore::new(memory_project());
        store.write_recipients(&RecipientRegistry::new()).await.unwrap();

        store.fail_on(StoreOp::WriteRecipients);
        let err = store.write_recipients(&RecipientRegistry::new()).await.unwrap_err();
        assert!(err.to_string().contains("WriteRecipients"));

        store.load_recipients().await.unwrap();
        assert_eq!(store.calls(StoreOp::WriteRecipients), 2);

        store.heal();
        store.write_recipients(&RecipientRegistry::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_fail_after() {
        let store = FaultyStore::new(memory_project());
        store.fail_after(StoreOp::ListInvites, 2);

        store.list_invites().await.unwrap();
        store.list_invites().await.unwrap();
        assert!(store.list_invites().await.is_err());
        assert!(store.list_invites().await.is_err());
    }
}
