//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use envlock_core::{DeviceIdentity, EnrollmentRequest, Invite, InviteToken};
use envlock_store::{MemoryObjectStore, ProjectStore};
use rand::rngs::OsRng;

/// Prefix used by fixture stores.
pub const TEST_PREFIX: &str = "envlock/test";

/// A project store kept entirely in memory.
pub type MemoryProject = ProjectStore<MemoryObjectStore>;

/// A fresh in-memory project store.
pub fn memory_project() -> MemoryProject {
    ProjectStore::new(MemoryObjectStore::new(), TEST_PREFIX)
}

/// A device identity with a deterministic public key derived from `name`.
pub fn device(name: &str) -> DeviceIdentity {
    let key_body: String = name.chars().filter(char::is_ascii_alphanumeric).collect();
    DeviceIdentity::from_public_key(name, format!("age1{key_body}"))
}

/// `count` distinct devices named `device-0`, `device-1`, ...
pub fn devices(count: usize) -> Vec<DeviceIdentity> {
    (0..count).map(|i| device(&format!("device-{i}"))).collect()
}

/// A memory store plus a fixed clock.
pub struct TestFixture {
    pub store: MemoryProject,
    pub now: DateTime<Utc>,
}

impl TestFixture {
    /// Create a new fixture whose clock reads 2024-05-01T12:00:00Z.
    pub fn new() -> Self {
        Self {
            store: memory_project(),
            now: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    /// The fixture clock shifted by `offset`.
    pub fn at(&self, offset: Duration) -> DateTime<Utc> {
        self.now + offset
    }

    /// Issue an invite at the fixture clock.
    pub fn issue_invite(&self, ttl: Duration) -> (Invite, InviteToken) {
        Invite::issue(ttl, "alice-laptop", self.now, &mut OsRng).unwrap()
    }

    /// Create a pending request for `device` at the fixture clock.
    pub fn join(
        &self,
        existing: &[EnrollmentRequest],
        invite: &Invite,
        device: &DeviceIdentity,
    ) -> EnrollmentRequest {
        EnrollmentRequest::join(existing, invite, device, self.now, &mut OsRng).unwrap()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envlock_core::{fingerprint, RequestStatus};

    #[test]
    fn test_device_is_deterministic() {
        let a = device("bobs-pc");
        assert_eq!(a, device("bobs-pc"));
        assert_eq!(a.public_key, "age1bobspc");
        assert_eq!(a.fingerprint, fingerprint("age1bobspc"));
        assert_ne!(a.fingerprint, device("carol").fingerprint);
    }

    #[test]
    fn test_devices_are_distinct() {
        let list = devices(3);
        assert_eq!(list.len(), 3);
        assert_ne!(list[0].fingerprint, list[1].fingerprint);
        assert_eq!(list[2].name, "device-2");
    }

    #[test]
    fn test_fixture_join() {
        let fixture = TestFixture::new();
        let (invite, _token) = fixture.issue_invite(Duration::minutes(15));
        let request = fixture.join(&[], &invite, &device("bob"));

        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.created_at, fixture.now);
        assert_eq!(invite.expires_at, fixture.at(Duration::minutes(15)));
    }
}
