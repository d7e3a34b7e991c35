//! Property tests for the registry and invite invariants.

use chrono::Duration;
use envlock_core::{
    CoreError, DeviceIdentity, ErrorKind, Invite, InviteToken, RecipientRegistry, RequestStatus,
    TOKEN_PREFIX,
};
use envlock_testkit::generators::{created_by, recipient_batch, ttl};
use envlock_testkit::{device, TestFixture};
use proptest::prelude::*;
use rand::rngs::OsRng;

fn assert_unique(registry: &RecipientRegistry) {
    let entries = &registry.recipients;
    for (i, a) in entries.iter().enumerate() {
        for b in &entries[i + 1..] {
            assert_ne!(a.name.to_lowercase(), b.name.to_lowercase());
            assert_ne!(a.public_key, b.public_key);
            assert_ne!(a.fingerprint, b.fingerprint);
        }
    }
}

fn flip_first(s: &str) -> String {
    let mut chars: Vec<char> = s.chars().collect();
    chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
    chars.into_iter().collect()
}

proptest! {
    #[test]
    fn registry_never_holds_duplicates(batch in recipient_batch(12)) {
        let mut registry = RecipientRegistry::new();
        for params in &batch {
            let before = registry.clone();
            let added = registry.add(params.to_new_recipient()).map(|_| ());
            match added {
                Ok(_) => prop_assert_eq!(registry.len(), before.len() + 1),
                Err(err) => {
                    prop_assert_eq!(err.kind(), ErrorKind::Duplicate);
                    prop_assert_eq!(&registry, &before);
                }
            }
            assert_unique(&registry);
        }
    }

    #[test]
    fn revoke_unknown_never_mutates(batch in recipient_batch(6)) {
        let mut registry = RecipientRegistry::new();
        for params in &batch {
            let _ = registry.add(params.to_new_recipient());
        }
        let before = registry.clone();

        let err = registry.revoke("no-such-device").unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::NotFound);
        prop_assert_eq!(registry, before);
    }

    #[test]
    fn token_roundtrip(lifetime in ttl(), creator in created_by()) {
        let (invite, token) = Invite::new(lifetime, &creator).unwrap();
        let text = token.to_string();

        prop_assert!(text.starts_with(TOKEN_PREFIX));
        let parsed = InviteToken::parse(&text).unwrap();
        prop_assert_eq!(parsed.invite_id(), &invite.id);
        prop_assert!(invite.verify_token(&text).is_ok());

        let bad_secret = format!("{TOKEN_PREFIX}{}.{}", invite.id, flip_first(token.secret()));
        prop_assert!(matches!(invite.verify_token(&bad_secret), Err(CoreError::InvalidToken)));

        let bad_id = format!("{TOKEN_PREFIX}{}.{}", flip_first(invite.id.as_str()), token.secret());
        prop_assert!(matches!(invite.verify_token(&bad_id), Err(CoreError::InvalidToken)));
    }

    #[test]
    fn expiry_boundary(lifetime in ttl()) {
        let fixture = TestFixture::new();
        let (invite, _) = fixture.issue_invite(lifetime);
        let nanos = Duration::nanoseconds(1);

        prop_assert!(invite.validate_for_join(invite.expires_at - nanos).is_ok());
        prop_assert!(invite.validate_for_join(invite.expires_at).is_ok());
        let err = invite.validate_for_join(invite.expires_at + nanos).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::InviteExpired);
    }
}

#[test]
fn pending_uniqueness_matrix() {
    let fixture = TestFixture::new();
    let (first, _) = fixture.issue_invite(Duration::minutes(15));
    let (second, _) = fixture.issue_invite(Duration::minutes(15));
    let bob = device("bob");
    let carol = device("carol");

    let pending = vec![fixture.join(&[], &first, &bob)];
    let attempt = |invite: &Invite, who: &DeviceIdentity| {
        envlock_core::EnrollmentRequest::join(&pending, invite, who, fixture.now, &mut OsRng)
    };

    assert!(matches!(attempt(&first, &carol), Err(CoreError::InvitePending(_))));
    assert!(matches!(attempt(&second, &bob), Err(CoreError::DevicePending(ref n)) if n == "bob"));
    assert_eq!(attempt(&second, &carol).unwrap().status, RequestStatus::Pending);
}

#[test]
fn single_use_after_approval() {
    let fixture = TestFixture::new();
    let (invite, _) = fixture.issue_invite(Duration::minutes(15));
    let request = fixture.join(&[], &invite, &device("bob"));

    let plan = envlock_core::ApprovalPlan::new(
        request.clone(),
        invite,
        RecipientRegistry::new(),
        "",
        fixture.now,
    )
    .unwrap();

    let err = envlock_core::EnrollmentRequest::join(
        &[plan.request.clone()],
        &plan.invite,
        &device("mallory"),
        fixture.now,
        &mut OsRng,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InviteUsed);
}
