//! Proptest generators for property-based testing.

use chrono::Duration;
use envlock_core::{fingerprint, NewRecipient};
use proptest::prelude::*;

/// A recipient or device name, possibly padded with whitespace.
pub fn recipient_name() -> impl Strategy<Value = String> {
    ("[ ]{0,2}", "[A-Za-z][A-Za-z0-9-]{0,11}", "[ ]{0,2}")
        .prop_map(|(lead, name, trail)| format!("{lead}{name}{trail}"))
}

/// An age-style public key string.
pub fn public_key() -> impl Strategy<Value = String> {
    "age1[a-z0-9]{8,24}".prop_map(String::from)
}

/// A positive invite lifetime between one second and one week.
pub fn ttl() -> impl Strategy<Value = Duration> {
    (1i64..=7 * 24 * 3600).prop_map(Duration::seconds)
}

/// Free-form invite creator label.
pub fn created_by() -> impl Strategy<Value = String> {
    "[ -~]{0,24}".prop_map(String::from)
}

/// Parameters for one `RecipientRegistry::add` call.
#[derive(Debug, Clone)]
pub struct RecipientParams {
    pub name: String,
    pub public_key: String,
}

impl RecipientParams {
    /// The registry input, with the fingerprint derived from the key.
    pub fn to_new_recipient(&self) -> NewRecipient {
        NewRecipient::new(&self.name, &self.public_key, fingerprint(&self.public_key))
    }
}

impl Arbitrary for RecipientParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (recipient_name(), public_key())
            .prop_map(|(name, public_key)| RecipientParams { name, public_key })
            .boxed()
    }
}

/// A batch of add calls drawn from a small pool, so collisions are common.
pub fn recipient_batch(max_len: usize) -> impl Strategy<Value = Vec<RecipientParams>> {
    let names = prop::sample::select(vec!["laptop", "Laptop", "desk", "ci", "phone"]);
    let keys = prop::sample::select(vec!["age1aaa", "age1bbb", "age1ccc", "age1ddd"]);
    prop::collection::vec(
        (names, keys).prop_map(|(name, key)| RecipientParams {
            name: name.to_string(),
            public_key: key.to_string(),
        }),
        0..=max_len,
    )
}
