//! Hashing and randomness for enrollment.
//!
//! Fingerprints and secret hashes are SHA-256 based so records written by
//! any envlock client compare equal.

use base64::prelude::*;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Digest bytes kept in a fingerprint.
pub const FINGERPRINT_BYTES: usize = 8;

/// Random bytes behind an invite secret.
pub const SECRET_BYTES: usize = 18;

/// Short, non-secret digest of a public key: 8 bytes of SHA-256, hex encoded.
pub fn fingerprint(public_key: &str) -> String {
    let digest = Sha256::digest(public_key.trim().as_bytes());
    hex::encode(&digest[..FINGERPRINT_BYTES])
}

/// Hash of an invite secret as persisted on the invite.
pub fn secret_hash(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.trim().as_bytes()))
}

/// Compare two hex digests without short-circuiting on the first mismatch.
pub fn digests_match(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// `len` random bytes, hex encoded.
pub fn random_hex<R: RngCore + CryptoRng>(rng: &mut R, len: usize) -> String {
    let mut buf = vec![0u8; len];
    rng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// A fresh invite secret: [`SECRET_BYTES`] random bytes, URL-safe base64 without padding.
pub fn random_secret<R: RngCore + CryptoRng>(rng: &mut R) -> String {
    let mut buf = [0u8; SECRET_BYTES];
    rng.fill_bytes(&mut buf);
    BASE64_URL_SAFE_NO_PAD.encode(buf)
}
