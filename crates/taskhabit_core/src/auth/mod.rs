//! Credential primitives: password digests and signed form tokens.
//!
//! # Invariants
//! - Plaintext passwords never leave the call that hashes or checks them.
//! - Signature and hash comparisons are constant time.

pub mod csrf;
pub mod password;
