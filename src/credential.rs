//! API credential handling.
//!
//! The key is attached as a bearer token to every outbound call and
//! never leaves this type in printable form. Format is not validated;
//! the provider is the judge of whether a key works.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::ProbeError;

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credential(String);

impl Credential {
    /// Accept any non-blank string. Surrounding whitespace is dropped,
    /// which matters for keys pasted from a terminal.
    pub fn new(raw: impl Into<String>) -> Result<Self, ProbeError> {
        let mut raw = raw.into();
        let trimmed = raw.trim().to_string();
        raw.zeroize();
        if trimmed.is_empty() {
            return Err(ProbeError::MissingCredential);
        }
        Ok(Self(trimmed))
    }

    /// Raw token for the `Authorization` header. Do not log.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}
