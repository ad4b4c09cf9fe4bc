//! Ephemeral bearer tokens.

use std::fmt;

use rand::RngCore;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Random bytes per token (256 bits).
const TOKEN_BYTES: usize = 32;

/// Length of the hex-encoded token.
pub const TOKEN_LEN: usize = TOKEN_BYTES * 2;

/// An access token handed to API callers while the vault is unlocked.
///
/// Lives only in process memory; every unlock mints a new one.
#[derive(Clone)]
pub struct AccessToken(Zeroizing<String>);

impl AccessToken {
    /// Mint a fresh token from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; TOKEN_BYTES]);
        rand::rngs::OsRng.fill_bytes(bytes.as_mut_slice());
        Self(Zeroizing::new(hex::encode(bytes.as_slice())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison against a presented token.
    pub fn matches(&self, presented: &str) -> bool {
        self.0.as_bytes().ct_eq(presented.as_bytes()).into()
    }

    /// Whether `candidate` has the shape of a token we could have issued.
    pub fn is_well_formed(candidate: &str) -> bool {
        candidate.len() == TOKEN_LEN
            && candidate
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}
