//! Random session/CSRF tokens and their comparison.

use subtle::ConstantTimeEq;

use super::SessionError;

/// 256 bits of OS randomness per token.
pub const TOKEN_BYTES: usize = 32;

/// Fresh hex-encoded token from the OS CSPRNG.
pub fn random_token() -> Result<String, SessionError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    getrandom::getrandom(&mut bytes).map_err(|e| SessionError::Entropy(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// Byte-for-byte comparison that does not short-circuit on the first
/// differing byte. Different lengths never match.
pub fn tokens_match(expected: &str, presented: &str) -> bool {
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}
