//! Static credential gate.
//!
//! # Invariants
//! - A request passes only when it presents exactly the configured key.
//! - Key comparison time does not depend on where the keys differ.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Header name presentation layers read the credential from.
pub const API_KEY_HEADER: &str = "API-Key";

/// Credential gate failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingApiKey,
    WrongApiKey,
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "missing API key"),
            Self::WrongApiKey => write!(f, "wrong API key"),
        }
    }
}

impl Error for AuthError {}

/// Single shared-secret check applied before any directory call.
#[derive(Clone)]
pub struct ApiKeyGate {
    expected: String,
}

impl ApiKeyGate {
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }

    pub fn verify(&self, provided: Option<&str>) -> Result<(), AuthError> {
        let provided = provided
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::MissingApiKey)?;
        if !constant_time_eq(provided.as_bytes(), self.expected.as_bytes()) {
            return Err(AuthError::WrongApiKey);
        }
        Ok(())
    }
}

impl std::fmt::Debug for ApiKeyGate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyGate")
            .field("expected", &"<redacted>")
            .finish()
    }
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::{ApiKeyGate, AuthError};

    #[test]
    fn verify_accepts_only_the_configured_key() {
        let gate = ApiKeyGate::new("secret");
        assert_eq!(gate.verify(Some("secret")), Ok(()));
        assert_eq!(gate.verify(Some("secreT")), Err(AuthError::WrongApiKey));
        assert_eq!(gate.verify(Some("secret-longer")), Err(AuthError::WrongApiKey));
    }

    #[test]
    fn verify_rejects_missing_or_blank_key() {
        let gate = ApiKeyGate::new("secret");
        assert_eq!(gate.verify(None), Err(AuthError::MissingApiKey));
        assert_eq!(gate.verify(Some("  ")), Err(AuthError::MissingApiKey));
    }

    #[test]
    fn debug_output_redacts_key() {
        let rendered = format!("{:?}", ApiKeyGate::new("secret"));
        assert!(!rendered.contains("secret"));
    }
}
