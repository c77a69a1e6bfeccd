//! Identifier types for the credit governor.
//!
//! Accounts and payment events are addressed by opaque strings supplied by the
//! surrounding product (a user id, an email, a Stripe event id). Content is
//! addressed by a short digest of its bytes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Length of a content fingerprint in hex characters.
pub const FINGERPRINT_LEN: usize = 16;

/// An account identifier (user id or email from the session layer).
///
/// The value is opaque to the governor; it only needs to be non-blank and
/// free of whitespace and `:` so it can be embedded in store keys.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Create an `AccountId` from a string.
    ///
    /// # Errors
    ///
    /// Returns `IdError::Empty` for blank input, `IdError::Whitespace` if the
    /// value contains whitespace and `IdError::KeySeparator` if it contains `:`.
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        validate_opaque(&value)?;
        Ok(Self(value))
    }

    /// Generate a new random `AccountId` (for testing).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AccountId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

/// A payment event identifier, unique per delivery source event.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventId(String);

impl EventId {
    /// Create an `EventId` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is blank or contains whitespace or `:`.
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        validate_opaque(&value)?;
        Ok(Self(value))
    }

    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for EventId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({})", self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EventId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EventId> for String {
    fn from(id: EventId) -> Self {
        id.0
    }
}

/// A caller-chosen identifier that makes a retried operation apply once.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperationId(String);

impl OperationId {
    /// Create an `OperationId` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is blank or contains whitespace or `:`.
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        validate_opaque(&value)?;
        Ok(Self(value))
    }

    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OperationId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Debug for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OperationId({})", self.0)
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OperationId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OperationId> for String {
    fn from(id: OperationId) -> Self {
        id.0
    }
}

/// A deterministic short digest of request content.
///
/// Computed as the first 16 hex characters of the SHA-256 of the content
/// bytes. Byte-identical content always yields the same fingerprint, which is
/// what scopes the regeneration quota to "the same prompt".
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    /// Fingerprint a piece of request content.
    #[must_use]
    pub fn of(content: &str) -> Self {
        let digest = Sha256::digest(content.as_bytes());
        let mut hex = hex::encode(digest);
        hex.truncate(FINGERPRINT_LEN);
        Self(hex)
    }

    /// Return the fingerprint as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ContentFingerprint {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() == FINGERPRINT_LEN
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(IdError::InvalidFingerprint);
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Debug for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentFingerprint({})", self.0)
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ContentFingerprint {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContentFingerprint> for String {
    fn from(fp: ContentFingerprint) -> Self {
        fp.0
    }
}

fn validate_opaque(value: &str) -> Result<(), IdError> {
    if value.trim().is_empty() {
        return Err(IdError::Empty);
    }
    if value.chars().any(char::is_whitespace) {
        return Err(IdError::Whitespace);
    }
    // `:` separates key segments in the store.
    if value.contains(':') {
        return Err(IdError::KeySeparator);
    }
    Ok(())
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is empty or blank.
    #[error("identifier must not be empty")]
    Empty,

    /// The input contains whitespace.
    #[error("identifier must not contain whitespace")]
    Whitespace,

    /// The input contains `:`.
    #[error("identifier must not contain ':'")]
    KeySeparator,

    /// The input is not a 16-character lowercase hex fingerprint.
    #[error("invalid content fingerprint")]
    InvalidFingerprint,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_accepts_emails_and_uuids() {
        assert!(AccountId::new("ada@example.com").is_ok());
        assert!(AccountId::new("3f2c9a4e-1b7d-4c21-9e0f-8a6b5d4c3e2f").is_ok());
    }

    #[test]
    fn account_id_rejects_blank_and_whitespace() {
        assert_eq!(AccountId::new(""), Err(IdError::Empty));
        assert_eq!(AccountId::new("   "), Err(IdError::Empty));
        assert_eq!(AccountId::new("a b"), Err(IdError::Whitespace));
    }

    #[test]
    fn ids_reject_key_separator() {
        assert_eq!(
            AccountId::new("dailyUsed:alice:20240307"),
            Err(IdError::KeySeparator)
        );
        assert_eq!(EventId::new("evt:1"), Err(IdError::KeySeparator));

        let bad: Result<AccountId, _> = serde_json::from_str("\"a:b\"");
        assert!(bad.is_err());
    }

    #[test]
    fn account_id_serde_json() {
        let id = AccountId::generate();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);

        let bad: Result<AccountId, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }

    #[test]
    fn event_id_roundtrip() {
        let id: EventId = "evt_42".parse().unwrap();
        assert_eq!(id.as_str(), "evt_42");
        assert_eq!(id.to_string(), "evt_42");
    }

    #[test]
    fn fingerprint_is_truncated_sha256() {
        // sha256("abc") = ba7816bf8f01cfea414140de5dae2223...
        let fp = ContentFingerprint::of("abc");
        assert_eq!(fp.as_str(), "ba7816bf8f01cfea");
        assert_eq!(fp.as_str().len(), FINGERPRINT_LEN);
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let a = ContentFingerprint::of("a castle at dusk, oil painting");
        let b = ContentFingerprint::of("a castle at dusk, oil painting");
        let c = ContentFingerprint::of("a castle at dawn, oil painting");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn fingerprint_parse_validates_shape() {
        assert!("ba7816bf8f01cfea".parse::<ContentFingerprint>().is_ok());
        assert_eq!(
            "BA7816BF8F01CFEA".parse::<ContentFingerprint>(),
            Err(IdError::InvalidFingerprint)
        );
        assert_eq!(
            "ba7816".parse::<ContentFingerprint>(),
            Err(IdError::InvalidFingerprint)
        );
    }
}
