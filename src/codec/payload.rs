//! Decoded payload type.

use serde::{Serialize, Serializer};
use std::fmt;

/// A non-empty string decoded from a visual code.
///
/// Construction rejects the empty string, so a payload handed to a scan
/// consumer always carries content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecodedPayload(String);

impl DecodedPayload {
    /// Wraps `text`, or returns `None` if it is empty.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        (!text.is_empty()).then_some(Self(text))
    }

    /// Returns the decoded text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the payload, returning the decoded text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DecodedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DecodedPayload {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for DecodedPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
