//! Case-normalized email identities.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An email address acting as the join key between the identity source and
/// the directory sink.
///
/// Both directories store emails in whatever case the user typed at signup,
/// so comparison must always happen on a normalized form. Normalization
/// (trim + lowercase) is applied once here, at construction, never at call
/// sites.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Email(String);

impl Email {
    /// Create a normalized email from a raw directory value.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Email(raw.trim().to_lowercase())
    }

    /// The normalized form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Email {
    fn from(raw: &str) -> Self {
        Email::new(raw)
    }
}

impl Serialize for Email {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Email::new(&raw))
    }
}
