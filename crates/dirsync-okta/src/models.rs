//! Wire models for the Okta management API.

use dirsync_core::Email;
use serde::Deserialize;

/// An Okta group as returned by `GET /api/v1/groups`.
#[derive(Debug, Clone, Deserialize)]
pub struct OktaGroup {
    pub id: String,
    pub profile: OktaGroupProfile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OktaGroupProfile {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// An Okta user as returned by `GET /api/v1/groups/{id}/users`.
#[derive(Debug, Clone, Deserialize)]
pub struct OktaUser {
    pub id: String,
    pub profile: OktaUserProfile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OktaUserProfile {
    /// Normalized on deserialization by the [`Email`] newtype.
    pub email: Email,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl OktaUserProfile {
    /// Best-available display name for log output.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        if let Some(display) = &self.display_name {
            return Some(display.clone());
        }
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(first), None) => Some(first.clone()),
            (None, Some(last)) => Some(last.clone()),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_group() {
        let json = r#"{
            "id": "00g1abc",
            "profile": { "name": "Engineering", "description": "Eng org" }
        }"#;
        let group: OktaGroup = serde_json::from_str(json).unwrap();
        assert_eq!(group.id, "00g1abc");
        assert_eq!(group.profile.name, "Engineering");
    }

    #[test]
    fn test_deserialize_user_normalizes_email() {
        let json = r#"{
            "id": "00u1xyz",
            "profile": { "email": "Alice@Example.COM", "firstName": "Alice" }
        }"#;
        let user: OktaUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.profile.email.as_str(), "alice@example.com");
        assert_eq!(user.profile.name().as_deref(), Some("Alice"));
    }

    #[test]
    fn test_display_name_preferred_over_parts() {
        let json = r#"{
            "id": "00u2",
            "profile": {
                "email": "b@x.com",
                "firstName": "Bob",
                "lastName": "Jones",
                "displayName": "Bobby J"
            }
        }"#;
        let user: OktaUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.profile.name().as_deref(), Some("Bobby J"));
    }
}
