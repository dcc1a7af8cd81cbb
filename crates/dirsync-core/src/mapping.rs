//! Group→team mapping configuration.

use crate::Role;
use serde::Deserialize;

/// One configured mapping from a source group to a sink team.
///
/// Many mappings may name the same identity; the engine resolves each
/// identity's final organization role as the maximum target role across
/// every mapping whose source group contains it.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupMapping {
    /// Name of the group on the identity source.
    pub source_group: String,
    /// Name of the team on the directory sink.
    pub sink_team: String,
    /// Organization role granted to members of this group. Defaults to
    /// the lowest role when omitted.
    #[serde(default)]
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_defaults_to_viewer() {
        let mapping: GroupMapping = serde_json::from_str(
            r#"{"source_group": "Engineering", "sink_team": "Engineers"}"#,
        )
        .unwrap();
        assert_eq!(mapping.role, Role::Viewer);
    }

    #[test]
    fn test_explicit_role() {
        let mapping: GroupMapping = serde_json::from_str(
            r#"{"source_group": "Ops", "sink_team": "Operations", "role": "Admin"}"#,
        )
        .unwrap();
        assert_eq!(mapping.role, Role::Admin);
    }
}
