//! # Tabauth Guard
//!
//! Derives coarse-grained authorization decisions from the role claim of an account.
//! Everything here is a pure function of the claims; nothing is cached between calls.

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tabauth_core::Account;
use thiserror::Error;

/// Application roles understood by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Full control, including management.
    Admin,
    /// May edit content.
    Editor,
    /// Read-only access.
    Viewer,
}

impl Role {
    /// All known roles.
    pub const ALL: [Role; 3] = [Role::Admin, Role::Editor, Role::Viewer];

    /// The claim value for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Editor => "Editor",
            Role::Viewer => "Viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a claim value is not one of the known roles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Claim values are matched exactly; `"admin"` is not `Admin`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Role::Admin),
            "Editor" => Ok(Role::Editor),
            "Viewer" => Ok(Role::Viewer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// A single entry of the role claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleClaim {
    /// A recognized role.
    Known(Role),
    /// Any other value. Carried along but grants nothing.
    Other(String),
}

impl RoleClaim {
    /// Classify a raw claim value.
    pub fn parse(value: &str) -> Self {
        value
            .parse()
            .map(RoleClaim::Known)
            .unwrap_or_else(|UnknownRole(raw)| RoleClaim::Other(raw))
    }

    /// The raw claim value.
    pub fn as_str(&self) -> &str {
        match self {
            RoleClaim::Known(role) => role.as_str(),
            RoleClaim::Other(raw) => raw,
        }
    }

    /// The known role, if any.
    pub fn role(&self) -> Option<Role> {
        match self {
            RoleClaim::Known(role) => Some(*role),
            RoleClaim::Other(_) => None,
        }
    }
}

impl fmt::Display for RoleClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A permission derived from roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Create and modify content. Granted to `Admin` and `Editor`.
    Edit,
    /// Administrative actions. Granted to `Admin`.
    Manage,
}

/// Capabilities derived from a role claim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// The role claim in its original order, duplicates and unknown values included.
    pub roles: Vec<RoleClaim>,
    /// Holds `Admin`.
    pub is_admin: bool,
    /// Holds `Editor`.
    pub is_editor: bool,
    /// Holds `Viewer`.
    pub is_viewer: bool,
    /// Holds `Admin` or `Editor`.
    pub can_edit: bool,
    /// Holds `Admin`.
    pub can_manage: bool,
    /// The claim is non-empty, whatever its values.
    pub has_any_role: bool,
}

impl Capabilities {
    /// Derive capabilities from raw role claim values.
    pub fn from_roles<S: AsRef<str>>(roles: &[S]) -> Self {
        let roles: Vec<RoleClaim> = roles.iter().map(|r| RoleClaim::parse(r.as_ref())).collect();
        let holds = |role: Role| roles.iter().any(|r| r.role() == Some(role));

        let is_admin = holds(Role::Admin);
        let is_editor = holds(Role::Editor);
        let is_viewer = holds(Role::Viewer);

        Self {
            is_admin,
            is_editor,
            is_viewer,
            can_edit: is_admin || is_editor,
            can_manage: is_admin,
            has_any_role: !roles.is_empty(),
            roles,
        }
    }

    /// Whether a raw claim value is present, known role or not.
    pub fn has_role(&self, value: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == value)
    }

    /// Whether a capability is granted.
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Edit => self.can_edit,
            Capability::Manage => self.can_manage,
        }
    }
}

/// Resolves [`Capabilities`] for an account.
pub struct RoleResolver;

impl RoleResolver {
    /// Derive capabilities for the current account.
    ///
    /// No account, no claims or no role claim all resolve to "no roles".
    pub fn resolve(account: Option<&Account>) -> Capabilities {
        let roles = account.map(Account::roles).unwrap_or_default();
        Capabilities::from_roles(&roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabauth_core::ClaimSet;

    fn account_with(claims: Option<ClaimSet>) -> Account {
        Account {
            home_account_id: "oid.tid".into(),
            username: "user@example.com".into(),
            name: Some("User".into()),
            tenant_id: Some("tid".into()),
            id_token_claims: claims,
        }
    }

    #[test]
    fn test_editor() {
        let caps = Capabilities::from_roles(&["Editor"]);
        assert!(caps.can_edit);
        assert!(!caps.can_manage);
        assert!(!caps.is_admin);
        assert!(caps.is_editor);
        assert!(caps.has_any_role);
    }

    #[test]
    fn test_no_roles() {
        let caps = Capabilities::from_roles::<&str>(&[]);
        assert_eq!(caps, Capabilities::default());
        assert!(!caps.has_any_role);
    }

    #[test]
    fn test_admin_viewer() {
        let caps = Capabilities::from_roles(&["Admin", "Viewer"]);
        assert!(caps.can_manage);
        assert!(caps.can_edit);
        assert!(caps.is_viewer);
        assert!(!caps.is_editor);
        assert!(caps.allows(Capability::Manage));
    }

    #[test]
    fn test_unknown_roles_grant_nothing() {
        let caps = Capabilities::from_roles(&["Auditor", "admin"]);
        assert_eq!(
            caps.roles,
            vec![
                RoleClaim::Other("Auditor".into()),
                RoleClaim::Other("admin".into())
            ]
        );
        assert!(caps.has_any_role);
        assert!(!caps.is_admin && !caps.is_editor && !caps.is_viewer);
        assert!(!caps.can_edit && !caps.can_manage);
        assert!(caps.has_role("Auditor"));
    }

    #[test]
    fn test_duplicates_are_kept() {
        let caps = Capabilities::from_roles(&["Editor", "Editor"]);
        assert_eq!(caps.roles.len(), 2);
        assert!(caps.can_edit);
        assert!(!caps.can_manage);
    }

    #[test]
    fn test_capability_laws() {
        let names = ["Admin", "Editor", "Viewer", "Other"];
        let mut sequences: Vec<Vec<&str>> = vec![vec![]];
        for a in names {
            sequences.push(vec![a]);
            for b in names {
                sequences.push(vec![a, b]);
                for c in names {
                    sequences.push(vec![a, b, c]);
                }
            }
        }

        for roles in sequences {
            let caps = Capabilities::from_roles(&roles);
            let contains = |r: &str| roles.contains(&r);
            assert_eq!(caps.can_manage, contains("Admin"), "{:?}", roles);
            assert_eq!(
                caps.can_edit,
                contains("Admin") || contains("Editor"),
                "{:?}",
                roles
            );
            assert_eq!(caps.has_any_role, !roles.is_empty(), "{:?}", roles);
            assert_eq!(caps.is_viewer, contains("Viewer"), "{:?}", roles);
        }
    }

    #[test]
    fn test_resolve_from_account() {
        assert_eq!(RoleResolver::resolve(None), Capabilities::default());
        assert_eq!(
            RoleResolver::resolve(Some(&account_with(None))),
            Capabilities::default()
        );

        let account = account_with(Some(
            ClaimSet::new().with("roles", json!(["Admin", "Viewer"])),
        ));
        let caps = RoleResolver::resolve(Some(&account));
        assert!(caps.can_manage && caps.is_viewer);
        assert_eq!(
            caps.roles,
            vec![RoleClaim::Known(Role::Admin), RoleClaim::Known(Role::Viewer)]
        );
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(
            "viewer".parse::<Role>(),
            Err(UnknownRole("viewer".into()))
        );
        assert_eq!(Role::Editor.to_string(), "Editor");
        for role in Role::ALL {
            assert_eq!(RoleClaim::parse(role.as_str()), RoleClaim::Known(role));
        }
    }
}
