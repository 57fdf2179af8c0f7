use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Claim name carrying application role assignments.
pub const ROLES_CLAIM: &str = "roles";

/// Claims decoded from the identity token by the provider.
///
/// Signatures are never checked here; the provider hands over claims it already trusts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(HashMap<String, Value>);

impl ClaimSet {
    /// Create an empty claim set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a claim, replacing any previous value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Get a raw claim value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// The role claim as an ordered sequence of strings.
    ///
    /// Missing or non-array claims yield an empty list; non-string entries are skipped.
    pub fn roles(&self) -> Vec<String> {
        match self.get(ROLES_CLAIM) {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// An account held by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Stable identifier of the account across tenants.
    pub home_account_id: String,
    /// Sign-in name, typically an email address.
    pub username: String,
    /// Display name.
    pub name: Option<String>,
    /// Directory the account signed in to.
    pub tenant_id: Option<String>,
    /// Claims from the most recent identity token.
    pub id_token_claims: Option<ClaimSet>,
}

impl Account {
    /// The role claim of this account, empty when no claims are present.
    pub fn roles(&self) -> Vec<String> {
        self.id_token_claims
            .as_ref()
            .map(ClaimSet::roles)
            .unwrap_or_default()
    }

    /// Name to show in the UI, falling back to the username.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.username)
    }
}

/// A short-lived bearer token.
///
/// The secret is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a bearer string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw bearer string.
    pub fn secret(&self) -> &str {
        &self.0
    }

    /// Value for an `Authorization` header.
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// An ordered set of OAuth scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scopes(Vec<String>);

impl Scopes {
    /// Build a scope list.
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(scopes.into_iter().map(Into::into).collect())
    }

    /// Iterate over the scopes.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Whether a scope is included.
    pub fn contains(&self, scope: &str) -> bool {
        self.0.iter().any(|s| s == scope)
    }

    /// Scopes joined by spaces, as sent on the wire.
    pub fn to_space_separated(&self) -> String {
        self.0.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_roles_claim() {
        let claims = ClaimSet::new().with("roles", json!(["Admin", 7, "Viewer"]));
        assert_eq!(claims.roles(), vec!["Admin", "Viewer"]);

        let claims = ClaimSet::new().with("roles", "Admin");
        assert!(claims.roles().is_empty());

        assert!(ClaimSet::new().roles().is_empty());
    }

    #[test]
    fn test_account_without_claims_has_no_roles() {
        let account = Account {
            home_account_id: "oid.tid".into(),
            username: "user@example.com".into(),
            name: None,
            tenant_id: None,
            id_token_claims: None,
        };
        assert!(account.roles().is_empty());
        assert_eq!(account.display_name(), "user@example.com");
    }

    #[test]
    fn test_account_deserializes_claims() {
        let account: Account = serde_json::from_value(json!({
            "home_account_id": "oid.tid",
            "username": "ada@example.com",
            "name": "Ada",
            "tenant_id": "tid",
            "id_token_claims": { "roles": ["Editor"], "oid": "oid" }
        }))
        .unwrap();
        assert_eq!(account.roles(), vec!["Editor"]);
        assert_eq!(account.display_name(), "Ada");
    }

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("eyJ.secret");
        assert_eq!(format!("{:?}", token), "AccessToken(***)");
        assert_eq!(token.bearer_header(), "Bearer eyJ.secret");
    }

    #[test]
    fn test_scopes() {
        let scopes = Scopes::new(["openid", "User.Read"]);
        assert!(scopes.contains("User.Read"));
        assert_eq!(scopes.to_space_separated(), "openid User.Read");
    }
}
