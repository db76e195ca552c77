use serde::{Deserialize, Serialize};

use crate::dn::DistinguishedName;

#[derive(
    Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize, derive_more::Debug, derive_more::Display,
)]
#[debug(r#""{_0}""#)]
#[display("{_0}")]
pub struct BackendId(String);

impl BackendId {
    pub fn new(id: &str) -> Self {
        Self(id.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// How a backend takes part in replication. Configured per backend at
/// startup.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "role")]
pub enum ReplicationRole {
    /// The only writable copy of its naming context.
    #[default]
    SingleMaster,
    /// One of several writable copies; peers replay their changes here
    /// under the update identity.
    MultiMaster,
    /// Live consumer of a provider's change stream. Never originates writes.
    Consumer { provider_uri: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restrictions {
    pub read_only: bool,
    pub require_authentication: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendDescriptor {
    pub id: BackendId,
    /// Normalized naming context suffixes.
    pub suffixes: Vec<DistinguishedName>,
    pub supports_add: bool,
    pub restrictions: Restrictions,
    /// When set, only this identity may write, or, for replicated backends,
    /// the identity replaying changes.
    pub update_dn: Option<DistinguishedName>,
    /// Where to send writers other than `update_dn`.
    pub update_referrals: Vec<String>,
    pub replication: ReplicationRole,
}

impl BackendDescriptor {
    pub fn new(id: &str, suffixes: Vec<DistinguishedName>) -> Self {
        Self {
            id: BackendId::new(id),
            suffixes,
            supports_add: true,
            restrictions: Restrictions::default(),
            update_dn: None,
            update_referrals: Vec::new(),
            replication: ReplicationRole::default(),
        }
    }

    pub fn is_update_identity(&self, requester: Option<&DistinguishedName>) -> bool {
        match (&self.update_dn, requester) {
            (Some(update_dn), Some(requester)) => update_dn == requester,
            _ => false,
        }
    }

    pub fn is_consumer(&self) -> bool {
        matches!(self.replication, ReplicationRole::Consumer { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dn(s: &str) -> DistinguishedName {
        DistinguishedName::new(s, s)
    }

    #[test]
    fn test_update_identity() {
        let mut backend = BackendDescriptor::new("main", vec![dn("dc=example,dc=com")]);
        assert!(!backend.is_update_identity(Some(&dn("cn=replicator"))));
        backend.update_dn = Some(dn("cn=replicator"));
        assert!(backend.is_update_identity(Some(&dn("cn=replicator"))));
        assert!(!backend.is_update_identity(Some(&dn("cn=admin"))));
        assert!(!backend.is_update_identity(None));
    }

    #[test]
    fn test_replication_role_deserialization() {
        let role: ReplicationRole = serde_json::from_str(
            r#"{"role": "consumer", "provider_uri": "ldap://provider.example.com"}"#,
        )
        .unwrap();
        assert_eq!(
            role,
            ReplicationRole::Consumer {
                provider_uri: "ldap://provider.example.com".to_string()
            }
        );
    }
}
