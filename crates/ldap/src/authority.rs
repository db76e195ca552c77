use ldapd_domain::{
    backend::{BackendDescriptor, ReplicationRole},
    dn::DistinguishedName,
};

use crate::core::referral::rewrite_referrals;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Authorization {
    /// This server is the source of the write.
    Originate,
    /// A change replayed by the update identity of a replicated backend.
    AcceptReplicated,
    /// The write belongs elsewhere. An empty list means no referral is known.
    Redirect(Vec<String>),
}

/// Decides who may write `target` in `backend`.
pub fn authorize(
    backend: &BackendDescriptor,
    requester: Option<&DistinguishedName>,
    target: &DistinguishedName,
    default_referrals: &[String],
) -> Authorization {
    let is_update_identity = backend.is_update_identity(requester);
    match &backend.replication {
        ReplicationRole::Consumer { .. } if is_update_identity => Authorization::AcceptReplicated,
        ReplicationRole::Consumer { provider_uri } => {
            Authorization::Redirect(rewrite_referrals(&[provider_uri.clone()], target))
        }
        ReplicationRole::MultiMaster if is_update_identity => Authorization::AcceptReplicated,
        ReplicationRole::MultiMaster => Authorization::Originate,
        ReplicationRole::SingleMaster if backend.update_dn.is_none() || is_update_identity => {
            Authorization::Originate
        }
        ReplicationRole::SingleMaster => {
            let referrals: &[String] = if backend.update_referrals.is_empty() {
                default_referrals
            } else {
                &backend.update_referrals
            };
            Authorization::Redirect(rewrite_referrals(referrals, target))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dn(normalized: &str) -> DistinguishedName {
        DistinguishedName::new(normalized, normalized)
    }

    fn backend(replication: ReplicationRole, update_dn: Option<&str>) -> BackendDescriptor {
        let mut backend = BackendDescriptor::new("main", vec![dn("dc=example,dc=com")]);
        backend.replication = replication;
        backend.update_dn = update_dn.map(dn);
        backend
    }

    fn target() -> DistinguishedName {
        dn("cn=bob,dc=example,dc=com")
    }

    #[test]
    fn test_single_master_without_update_identity_originates() {
        let backend = backend(ReplicationRole::SingleMaster, None);
        assert_eq!(
            authorize(&backend, None, &target(), &[]),
            Authorization::Originate
        );
    }

    #[test]
    fn test_single_master_with_update_identity() {
        let mut backend = backend(ReplicationRole::SingleMaster, Some("cn=owner"));
        assert_eq!(
            authorize(&backend, Some(&dn("cn=owner")), &target(), &[]),
            Authorization::Originate
        );
        let defaults = ["ldap://default.example.com".to_string()];
        assert_eq!(
            authorize(&backend, Some(&dn("cn=bob")), &target(), &defaults),
            Authorization::Redirect(vec![
                "ldap://default.example.com/cn=bob,dc=example,dc=com".to_string()
            ])
        );
        assert_eq!(
            authorize(&backend, None, &target(), &[]),
            Authorization::Redirect(Vec::new())
        );
        backend.update_referrals = vec!["ldap://master.example.com".to_string()];
        assert_eq!(
            authorize(&backend, Some(&dn("cn=bob")), &target(), &defaults),
            Authorization::Redirect(vec![
                "ldap://master.example.com/cn=bob,dc=example,dc=com".to_string()
            ])
        );
    }

    #[test]
    fn test_multi_master() {
        let backend = backend(ReplicationRole::MultiMaster, Some("cn=replicator"));
        assert_eq!(
            authorize(&backend, Some(&dn("cn=replicator")), &target(), &[]),
            Authorization::AcceptReplicated
        );
        assert_eq!(
            authorize(&backend, Some(&dn("cn=admin")), &target(), &[]),
            Authorization::Originate
        );
    }

    #[test]
    fn test_consumer_never_originates() {
        let backend = backend(
            ReplicationRole::Consumer {
                provider_uri: "ldap://provider.example.com".to_string(),
            },
            Some("cn=replicator"),
        );
        assert_eq!(
            authorize(&backend, Some(&dn("cn=replicator")), &target(), &[]),
            Authorization::AcceptReplicated
        );
        for requester in [None, Some(dn("cn=admin")), Some(dn("cn=owner"))] {
            assert_eq!(
                authorize(&backend, requester.as_ref(), &target(), &[]),
                Authorization::Redirect(vec![
                    "ldap://provider.example.com/cn=bob,dc=example,dc=com".to_string()
                ])
            );
        }
    }
}
