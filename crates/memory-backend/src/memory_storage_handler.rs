use ldapd_domain::{
    backend::BackendDescriptor,
    dn::DistinguishedName,
    entry::Entry,
    error::StorageError,
    types::AttributeName,
};
use ldapd_domain_handlers::handler::StorageHandler;
use tracing::{debug, instrument};

use crate::memory_backend_handler::{MemoryBackendHandler, Partition};

fn is_referral_object(entry: &Entry) -> bool {
    entry
        .attribute(&AttributeName::new("objectClass"))
        .is_some_and(|object_class| {
            object_class
                .raw_values()
                .any(|v| v.eq_ignore_ascii_case(b"referral"))
        })
}

fn referrals_of(entry: &Entry) -> Option<Vec<String>> {
    if !is_referral_object(entry) {
        return None;
    }
    let refs: Vec<String> = entry
        .attribute(&AttributeName::new("ref"))?
        .raw_values()
        .map(|v| String::from_utf8_lossy(v).into_owned())
        .collect();
    (!refs.is_empty()).then_some(refs)
}

/// Closest existing ancestor of `dn`, or the empty DN.
fn matched_dn(partition: &Partition, dn: &DistinguishedName) -> String {
    dn.ancestors_normalized()
        .into_iter()
        .find_map(|ancestor| partition.get(ancestor).map(|e| e.dn().name().to_owned()))
        .unwrap_or_default()
}

impl StorageHandler for MemoryBackendHandler {
    #[instrument(skip_all, level = "debug", fields(dn = %entry.dn()))]
    fn add_entry(&self, backend: &BackendDescriptor, entry: Entry) -> Result<(), StorageError> {
        let mut partitions = self
            .partitions
            .write()
            .map_err(|_| StorageError::Busy(backend.id.to_string()))?;
        let partition = partitions.entry(backend.id.clone()).or_default();
        let dn = entry.dn().clone();
        if partition.contains_key(dn.normalized()) {
            return Err(StorageError::AlreadyExists(dn.name().to_owned()));
        }
        let is_suffix = backend.suffixes.contains(&dn);
        if !is_suffix {
            let parent_exists = dn
                .parent_normalized()
                .is_some_and(|parent| partition.contains_key(parent));
            if !parent_exists {
                return Err(StorageError::NoSuchParent {
                    dn: dn.name().to_owned(),
                    matched: matched_dn(partition, &dn),
                });
            }
        }
        debug!(backend = %backend.id, "Storing entry");
        partition.insert(dn.normalized().to_owned(), entry);
        Ok(())
    }

    fn get_referrals(
        &self,
        backend: &BackendDescriptor,
        dn: &DistinguishedName,
    ) -> Option<Vec<String>> {
        let partitions = self.partitions.read().ok()?;
        let partition = partitions.get(&backend.id)?;
        std::iter::once(dn.normalized())
            .chain(dn.ancestors_normalized())
            .filter_map(|candidate| partition.get(candidate))
            .find_map(referrals_of)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{memory_backend_handler::MemoryBackendHandler, replication_log::NoopReplicationLog};
    use ldapd_domain::{
        entry::Attribute,
        types::{AttributeType, Syntax},
    };
    use ldapd_domain_handlers::handler::DnNormalizer;
    use ldapd_schema::Schema;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn setup() -> (MemoryBackendHandler, BackendDescriptor, Arc<Schema>) {
        let schema = Arc::new(Schema::default());
        let handler =
            MemoryBackendHandler::new(schema.clone(), Vec::new(), Arc::new(NoopReplicationLog));
        let backend = BackendDescriptor::new(
            "main",
            vec![schema.normalize_dn("dc=example,dc=com").unwrap()],
        );
        (handler, backend, schema)
    }

    fn entry(schema: &Schema, dn: &str, object_classes: &[&str]) -> Entry {
        let mut entry = Entry::new(schema.normalize_dn(dn).unwrap());
        entry.push_attribute(Attribute::new(
            schema.resolve("objectClass").unwrap(),
            object_classes.iter().map(|&c| c.into()).collect(),
        ));
        entry
    }

    #[test]
    fn test_add_requires_parent_except_for_suffix() {
        let (handler, backend, schema) = setup();
        assert_eq!(
            handler.add_entry(&backend, entry(&schema, "cn=bob,dc=example,dc=com", &["person"])),
            Err(StorageError::NoSuchParent {
                dn: "cn=bob,dc=example,dc=com".to_string(),
                matched: String::new(),
            })
        );
        handler
            .add_entry(&backend, entry(&schema, "dc=example,dc=com", &["domain"]))
            .unwrap();
        handler
            .add_entry(&backend, entry(&schema, "cn=bob,dc=example,dc=com", &["person"]))
            .unwrap();
        assert_eq!(handler.entry_count(&backend.id), 2);
        assert_eq!(
            handler.add_entry(
                &backend,
                entry(&schema, "cn=x,ou=missing,dc=example,dc=com", &["person"])
            ),
            Err(StorageError::NoSuchParent {
                dn: "cn=x,ou=missing,dc=example,dc=com".to_string(),
                matched: "dc=example,dc=com".to_string(),
            })
        );
    }

    #[test]
    fn test_add_rejects_existing_entry() {
        let (handler, backend, schema) = setup();
        handler
            .add_entry(&backend, entry(&schema, "dc=example,dc=com", &["domain"]))
            .unwrap();
        assert_eq!(
            handler.add_entry(&backend, entry(&schema, "DC=Example,DC=Com", &["domain"])),
            Err(StorageError::AlreadyExists("DC=Example,DC=Com".to_string()))
        );
    }

    #[test]
    fn test_referral_objects() {
        let (handler, backend, schema) = setup();
        handler
            .add_entry(&backend, entry(&schema, "dc=example,dc=com", &["domain"]))
            .unwrap();
        let mut referral = entry(&schema, "ou=remote,dc=example,dc=com", &["referral"]);
        referral.push_attribute(Attribute::new(
            AttributeType::new("ref", "2.16.840.1.113730.3.1.34", Syntax::Ia5String).build(),
            vec!["ldap://remote.example.com/ou=remote,dc=example,dc=com".into()],
        ));
        handler.add_entry(&backend, referral).unwrap();
        let below = schema
            .normalize_dn("cn=bob,ou=remote,dc=example,dc=com")
            .unwrap();
        assert_eq!(
            handler.get_referrals(&backend, &below),
            Some(vec![
                "ldap://remote.example.com/ou=remote,dc=example,dc=com".to_string()
            ])
        );
        let elsewhere = schema.normalize_dn("cn=bob,dc=example,dc=com").unwrap();
        assert_eq!(handler.get_referrals(&backend, &elsewhere), None);
    }
}
