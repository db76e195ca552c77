use base64::Engine;
use chrono::{DateTime, Utc};

use crate::{backend::BackendId, entry::Entry};

/// A change to be shipped to the replicas of a backend, in LDIF change
/// record form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicationRecord {
    pub backend: BackendId,
    pub time: DateTime<Utc>,
    pub dn: String,
    pub attributes: Vec<(String, Vec<Vec<u8>>)>,
}

impl ReplicationRecord {
    pub fn for_add(backend: BackendId, entry: &Entry, time: DateTime<Utc>) -> Self {
        Self {
            backend,
            time,
            dn: entry.dn().name().to_owned(),
            attributes: entry
                .attributes()
                .iter()
                .map(|a| {
                    (
                        a.name().to_string(),
                        a.raw_values().map(<[u8]>::to_vec).collect(),
                    )
                })
                .collect(),
        }
    }
}

// RFC 2849: SAFE-STRING may not start with a space, colon or less-than and
// only contains printable ASCII.
fn is_safe_string(value: &[u8]) -> bool {
    match value.first() {
        None => true,
        Some(b' ' | b':' | b'<') => false,
        Some(_) => {
            value.iter().all(|&c| (0x20..0x7f).contains(&c)) && value.last() != Some(&b' ')
        }
    }
}

fn write_line(f: &mut std::fmt::Formatter<'_>, name: &str, value: &[u8]) -> std::fmt::Result {
    if is_safe_string(value) {
        // Safe strings are ASCII.
        writeln!(f, "{name}: {}", String::from_utf8_lossy(value))
    } else {
        writeln!(
            f,
            "{name}:: {}",
            base64::engine::general_purpose::STANDARD.encode(value)
        )
    }
}

impl std::fmt::Display for ReplicationRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "# backend: {}", self.backend)?;
        writeln!(f, "time: {}", self.time.timestamp())?;
        write_line(f, "dn", self.dn.as_bytes())?;
        writeln!(f, "changetype: add")?;
        for (name, values) in &self.attributes {
            for value in values {
                write_line(f, name, value)?;
            }
        }
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dn::DistinguishedName,
        entry::Attribute,
        types::{AttributeType, Syntax},
    };
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ldif_rendering() {
        let mut entry = Entry::new(DistinguishedName::new(
            "cn=Bob,dc=example,dc=com",
            "cn=bob,dc=example,dc=com",
        ));
        entry.push_attribute(Attribute::new(
            AttributeType::new("cn", "2.5.4.3", Syntax::DirectoryString).build(),
            vec!["Bob".into(), "Bobby".into()],
        ));
        entry.push_attribute(Attribute::new(
            AttributeType::new("description", "2.5.4.13", Syntax::DirectoryString).build(),
            vec![" leading space".into()],
        ));
        let record = ReplicationRecord::for_add(
            BackendId::new("main"),
            &entry,
            Utc.timestamp_opt(1_000_000_000, 0).unwrap(),
        );
        assert_eq!(
            record.to_string(),
            "# backend: main\n\
             time: 1000000000\n\
             dn: cn=Bob,dc=example,dc=com\n\
             changetype: add\n\
             cn: Bob\n\
             cn: Bobby\n\
             description:: IGxlYWRpbmcgc3BhY2U=\n\
             \n"
        );
    }
}
