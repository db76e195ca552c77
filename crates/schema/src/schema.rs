use std::collections::HashMap;

use ldapd_domain::{
    error::ConstraintError,
    modification::ModificationList,
    types::{AttributeType, Syntax},
};
use ldapd_domain_handlers::handler::{DnNormalizer, OperationContext, SchemaHandler};
use tracing::{debug, instrument};

use crate::{matching::MatchingRules, opattrs::add_operational_attributes, syntax::validate};

/// The attribute types known to the server, indexed by lowercased name and
/// alias.
#[derive(Clone)]
pub struct Schema {
    attribute_types: HashMap<String, AttributeType>,
    allow_unknown_attributes: bool,
}

impl Default for Schema {
    fn default() -> Self {
        let mut schema = Self::empty();
        register_default_attribute_types(&mut schema, &MatchingRules::default());
        schema
    }
}

impl Schema {
    pub fn empty() -> Self {
        Self {
            attribute_types: HashMap::new(),
            allow_unknown_attributes: false,
        }
    }

    /// When set, undefined attribute types are accepted as opaque octet
    /// strings instead of being rejected.
    pub fn with_unknown_attributes(mut self, allow: bool) -> Self {
        self.allow_unknown_attributes = allow;
        self
    }

    pub fn allows_unknown_attributes(&self) -> bool {
        self.allow_unknown_attributes
    }

    pub fn register(&mut self, attribute_type: AttributeType, aliases: &[&str]) {
        for alias in aliases {
            self.attribute_types
                .insert(alias.to_lowercase(), attribute_type.clone());
        }
        self.attribute_types
            .insert(attribute_type.oid().to_owned(), attribute_type.clone());
        self.attribute_types
            .insert(attribute_type.name().as_str().to_lowercase(), attribute_type);
    }

    pub fn resolve(&self, name: &str) -> Option<AttributeType> {
        self.attribute_types.get(&name.to_lowercase()).cloned()
    }

    fn resolve_or_synthesize(&self, name: &str) -> Result<AttributeType, ConstraintError> {
        match self.resolve(name) {
            Some(attribute_type) => Ok(attribute_type),
            None if self.allow_unknown_attributes => {
                debug!(attribute = name, "Accepting undefined attribute type");
                Ok(AttributeType::new(name, "", Syntax::OctetString).build())
            }
            None => Err(ConstraintError::undefined_type(name)),
        }
    }

    /// Normalized form of a value of `attribute_type`, if it has an equality
    /// rule. DN values go through the schema so that type aliases and OIDs in
    /// their RDNs resolve the same way as in entry names.
    pub(crate) fn normalize_value(
        &self,
        attribute_type: &AttributeType,
        raw: &[u8],
    ) -> Result<Option<Vec<u8>>, String> {
        let Some(rule) = attribute_type.equality() else {
            return Ok(None);
        };
        if attribute_type.syntax() != Syntax::DistinguishedName {
            return rule.normalize(raw).map(Some);
        }
        let text = std::str::from_utf8(raw).map_err(|_| "value is not valid UTF-8".to_string())?;
        self.normalize_dn(text)
            .map(|dn| Some(dn.normalized().as_bytes().to_vec()))
            .map_err(|e| e.reason)
    }
}

impl SchemaHandler for Schema {
    fn resolve_attribute_type(&self, name: &str) -> Option<AttributeType> {
        self.resolve(name)
    }

    #[instrument(skip_all, level = "debug")]
    fn check_modifications(
        &self,
        mut modifications: ModificationList,
        context: &OperationContext,
    ) -> Result<ModificationList, ConstraintError> {
        for modification in modifications.pending_mut() {
            let attribute_type = match &modification.attribute_type {
                Some(attribute_type) => attribute_type.clone(),
                None => self.resolve_or_synthesize(&modification.raw_type)?,
            };
            let name = attribute_type.name().clone();
            if attribute_type.is_no_user_modification() && !context.replicated {
                return Err(ConstraintError::violation(format!(
                    "{name}: no user modification allowed"
                )));
            }
            if attribute_type.is_single_value() && modification.values.len() > 1 {
                return Err(ConstraintError::violation(format!(
                    "{name}: multiple values provided"
                )));
            }
            for (index, value) in modification.values.iter_mut().enumerate() {
                validate(attribute_type.syntax(), value.raw(), self)
                    .map_err(|reason| ConstraintError::invalid_syntax(&name, index, &reason))?;
                if let Some(normalized) = self
                    .normalize_value(&attribute_type, value.raw())
                    .map_err(|reason| ConstraintError::invalid_syntax(&name, index, &reason))?
                {
                    value.set_normalized(normalized);
                }
            }
            modification.attribute_type = Some(attribute_type);
        }
        if !context.replicated {
            add_operational_attributes(self, &mut modifications, context)?;
        }
        Ok(modifications)
    }
}

fn register_default_attribute_types(schema: &mut Schema, rules: &MatchingRules) {
    let string = |name: &str, oid: &str| {
        AttributeType::new(name, oid, Syntax::DirectoryString).equality(rules.case_ignore.clone())
    };
    let ia5 = |name: &str, oid: &str| {
        AttributeType::new(name, oid, Syntax::Ia5String).equality(rules.case_ignore_ia5.clone())
    };
    let dn = |name: &str, oid: &str| {
        AttributeType::new(name, oid, Syntax::DistinguishedName)
            .equality(rules.distinguished_name.clone())
    };
    let integer = |name: &str, oid: &str| {
        AttributeType::new(name, oid, Syntax::Integer).equality(rules.integer.clone())
    };
    let time = |name: &str, oid: &str| {
        AttributeType::new(name, oid, Syntax::GeneralizedTime)
            .equality(rules.generalized_time.clone())
    };
    schema.register(ia5("objectClass", "2.5.4.0").build(), &[]);
    schema.register(string("cn", "2.5.4.3").build(), &["commonName"]);
    schema.register(string("sn", "2.5.4.4").build(), &["surname"]);
    schema.register(string("givenName", "2.5.4.42").build(), &["gn"]);
    schema.register(string("uid", "0.9.2342.19200300.100.1.1").build(), &["userid"]);
    schema.register(ia5("mail", "0.9.2342.19200300.100.1.3").build(), &["rfc822Mailbox"]);
    schema.register(
        ia5("dc", "0.9.2342.19200300.100.1.25").single_value().build(),
        &["domainComponent"],
    );
    schema.register(string("o", "2.5.4.10").build(), &["organizationName"]);
    schema.register(string("ou", "2.5.4.11").build(), &["organizationalUnitName"]);
    schema.register(string("description", "2.5.4.13").build(), &[]);
    schema.register(
        AttributeType::new("telephoneNumber", "2.5.4.20", Syntax::TelephoneNumber)
            .equality(rules.telephone_number.clone())
            .build(),
        &[],
    );
    schema.register(dn("member", "2.5.4.31").build(), &[]);
    schema.register(dn("seeAlso", "2.5.4.34").build(), &[]);
    schema.register(
        AttributeType::new("userPassword", "2.5.4.35", Syntax::OctetString)
            .equality(rules.octet_string.clone())
            .build(),
        &[],
    );
    schema.register(
        string("displayName", "2.16.840.1.113730.3.1.241")
            .single_value()
            .build(),
        &[],
    );
    schema.register(integer("uidNumber", "1.3.6.1.1.1.1.0").single_value().build(), &[]);
    schema.register(integer("gidNumber", "1.3.6.1.1.1.1.1").single_value().build(), &[]);
    schema.register(
        AttributeType::new("homeDirectory", "1.3.6.1.1.1.1.3", Syntax::Ia5String)
            .equality(rules.case_exact.clone())
            .single_value()
            .build(),
        &[],
    );
    schema.register(
        AttributeType::new("jpegPhoto", "0.9.2342.19200300.100.1.60", Syntax::OctetString)
            .build(),
        &[],
    );
    schema.register(
        AttributeType::new("ref", "2.16.840.1.113730.3.1.34", Syntax::Ia5String)
            .equality(rules.case_exact.clone())
            .build(),
        &[],
    );
    schema.register(
        dn("creatorsName", "2.5.18.3")
            .single_value()
            .no_user_modification()
            .build(),
        &[],
    );
    schema.register(
        time("createTimestamp", "2.5.18.1")
            .single_value()
            .no_user_modification()
            .build(),
        &[],
    );
    schema.register(
        dn("modifiersName", "2.5.18.4")
            .single_value()
            .no_user_modification()
            .build(),
        &[],
    );
    schema.register(
        time("modifyTimestamp", "2.5.18.2")
            .single_value()
            .no_user_modification()
            .build(),
        &[],
    );
    schema.register(
        AttributeType::new("entryUUID", "1.3.6.1.1.16.4", Syntax::Uuid)
            .equality(rules.uuid.clone())
            .single_value()
            .no_user_modification()
            .build(),
        &[],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ldapd_domain::{
        dn::DistinguishedName,
        error::ConstraintKind,
        modification::{Modification, ModificationSlot},
        types::AttributeName,
    };
    use pretty_assertions::assert_eq;

    fn context(replicated: bool) -> OperationContext {
        OperationContext {
            requester: Some(DistinguishedName::new(
                "cn=Admin,dc=example,dc=com",
                "cn=admin,dc=example,dc=com",
            )),
            replicated,
            time: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    fn names(modifications: &ModificationList) -> Vec<String> {
        modifications.pending().map(|m| m.name().to_string()).collect()
    }

    #[test]
    fn test_resolve_is_case_insensitive_and_knows_aliases() {
        let schema = Schema::default();
        assert_eq!(
            schema.resolve("COMMONNAME").unwrap().name(),
            &AttributeName::new("cn")
        );
        assert_eq!(schema.resolve("2.5.4.3").unwrap().name(), &AttributeName::new("cn"));
        assert!(schema.resolve("fooBar").is_none());
    }

    #[test]
    fn test_check_normalizes_and_adds_operational_attributes() {
        let schema = Schema::default();
        let modifications: ModificationList = vec![
            Modification::add("commonName", ["Bob  Smith"]),
            Modification::add("objectClass", ["person"]),
        ]
        .into_iter()
        .collect();
        let checked = schema
            .check_modifications(modifications, &context(false))
            .unwrap();
        assert_eq!(
            names(&checked),
            vec![
                "cn",
                "objectClass",
                "creatorsName",
                "createTimestamp",
                "modifiersName",
                "modifyTimestamp",
                "entryUUID"
            ]
        );
        let cn = checked.pending().next().unwrap();
        assert_eq!(cn.raw_type, "commonName");
        assert_eq!(cn.values[0].raw(), b"Bob  Smith");
        assert_eq!(cn.values[0].normalized(), b"bob smith");
        let created = checked.pending().nth(3).unwrap();
        assert_eq!(created.values[0].raw(), b"20240102030405Z");
        let creator = checked.pending().nth(2).unwrap();
        assert_eq!(creator.values[0].raw(), b"cn=Admin,dc=example,dc=com");
        assert_eq!(creator.values[0].normalized(), b"cn=admin,dc=example,dc=com");
    }

    #[test]
    fn test_replicated_writes_keep_their_operational_attributes() {
        let schema = Schema::default();
        let modifications: ModificationList = vec![
            Modification::add("cn", ["Bob"]),
            Modification::add("entryUUID", ["a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8"]),
        ]
        .into_iter()
        .collect();
        let checked = schema
            .check_modifications(modifications, &context(true))
            .unwrap();
        assert_eq!(names(&checked), vec!["cn", "entryUUID"]);
    }

    #[test]
    fn test_rejects_user_supplied_operational_attributes() {
        let schema = Schema::default();
        let modifications: ModificationList =
            vec![Modification::add("createTimestamp", ["20240102030405Z"])]
                .into_iter()
                .collect();
        assert_eq!(
            schema.check_modifications(modifications, &context(false)),
            Err(ConstraintError::violation(
                "createTimestamp: no user modification allowed"
            ))
        );
    }

    #[test]
    fn test_rejects_undefined_types_unless_allowed() {
        let modifications = || -> ModificationList {
            vec![Modification::add("fooBar", ["x"])].into_iter().collect()
        };
        let err = Schema::default()
            .check_modifications(modifications(), &context(true))
            .unwrap_err();
        assert_eq!(err.kind, ConstraintKind::UndefinedAttributeType);
        assert_eq!(err.message, "fooBar: attribute type undefined");

        let checked = Schema::default()
            .with_unknown_attributes(true)
            .check_modifications(modifications(), &context(true))
            .unwrap();
        let foo = checked.pending().next().unwrap();
        assert_eq!(foo.name().as_str(), "fooBar");
        assert!(!foo.values[0].has_normalized());
    }

    #[test]
    fn test_syntax_and_single_value_violations() {
        let schema = Schema::default();
        let check = |modification: Modification| {
            schema.check_modifications(
                vec![modification].into_iter().collect(),
                &context(true),
            )
        };
        assert_eq!(
            check(Modification::add("uidNumber", ["12", "x"])).unwrap_err(),
            ConstraintError::violation("uidNumber: multiple values provided")
        );
        let err = check(Modification::add("uidNumber", ["twelve"])).unwrap_err();
        assert_eq!(err.kind, ConstraintKind::InvalidAttributeSyntax);
        assert_eq!(err.message, "uidNumber: value #0 invalid per syntax (not an integer)");
        let err = check(Modification::add("member", ["cn=ok,dc=com", "garbage"])).unwrap_err();
        assert_eq!(err.kind, ConstraintKind::InvalidAttributeSyntax);
        assert!(err.message.starts_with("member: value #1 invalid per syntax"));
    }

    #[test]
    fn test_dn_values_resolve_type_aliases() {
        let checked = Schema::default()
            .check_modifications(
                vec![Modification::add(
                    "member",
                    ["cn=Bob,dc=x", "commonName=BOB,dc=x", "2.5.4.3=bob,DC=X"],
                )]
                .into_iter()
                .collect(),
                &context(true),
            )
            .unwrap();
        let member = checked.pending().next().unwrap();
        let normalized: Vec<&[u8]> = member.values.iter().map(|v| v.normalized()).collect();
        assert_eq!(
            normalized,
            vec![b"cn=bob,dc=x".as_slice(); 3]
        );
        assert_eq!(member.values[1].raw(), b"commonName=BOB,dc=x");
    }

    #[test]
    fn test_consumed_slots_are_skipped() {
        let schema = Schema::default();
        let mut modifications: ModificationList =
            vec![Modification::add("cn", ["Bob"]), Modification::add("sn", ["Smith"])]
                .into_iter()
                .collect();
        modifications.take(0);
        let checked = schema
            .check_modifications(modifications, &context(true))
            .unwrap();
        assert!(matches!(checked.slots()[0], ModificationSlot::Consumed(_)));
        assert_eq!(names(&checked), vec!["sn"]);
    }
}
