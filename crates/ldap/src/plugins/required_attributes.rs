use ldapd_domain::{
    entry::Entry,
    error::{ConstraintError, ConstraintKind},
    types::AttributeName,
};
use ldapd_domain_handlers::handler::{AddPath, AddPlugin, PluginContext};

/// Rejects originating adds missing any of the configured attributes.
/// Replicated adds are trusted to be complete.
pub struct RequiredAttributesPlugin {
    required: Vec<AttributeName>,
}

impl RequiredAttributesPlugin {
    pub fn new(required: Vec<AttributeName>) -> Self {
        Self { required }
    }
}

impl AddPlugin for RequiredAttributesPlugin {
    fn id(&self) -> &'static str {
        "required_attributes"
    }

    fn pre_add(&self, context: &PluginContext<'_>, entry: &mut Entry) -> Result<(), ConstraintError> {
        if context.path != AddPath::Originating {
            return Ok(());
        }
        match self.required.iter().find(|name| !entry.has_attribute(name)) {
            Some(missing) => Err(ConstraintError::new(
                ConstraintKind::ObjectClassViolation,
                format!("no {missing} information"),
            )),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldapd_domain::{
        backend::BackendDescriptor,
        dn::DistinguishedName,
        entry::Attribute,
        types::{AttributeType, Syntax},
    };
    use pretty_assertions::assert_eq;

    fn check(path: AddPath, entry: &mut Entry) -> Result<(), ConstraintError> {
        let backend = BackendDescriptor::new("main", Vec::new());
        let dn = entry.dn().clone();
        let context = PluginContext {
            dn: &dn,
            backend: &backend,
            requester: None,
            path,
        };
        RequiredAttributesPlugin::new(vec!["objectClass".into()]).pre_add(&context, entry)
    }

    #[test]
    fn test_missing_required_attribute() {
        let mut entry = Entry::new(DistinguishedName::new("cn=bob", "cn=bob"));
        assert_eq!(
            check(AddPath::Originating, &mut entry),
            Err(ConstraintError::new(
                ConstraintKind::ObjectClassViolation,
                "no objectClass information"
            ))
        );
        assert_eq!(check(AddPath::Replicated, &mut entry), Ok(()));
        entry.push_attribute(Attribute::new(
            AttributeType::new("objectClass", "2.5.4.0", Syntax::Ia5String).build(),
            vec!["person".into()],
        ));
        assert_eq!(check(AddPath::Originating, &mut entry), Ok(()));
    }
}
