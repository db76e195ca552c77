use crate::{
    dn::DistinguishedName,
    types::{AttributeName, AttributeType, Value},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    attribute_type: AttributeType,
    values: Vec<Value>,
}

impl Attribute {
    pub fn new(attribute_type: AttributeType, values: Vec<Value>) -> Self {
        Self {
            attribute_type,
            values,
        }
    }

    pub fn attribute_type(&self) -> &AttributeType {
        &self.attribute_type
    }

    pub fn name(&self) -> &AttributeName {
        self.attribute_type.name()
    }

    /// Values in insertion order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn raw_values(&self) -> impl Iterator<Item = &[u8]> {
        self.values.iter().map(Value::raw)
    }

    pub fn extend_values(&mut self, values: Vec<Value>) {
        self.values.extend(values);
    }
}

/// An entry being assembled for, or handed over to, a storage engine.
///
/// Attribute types are unique within an entry: the assembler either creates a
/// new attribute or merges into the existing one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    dn: DistinguishedName,
    attributes: Vec<Attribute>,
}

impl Entry {
    pub fn new(dn: DistinguishedName) -> Self {
        Self {
            dn,
            attributes: Vec::new(),
        }
    }

    pub fn dn(&self) -> &DistinguishedName {
        &self.dn
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &AttributeName) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name() == name)
    }

    pub fn attribute_mut(&mut self, attribute_type: &AttributeType) -> Option<&mut Attribute> {
        self.attributes
            .iter_mut()
            .find(|a| a.attribute_type() == attribute_type)
    }

    pub fn has_attribute(&self, name: &AttributeName) -> bool {
        self.attribute(name).is_some()
    }

    pub fn push_attribute(&mut self, attribute: Attribute) {
        debug_assert!(
            !self.has_attribute(attribute.name()),
            "attribute {} is already present",
            attribute.name()
        );
        self.attributes.push(attribute);
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &AttributeName> {
        self.attributes.iter().map(Attribute::name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Syntax;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_entry_attribute_lookup() {
        let cn = AttributeType::new("cn", "2.5.4.3", Syntax::DirectoryString).build();
        let mut entry = Entry::new(DistinguishedName::new("cn=Bob", "cn=bob"));
        entry.push_attribute(Attribute::new(cn.clone(), vec!["Bob".into()]));
        assert!(entry.has_attribute(&AttributeName::new("CN")));
        assert!(!entry.has_attribute(&AttributeName::new("sn")));
        entry
            .attribute_mut(&cn)
            .unwrap()
            .extend_values(vec!["Robert".into()]);
        assert_eq!(
            entry
                .attribute(&"cn".into())
                .unwrap()
                .raw_values()
                .collect::<Vec<_>>(),
            vec![b"Bob".as_slice(), b"Robert".as_slice()]
        );
    }
}
