use std::{cmp::Ordering, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::error::MatchError;

fn compare_str_case_insensitive(s1: &str, s2: &str) -> Ordering {
    let mut it_1 = s1.chars().flat_map(|c| c.to_lowercase());
    let mut it_2 = s2.chars().flat_map(|c| c.to_lowercase());
    loop {
        match (it_1.next(), it_2.next()) {
            (Some(c1), Some(c2)) => {
                let o = c1.cmp(&c2);
                if o != Ordering::Equal {
                    return o;
                }
            }
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
        }
    }
}

/// Attribute description as written by the client. Comparisons ignore case, but
/// the original spelling is kept for error messages and replication records.
#[derive(Clone, Default, Serialize, Deserialize, derive_more::Debug, derive_more::Display)]
#[debug(r#""{_0}""#)]
#[display("{_0}")]
pub struct AttributeName(String);

impl PartialEq for AttributeName {
    fn eq(&self, other: &Self) -> bool {
        compare_str_case_insensitive(&self.0, &other.0) == Ordering::Equal
    }
}

impl Eq for AttributeName {}

impl PartialOrd for AttributeName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AttributeName {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_str_case_insensitive(&self.0, &other.0)
    }
}

impl std::hash::Hash for AttributeName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_lowercase().hash(state)
    }
}

impl AttributeName {
    pub fn new(raw: &str) -> Self {
        Self(raw.to_owned())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for AttributeName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AttributeName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A single attribute value: the bytes sent by the client, and the normalized
/// form computed by the attribute's equality rule, if any.
///
/// Keeping both forms in one value means the two sequences can never drift
/// apart in length or order.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Value {
    #[serde(with = "serde_bytes")]
    raw: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    normalized: Option<Vec<u8>>,
}

impl Value {
    pub fn new(raw: impl Into<Vec<u8>>) -> Self {
        Self {
            raw: raw.into(),
            normalized: None,
        }
    }

    pub fn with_normalized(raw: impl Into<Vec<u8>>, normalized: impl Into<Vec<u8>>) -> Self {
        Self {
            raw: raw.into(),
            normalized: Some(normalized.into()),
        }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The form used for comparisons. Falls back to the raw bytes when no
    /// normalized form was computed.
    pub fn normalized(&self) -> &[u8] {
        self.normalized.as_deref().unwrap_or(&self.raw)
    }

    pub fn has_normalized(&self) -> bool {
        self.normalized.is_some()
    }

    pub fn set_normalized(&mut self, normalized: Vec<u8>) {
        self.normalized = Some(normalized);
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match std::str::from_utf8(&self.raw) {
            Ok(s) => write!(f, "{s:?}"),
            Err(_) => write!(f, "<{} bytes>", self.raw.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::new(s.into_bytes())
    }
}

impl From<Vec<u8>> for Value {
    fn from(raw: Vec<u8>) -> Self {
        Self::new(raw)
    }
}

impl From<&[u8]> for Value {
    fn from(raw: &[u8]) -> Self {
        Self::new(raw)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Syntax {
    DirectoryString,
    Ia5String,
    OctetString,
    Integer,
    DistinguishedName,
    TelephoneNumber,
    GeneralizedTime,
    Uuid,
}

/// The equality capability of an attribute type.
///
/// `normalize` fails with a human readable reason when the value does not
/// conform to what the rule can compare. `matches` receives normalized forms.
pub trait MatchingRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn normalize(&self, raw: &[u8]) -> Result<Vec<u8>, String>;

    fn matches(&self, left: &[u8], right: &[u8]) -> Result<bool, MatchError> {
        Ok(left == right)
    }
}

pub struct AttributeTypeDefinition {
    pub name: AttributeName,
    pub oid: String,
    pub syntax: Syntax,
    pub equality: Option<Arc<dyn MatchingRule>>,
    pub single_value: bool,
    pub no_user_modification: bool,
}

/// Resolved attribute type, cheap to clone and shared by every attribute and
/// modification that refers to it.
#[derive(Clone)]
pub struct AttributeType(Arc<AttributeTypeDefinition>);

impl AttributeType {
    pub fn new(name: &str, oid: &str, syntax: Syntax) -> AttributeTypeBuilder {
        AttributeTypeBuilder(AttributeTypeDefinition {
            name: AttributeName::new(name),
            oid: oid.to_owned(),
            syntax,
            equality: None,
            single_value: false,
            no_user_modification: false,
        })
    }

    pub fn name(&self) -> &AttributeName {
        &self.0.name
    }

    pub fn oid(&self) -> &str {
        &self.0.oid
    }

    pub fn syntax(&self) -> Syntax {
        self.0.syntax
    }

    pub fn equality(&self) -> Option<&dyn MatchingRule> {
        self.0.equality.as_deref()
    }

    pub fn is_single_value(&self) -> bool {
        self.0.single_value
    }

    pub fn is_no_user_modification(&self) -> bool {
        self.0.no_user_modification
    }
}

impl PartialEq for AttributeType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl Eq for AttributeType {}

impl std::fmt::Debug for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AttributeType")
            .field(&self.0.name.as_str())
            .finish()
    }
}

pub struct AttributeTypeBuilder(AttributeTypeDefinition);

impl AttributeTypeBuilder {
    pub fn equality(mut self, rule: Arc<dyn MatchingRule>) -> Self {
        self.0.equality = Some(rule);
        self
    }

    pub fn single_value(mut self) -> Self {
        self.0.single_value = true;
        self
    }

    /// Server maintained: clients may not supply it on an originating write.
    pub fn no_user_modification(mut self) -> Self {
        self.0.no_user_modification = true;
        self
    }

    pub fn build(self) -> AttributeType {
        AttributeType(Arc::new(self.0))
    }
}
