use serde::{Deserialize, Serialize};

/// A distinguished name in both its pretty (as displayed) and normalized (as
/// compared and stored) forms. Equality only looks at the normalized form.
#[derive(Clone, Default, Serialize, Deserialize, derive_more::Debug, derive_more::Display)]
#[debug(r#""{name}""#)]
#[display("{name}")]
pub struct DistinguishedName {
    name: String,
    normalized: String,
}

impl PartialEq for DistinguishedName {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for DistinguishedName {}

impl std::hash::Hash for DistinguishedName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.normalized.hash(state)
    }
}

/// Returns the byte offsets of every RDN separator that is not escaped.
fn separator_positions(dn: &str) -> impl Iterator<Item = usize> + '_ {
    let bytes = dn.as_bytes();
    bytes.iter().enumerate().filter_map(move |(i, &b)| {
        if b != b',' {
            return None;
        }
        let backslashes = bytes[..i]
            .iter()
            .rev()
            .take_while(|&&c| c == b'\\')
            .count();
        (backslashes % 2 == 0).then_some(i)
    })
}

impl DistinguishedName {
    /// Both forms must already be valid; use a `DnNormalizer` to build one from
    /// client input.
    pub fn new(name: impl Into<String>, normalized: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            normalized: normalized.into(),
        }
    }

    pub fn root() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// The zero-length DN, naming the root DSE.
    pub fn is_root(&self) -> bool {
        self.normalized.is_empty()
    }

    pub fn rdn_count(&self) -> usize {
        if self.is_root() {
            0
        } else {
            separator_positions(&self.normalized).count() + 1
        }
    }

    /// Whether `suffix` names this entry or one of its ancestors. The root DN
    /// is a suffix of everything.
    pub fn is_within(&self, suffix: &DistinguishedName) -> bool {
        let suffix = suffix.normalized();
        if suffix.is_empty() || self.normalized == suffix {
            return true;
        }
        if suffix.len() >= self.normalized.len() || !self.normalized.ends_with(suffix) {
            return false;
        }
        let boundary = self.normalized.len() - suffix.len() - 1;
        separator_positions(&self.normalized).any(|i| i == boundary)
    }

    /// Normalized form of the immediate superior, `None` for the root DN.
    pub fn parent_normalized(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        Some(match separator_positions(&self.normalized).next() {
            Some(i) => &self.normalized[i + 1..],
            None => "",
        })
    }

    /// Normalized forms of every ancestor, closest first, root excluded.
    pub fn ancestors_normalized(&self) -> Vec<&str> {
        separator_positions(&self.normalized)
            .map(|i| &self.normalized[i + 1..])
            .collect()
    }
}
