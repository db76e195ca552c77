use crate::types::{AttributeName, AttributeType, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModificationKind {
    Add,
}

/// One type/values pair of an add request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Modification {
    pub kind: ModificationKind,
    /// The attribute description as sent by the client.
    pub raw_type: String,
    /// Filled in by the schema check; `None` until then.
    pub attribute_type: Option<AttributeType>,
    pub values: Vec<Value>,
}

impl Modification {
    pub fn add<V: Into<Value>>(raw_type: &str, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            kind: ModificationKind::Add,
            raw_type: raw_type.to_owned(),
            attribute_type: None,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_type(mut self, attribute_type: AttributeType) -> Self {
        self.attribute_type = Some(attribute_type);
        self
    }

    /// Resolved type name if available, else the raw description.
    pub fn name(&self) -> AttributeName {
        match &self.attribute_type {
            Some(t) => t.name().clone(),
            None => AttributeName::new(&self.raw_type),
        }
    }
}

/// A modification list node. Once its values have been moved into an entry
/// attribute, the node only remembers which attribute it fed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModificationSlot {
    Pending(Modification),
    Consumed(AttributeName),
}

/// Ordered, exclusively owned list of the modifications of one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModificationList {
    slots: Vec<ModificationSlot>,
}

impl ModificationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, modification: Modification) {
        self.slots.push(ModificationSlot::Pending(modification));
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[ModificationSlot] {
        &self.slots
    }

    pub fn pending(&self) -> impl Iterator<Item = &Modification> {
        self.slots.iter().filter_map(|slot| match slot {
            ModificationSlot::Pending(m) => Some(m),
            ModificationSlot::Consumed(_) => None,
        })
    }

    pub fn pending_mut(&mut self) -> impl Iterator<Item = &mut Modification> {
        self.slots.iter_mut().filter_map(|slot| match slot {
            ModificationSlot::Pending(m) => Some(m),
            ModificationSlot::Consumed(_) => None,
        })
    }

    /// Moves the modification at `index` out of the list, leaving a consumed
    /// marker behind. Returns `None` if it was already consumed.
    pub fn take(&mut self, index: usize) -> Option<Modification> {
        let slot = self.slots.get_mut(index)?;
        let name = match slot {
            ModificationSlot::Pending(m) => m.name(),
            ModificationSlot::Consumed(_) => return None,
        };
        match std::mem::replace(slot, ModificationSlot::Consumed(name)) {
            ModificationSlot::Pending(m) => Some(m),
            ModificationSlot::Consumed(_) => None,
        }
    }

    pub fn is_fully_consumed(&self) -> bool {
        self.slots
            .iter()
            .all(|slot| matches!(slot, ModificationSlot::Consumed(_)))
    }

    pub fn contains(&self, name: &AttributeName) -> bool {
        self.pending().any(|m| &m.name() == name)
    }
}

impl FromIterator<Modification> for ModificationList {
    fn from_iter<T: IntoIterator<Item = Modification>>(iter: T) -> Self {
        Self {
            slots: iter.into_iter().map(ModificationSlot::Pending).collect(),
        }
    }
}

impl Extend<Modification> for ModificationList {
    fn extend<T: IntoIterator<Item = Modification>>(&mut self, iter: T) {
        self.slots
            .extend(iter.into_iter().map(ModificationSlot::Pending));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_take_marks_slot_consumed() {
        let mut mods: ModificationList = [
            Modification::add("cn", ["Bob"]),
            Modification::add("sn", ["Jones"]),
        ]
        .into_iter()
        .collect();
        let cn = mods.take(0).unwrap();
        assert_eq!(cn.values, vec![Value::from("Bob")]);
        assert_eq!(mods.take(0), None);
        assert_eq!(
            mods.slots()[0],
            ModificationSlot::Consumed(AttributeName::new("cn"))
        );
        assert!(!mods.is_fully_consumed());
        assert_eq!(mods.pending().count(), 1);
        mods.take(1).unwrap();
        assert!(mods.is_fully_consumed());
        assert_eq!(mods.take(2), None);
    }
}
