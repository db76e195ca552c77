use ldapd_domain::{
    entry::Attribute,
    error::{AddError, Result},
    types::{AttributeType, MatchingRule, Value},
};
use tracing::debug;

#[derive(Debug, PartialEq, Eq)]
pub enum Resolution {
    /// No attribute of that type existed yet.
    Created(Attribute),
    /// The values were appended to the existing attribute.
    Merged,
}

fn values_match(rule: Option<&dyn MatchingRule>, left: &Value, right: &Value) -> bool {
    match rule {
        Some(rule) => rule
            .matches(left.normalized(), right.normalized())
            .unwrap_or_else(|e| {
                debug!("{e}, comparing normalized forms");
                left.normalized() == right.normalized()
            }),
        None => left.raw() == right.raw(),
    }
}

/// Positions `(first, later)` of the earliest repeated value, ordered by the
/// later position.
pub fn find_duplicate(rule: Option<&dyn MatchingRule>, values: &[Value]) -> Option<(usize, usize)> {
    (1..values.len()).find_map(|later| {
        (0..later)
            .find(|&first| values_match(rule, &values[first], &values[later]))
            .map(|first| (first, later))
    })
}

/// Adds `values` of `attribute_type` to an entry that may already hold an
/// attribute of that type.
///
/// Outside a trusted replay a repeated type is an error. Trusted replays are
/// appended as they come, without looking for repeated values.
pub fn merge_or_reject(
    existing: Option<&mut Attribute>,
    attribute_type: &AttributeType,
    mut values: Vec<Value>,
    replication_trusted: bool,
) -> Result<Resolution> {
    match existing {
        None => {
            if let Some((first_index, index)) = find_duplicate(attribute_type.equality(), &values)
            {
                return Err(AddError::DuplicateValue {
                    attribute: attribute_type.name().clone(),
                    index,
                    first_index,
                });
            }
            Ok(Resolution::Created(Attribute::new(
                attribute_type.clone(),
                values,
            )))
        }
        Some(_) if !replication_trusted => Err(AddError::DuplicateAttributeType(
            attribute_type.name().clone(),
        )),
        Some(attribute) => {
            if attribute.values().iter().any(Value::has_normalized) {
                for value in values.iter_mut().filter(|v| !v.has_normalized()) {
                    value.set_normalized(value.raw().to_vec());
                }
            }
            attribute.extend_values(values);
            Ok(Resolution::Merged)
        }
    }
}
