use ldapd_domain::{
    error::{ConstraintError, ConstraintKind},
    modification::{Modification, ModificationList},
    types::{AttributeName, Value},
};
use ldapd_domain_handlers::handler::OperationContext;
use tracing::debug;

use crate::{matching::format_generalized_time, schema::Schema};

/// Appends the server maintained attributes of a new entry. Attributes the
/// list already carries are left alone.
pub(crate) fn add_operational_attributes(
    schema: &Schema,
    modifications: &mut ModificationList,
    context: &OperationContext,
) -> Result<(), ConstraintError> {
    let requester = context
        .requester
        .as_ref()
        .map(|dn| dn.name().to_owned())
        .unwrap_or_default();
    let timestamp = format_generalized_time(&context.time);
    let generated = [
        ("creatorsName", requester.clone()),
        ("createTimestamp", timestamp.clone()),
        ("modifiersName", requester),
        ("modifyTimestamp", timestamp),
        ("entryUUID", uuid::Uuid::new_v4().hyphenated().to_string()),
    ];
    for (name, raw) in generated {
        if modifications.contains(&AttributeName::new(name)) {
            continue;
        }
        let attribute_type = schema
            .resolve(name)
            .ok_or_else(|| ConstraintError::undefined_type(name))?;
        let mut value = Value::from(raw);
        let normalized = schema
            .normalize_value(&attribute_type, value.raw())
            .map_err(|reason| {
                ConstraintError::new(
                    ConstraintKind::Other,
                    format!("{name}: cannot normalize generated value ({reason})"),
                )
            })?;
        if let Some(normalized) = normalized {
            value.set_normalized(normalized);
        }
        debug!(attribute = name, "Adding operational attribute");
        modifications.push(Modification::add(name, [value]).with_type(attribute_type));
    }
    Ok(())
}
