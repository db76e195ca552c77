use ldapd_domain::{
    entry::Entry,
    error::{ConstraintError, Result},
    modification::ModificationList,
};
use ldapd_domain_handlers::handler::SchemaHandler;
use tracing::{debug, instrument};

use crate::resolver::{merge_or_reject, Resolution};

/// Moves every pending modification into `entry`, in order.
///
/// Stops at the first failure. Attributes attached before that point stay on
/// the entry, which the caller is expected to drop.
#[instrument(skip_all, level = "debug", fields(dn = %entry.dn(), replication_trusted))]
pub fn assemble<Handler: SchemaHandler + ?Sized>(
    entry: &mut Entry,
    modifications: &mut ModificationList,
    replication_trusted: bool,
    schema: &Handler,
) -> Result<()> {
    for index in 0..modifications.len() {
        let Some(modification) = modifications.take(index) else {
            continue;
        };
        let attribute_type = match modification.attribute_type {
            Some(attribute_type) => attribute_type,
            None => schema
                .resolve_attribute_type(&modification.raw_type)
                .ok_or_else(|| ConstraintError::undefined_type(&modification.raw_type))?,
        };
        match merge_or_reject(
            entry.attribute_mut(&attribute_type),
            &attribute_type,
            modification.values,
            replication_trusted,
        )? {
            Resolution::Created(attribute) => entry.push_attribute(attribute),
            Resolution::Merged => {
                debug!(attribute = %attribute_type.name(), "Merged repeated attribute")
            }
        }
    }
    Ok(())
}
