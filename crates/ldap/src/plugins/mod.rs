use std::sync::Arc;

use ldapd_domain::{
    entry::Entry,
    error::{AddError, ConstraintError},
};
use ldapd_domain_handlers::handler::{AddOutcome, AddPlugin, PluginContext};
use tracing::{debug, warn};

pub mod audit;
pub mod required_attributes;

pub use audit::AuditPlugin;
pub use required_attributes::RequiredAttributesPlugin;

/// Plugins of the add operation, called in registration order.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn AddPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, plugin: Arc<dyn AddPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Stops at the first plugin that rejects the entry.
    pub fn run_pre_add(
        &self,
        context: &PluginContext<'_>,
        entry: &mut Entry,
    ) -> Result<(), ConstraintError> {
        for plugin in &self.plugins {
            plugin.pre_add(context, entry).inspect_err(|e| {
                debug!(plugin = plugin.id(), "Add rejected: {e}");
            })?;
        }
        Ok(())
    }

    pub fn run_post_add(
        &self,
        context: &PluginContext<'_>,
        result: &Result<AddOutcome, AddError>,
    ) {
        for plugin in &self.plugins {
            if let Err(e) = plugin.post_add(context, result) {
                warn!(plugin = plugin.id(), "Post-add plugin failed: {e}");
            }
        }
    }
}
