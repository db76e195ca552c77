use ldapd_domain::error::AddError;
use ldapd_domain_handlers::handler::{AddOutcome, AddPlugin, PluginContext};
use tracing::info;

/// Logs the outcome of every add.
pub struct AuditPlugin;

impl AddPlugin for AuditPlugin {
    fn id(&self) -> &'static str {
        "audit"
    }

    fn post_add(
        &self,
        context: &PluginContext<'_>,
        result: &Result<AddOutcome, AddError>,
    ) -> Result<(), String> {
        let requester = context
            .requester
            .map(|dn| dn.to_string())
            .unwrap_or_else(|| "<anonymous>".to_string());
        match result {
            Ok(AddOutcome::Committed) => info!(
                dn = %context.dn,
                backend = %context.backend.id,
                %requester,
                path = ?context.path,
                "Entry added"
            ),
            Ok(AddOutcome::Referral(referrals)) => info!(
                dn = %context.dn,
                %requester,
                ?referrals,
                "Add referred"
            ),
            Err(e) => info!(dn = %context.dn, %requester, "Add failed: {e}"),
        }
        Ok(())
    }
}
