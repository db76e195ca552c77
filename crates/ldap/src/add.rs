use std::sync::Arc;

use chrono::Utc;
use ldapd_domain::{
    backend::BackendDescriptor,
    dn::DistinguishedName,
    entry::Entry,
    error::{AddError, Result},
    modification::ModificationList,
    replication::ReplicationRecord,
};
use ldapd_domain_handlers::handler::{
    AddOutcome, AddPath, DirectoryBackendHandler, DnNormalizer, OperationContext, PluginContext,
};
use tracing::{debug, info, instrument};

use crate::{
    assembler::assemble,
    authority::{authorize, Authorization},
    core::referral::rewrite_referrals,
    plugins::PluginRegistry,
    router::{DirectoryInfo, Route},
};

fn check_modification_shape(modifications: &ModificationList) -> Result<()> {
    if modifications.is_empty() {
        return Err(AddError::NoAttributesProvided);
    }
    match modifications.pending().find(|m| m.values.is_empty()) {
        Some(empty) => Err(AddError::NoValuesForType(empty.raw_type.clone())),
        None => Ok(()),
    }
}

fn check_restrictions(backend: &BackendDescriptor, requester: Option<&DistinguishedName>) -> Result<()> {
    if backend.restrictions.read_only {
        return Err(AddError::UnwillingToPerform("operation restricted".to_string()));
    }
    if backend.restrictions.require_authentication && requester.is_none() {
        return Err(AddError::InsufficientAccess(
            "authentication required".to_string(),
        ));
    }
    Ok(())
}

/// Runs one add request from the raw DN to a committed entry, a referral or
/// a typed error.
pub struct AddHandler<Backend> {
    backend_handler: Backend,
    directory: Arc<DirectoryInfo>,
    dn_normalizer: Arc<dyn DnNormalizer>,
    plugins: PluginRegistry,
}

impl<Backend: DirectoryBackendHandler> AddHandler<Backend> {
    pub fn new(
        backend_handler: Backend,
        directory: Arc<DirectoryInfo>,
        dn_normalizer: Arc<dyn DnNormalizer>,
        plugins: PluginRegistry,
    ) -> Self {
        Self {
            backend_handler,
            directory,
            dn_normalizer,
            plugins,
        }
    }

    pub fn backend_handler(&self) -> &Backend {
        &self.backend_handler
    }

    pub fn directory(&self) -> &DirectoryInfo {
        &self.directory
    }

    pub fn dn_normalizer(&self) -> &dyn DnNormalizer {
        self.dn_normalizer.as_ref()
    }

    #[instrument(skip_all, level = "debug", fields(dn = %raw_dn, manage_dsa_it))]
    pub fn add_entry(
        &self,
        raw_dn: &str,
        modifications: ModificationList,
        requester: Option<&DistinguishedName>,
        manage_dsa_it: bool,
    ) -> Result<AddOutcome> {
        let dn = self.dn_normalizer.normalize_dn(raw_dn)?;
        debug!(normalized = %dn.normalized(), "DN normalized");
        if let Some(reserved) = self.directory.reserved_entry(&dn) {
            return Err(AddError::ReservedEntryExists(reserved));
        }
        check_modification_shape(&modifications)?;
        let backend = match self.directory.route(&dn, manage_dsa_it) {
            Route::Backend(backend) => backend,
            Route::Referral(referrals) => {
                debug!(?referrals, "No local backend, referring");
                return Ok(AddOutcome::Referral(referrals));
            }
            Route::Unroutable => return Err(AddError::NoBackend),
        };
        debug!(backend = %backend.id, "Routed");
        let authorization = backend.supports_add.then(|| {
            authorize(backend, requester, &dn, self.directory.default_referrals())
        });
        let path = match &authorization {
            None => AddPath::Unsupported,
            Some(Authorization::Originate) => AddPath::Originating,
            Some(Authorization::AcceptReplicated) => AddPath::Replicated,
            Some(Authorization::Redirect(_)) => AddPath::Redirected,
        };
        let context = PluginContext {
            dn: &dn,
            backend,
            requester,
            path,
        };
        let result =
            self.add_to_backend(&context, authorization, modifications, manage_dsa_it);
        self.plugins.run_post_add(&context, &result);
        result
    }

    fn add_to_backend(
        &self,
        context: &PluginContext<'_>,
        authorization: Option<Authorization>,
        modifications: ModificationList,
        manage_dsa_it: bool,
    ) -> Result<AddOutcome> {
        let (dn, backend) = (context.dn, context.backend);
        check_restrictions(backend, context.requester)?;
        if !manage_dsa_it {
            if let Some(referrals) = self.backend_handler.get_referrals(backend, dn) {
                debug!(?referrals, "Target is below a referral object");
                return Ok(AddOutcome::Referral(rewrite_referrals(&referrals, dn)));
            }
        }
        let replication_trusted = match authorization {
            None => {
                self.plugins.run_pre_add(context, &mut Entry::new(dn.clone()))?;
                return Err(AddError::UnwillingToPerform(
                    "operation not supported within naming context".to_string(),
                ));
            }
            Some(Authorization::Redirect(referrals)) => {
                self.plugins.run_pre_add(context, &mut Entry::new(dn.clone()))?;
                if referrals.is_empty() {
                    return Err(AddError::UnwillingToPerform("referral missing".to_string()));
                }
                debug!(?referrals, "Redirecting to the update source");
                return Ok(AddOutcome::Referral(referrals));
            }
            Some(Authorization::Originate) => false,
            Some(Authorization::AcceptReplicated) => true,
        };
        debug!(replication_trusted, "Authorized");
        let operation = OperationContext {
            requester: context.requester.cloned(),
            replicated: replication_trusted,
            time: Utc::now(),
        };
        let mut modifications = self
            .backend_handler
            .check_modifications(modifications, &operation)?;
        let mut entry = Entry::new(dn.clone());
        assemble(
            &mut entry,
            &mut modifications,
            replication_trusted,
            &self.backend_handler,
        )?;
        debug!(attributes = entry.attributes().len(), "Entry assembled");
        self.plugins.run_pre_add(context, &mut entry)?;
        let record = (!replication_trusted)
            .then(|| ReplicationRecord::for_add(backend.id.clone(), &entry, operation.time));
        self.backend_handler.add_entry(backend, entry)?;
        if let Some(record) = record {
            self.backend_handler.log_replication(record);
        }
        info!(dn = %dn, backend = %backend.id, "Entry committed");
        Ok(AddOutcome::Committed)
    }
}
