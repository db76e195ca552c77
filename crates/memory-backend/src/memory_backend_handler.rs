use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, RwLock},
};

use ldapd_domain::{
    backend::BackendId,
    dn::DistinguishedName,
    entry::Entry,
    error::ConstraintError,
    modification::ModificationList,
    replication::ReplicationRecord,
    types::AttributeType,
};
use ldapd_domain_handlers::handler::{
    OperationContext, ReplicationLogHandler, SchemaHandler,
};
use ldapd_schema::Schema;
use secstr::SecUtf8;

/// Entries of one backend, keyed by normalized DN.
pub(crate) type Partition = BTreeMap<String, Entry>;

#[derive(Clone)]
pub struct BindUser {
    pub dn: DistinguishedName,
    pub password: SecUtf8,
}

impl std::fmt::Debug for BindUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindUser")
            .field("dn", &self.dn)
            .finish_non_exhaustive()
    }
}

/// Keeps every backend's entries in memory, and delegates schema checks and
/// replication logging.
pub struct MemoryBackendHandler {
    pub(crate) schema: Arc<Schema>,
    pub(crate) partitions: RwLock<HashMap<BackendId, Partition>>,
    pub(crate) bind_users: Vec<BindUser>,
    replication_log: Arc<dyn ReplicationLogHandler>,
}

impl MemoryBackendHandler {
    pub fn new(
        schema: Arc<Schema>,
        bind_users: Vec<BindUser>,
        replication_log: Arc<dyn ReplicationLogHandler>,
    ) -> Self {
        Self {
            schema,
            partitions: RwLock::default(),
            bind_users,
            replication_log,
        }
    }

    /// Number of entries stored for `backend`.
    pub fn entry_count(&self, backend: &BackendId) -> usize {
        self.partitions
            .read()
            .map(|partitions| partitions.get(backend).map_or(0, Partition::len))
            .unwrap_or_default()
    }

    pub fn get_entry(&self, backend: &BackendId, dn: &DistinguishedName) -> Option<Entry> {
        self.partitions
            .read()
            .ok()?
            .get(backend)?
            .get(dn.normalized())
            .cloned()
    }
}

impl SchemaHandler for MemoryBackendHandler {
    fn resolve_attribute_type(&self, name: &str) -> Option<AttributeType> {
        self.schema.resolve_attribute_type(name)
    }

    fn check_modifications(
        &self,
        modifications: ModificationList,
        context: &OperationContext,
    ) -> Result<ModificationList, ConstraintError> {
        self.schema.check_modifications(modifications, context)
    }
}

impl ReplicationLogHandler for MemoryBackendHandler {
    fn log_replication(&self, record: ReplicationRecord) {
        self.replication_log.log_replication(record)
    }
}
