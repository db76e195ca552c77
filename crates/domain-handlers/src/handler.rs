use chrono::{DateTime, Utc};
use ldapd_domain::{
    backend::BackendDescriptor,
    dn::DistinguishedName,
    entry::Entry,
    error::{AddError, BindError, ConstraintError, InvalidDn, StorageError},
    modification::ModificationList,
    replication::ReplicationRecord,
    types::AttributeType,
};

#[derive(Clone, PartialEq, Eq)]
pub struct BindRequest {
    pub dn: DistinguishedName,
    pub password: String,
}

impl std::fmt::Debug for BindRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindRequest")
            .field("dn", &self.dn)
            .field("password", &"***********")
            .finish()
    }
}

/// What the schema check needs to know about the write being checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationContext {
    pub requester: Option<DistinguishedName>,
    /// Replayed by a replication channel: operational attributes come with
    /// the change and must not be injected again.
    pub replicated: bool,
    pub time: DateTime<Utc>,
}

/// Successful results of an add.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Committed,
    /// Not an error: the client should retry against one of these URIs.
    Referral(Vec<String>),
}

pub trait DnNormalizer: Send + Sync {
    fn normalize_dn(&self, raw: &str) -> Result<DistinguishedName, InvalidDn>;
}

pub trait SchemaHandler: Send + Sync {
    fn resolve_attribute_type(&self, name: &str) -> Option<AttributeType>;

    /// Resolves, validates and normalizes every modification, and, unless the
    /// write is replicated, appends the operational attributes.
    fn check_modifications(
        &self,
        modifications: ModificationList,
        context: &OperationContext,
    ) -> Result<ModificationList, ConstraintError>;
}

pub trait StorageHandler: Send + Sync {
    /// Takes ownership of the entry whatever the result.
    fn add_entry(&self, backend: &BackendDescriptor, entry: Entry) -> Result<(), StorageError>;

    /// Referral URIs of the closest referral object above `dn`, if any.
    fn get_referrals(
        &self,
        backend: &BackendDescriptor,
        dn: &DistinguishedName,
    ) -> Option<Vec<String>>;
}

pub trait ReplicationLogHandler: Send + Sync {
    /// Fire and forget: failures are the log's own business.
    fn log_replication(&self, record: ReplicationRecord);
}

pub trait LoginHandler: Send + Sync {
    fn bind(&self, request: &BindRequest) -> Result<(), BindError>;
}

pub trait DirectoryBackendHandler: StorageHandler + SchemaHandler + ReplicationLogHandler {}

impl<T: StorageHandler + SchemaHandler + ReplicationLogHandler> DirectoryBackendHandler for T {}

/// Which way the add went once the backend was known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddPath {
    Originating,
    Replicated,
    Redirected,
    Unsupported,
}

pub struct PluginContext<'a> {
    pub dn: &'a DistinguishedName,
    pub backend: &'a BackendDescriptor,
    pub requester: Option<&'a DistinguishedName>,
    pub path: AddPath,
}

/// Extension points of the add operation. Plugins run in registration order.
pub trait AddPlugin: Send + Sync {
    fn id(&self) -> &'static str;

    /// Runs once the entry is assembled; on redirected or unsupported paths
    /// the entry only carries its DN. An error aborts the add.
    fn pre_add(
        &self,
        _context: &PluginContext<'_>,
        _entry: &mut Entry,
    ) -> Result<(), ConstraintError> {
        Ok(())
    }

    /// Observes the final result. Errors are logged and otherwise ignored.
    fn post_add(
        &self,
        _context: &PluginContext<'_>,
        _result: &Result<AddOutcome, AddError>,
    ) -> Result<(), String> {
        Ok(())
    }
}
