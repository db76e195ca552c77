use std::sync::Arc;

use ldapd_domain::{
    backend::BackendDescriptor,
    dn::DistinguishedName,
    entry::Entry,
    error::{BindError, ConstraintError, StorageError},
    modification::ModificationList,
    replication::ReplicationRecord,
    types::AttributeType,
};
use ldapd_domain_handlers::handler::*;
use ldapd_schema::Schema;

mockall::mock! {
    pub TestBackendHandler{}
    impl StorageHandler for TestBackendHandler {
        fn add_entry(&self, backend: &BackendDescriptor, entry: Entry) -> Result<(), StorageError>;
        fn get_referrals(&self, backend: &BackendDescriptor, dn: &DistinguishedName) -> Option<Vec<String>>;
    }
    impl SchemaHandler for TestBackendHandler {
        fn resolve_attribute_type(&self, name: &str) -> Option<AttributeType>;
        fn check_modifications(
            &self,
            modifications: ModificationList,
            context: &OperationContext,
        ) -> Result<ModificationList, ConstraintError>;
    }
    impl ReplicationLogHandler for TestBackendHandler {
        fn log_replication(&self, record: ReplicationRecord);
    }
    impl LoginHandler for TestBackendHandler {
        fn bind(&self, request: &BindRequest) -> Result<(), BindError>;
    }
}

/// Routes every schema call of the mock to the built-in schema.
pub fn setup_default_schema(mock: &mut MockTestBackendHandler) -> Arc<Schema> {
    let schema = Arc::new(Schema::default());
    let resolver = schema.clone();
    mock.expect_resolve_attribute_type()
        .returning(move |name| resolver.resolve(name));
    let checker = schema.clone();
    mock.expect_check_modifications()
        .returning(move |modifications, context| checker.check_modifications(modifications, context));
    schema
}

/// Makes every referral lookup come back empty.
pub fn setup_no_referral_objects(mock: &mut MockTestBackendHandler) {
    mock.expect_get_referrals().returning(|_, _| None);
}
