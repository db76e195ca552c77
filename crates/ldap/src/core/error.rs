use ldap3_proto::proto::LdapResultCode;
use ldapd_domain::error::{AddError, ConstraintKind, StorageError};

#[derive(Debug, PartialEq)]
pub struct LdapError {
    pub code: LdapResultCode,
    pub message: String,
    pub matched_dn: String,
}

impl LdapError {
    pub fn new(code: LdapResultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            matched_dn: String::new(),
        }
    }
}

impl std::fmt::Display for LdapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for LdapError {}

pub type LdapResult<T> = std::result::Result<T, LdapError>;

fn constraint_code(kind: ConstraintKind) -> LdapResultCode {
    match kind {
        ConstraintKind::UndefinedAttributeType => LdapResultCode::UndefinedAttributeType,
        ConstraintKind::InvalidAttributeSyntax => LdapResultCode::InvalidAttributeSyntax,
        ConstraintKind::ObjectClassViolation => LdapResultCode::ObjectClassViolation,
        ConstraintKind::Violation => LdapResultCode::ConstraintViolation,
        ConstraintKind::Other => LdapResultCode::Other,
    }
}

impl From<AddError> for LdapError {
    fn from(error: AddError) -> Self {
        let code = match &error {
            AddError::InvalidDnSyntax(_) => LdapResultCode::InvalidDNSyntax,
            AddError::ReservedEntryExists(_) => LdapResultCode::EntryAlreadyExists,
            AddError::NoAttributesProvided | AddError::NoValuesForType(_) => {
                LdapResultCode::ProtocolError
            }
            AddError::DuplicateAttributeType(_) | AddError::DuplicateValue { .. } => {
                LdapResultCode::AttributeOrValueExists
            }
            AddError::ConstraintViolation(e) => constraint_code(e.kind),
            AddError::NoBackend | AddError::UnwillingToPerform(_) => {
                LdapResultCode::UnwillingToPerform
            }
            AddError::InsufficientAccess(_) => LdapResultCode::InsufficentAccessRights,
            AddError::StorageFailure(StorageError::AlreadyExists(_)) => {
                LdapResultCode::EntryAlreadyExists
            }
            AddError::StorageFailure(StorageError::NoSuchParent { .. }) => {
                LdapResultCode::NoSuchObject
            }
            AddError::StorageFailure(StorageError::Busy(_)) => LdapResultCode::Busy,
            AddError::StorageFailure(StorageError::Other(_)) => LdapResultCode::OperationsError,
        };
        let matched_dn = match &error {
            AddError::StorageFailure(StorageError::NoSuchParent { matched, .. }) => {
                matched.clone()
            }
            _ => String::new(),
        };
        Self {
            code,
            message: error.to_string(),
            matched_dn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldapd_domain::error::{ConstraintError, InvalidDn, ReservedEntry};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_error_codes() {
        let cases = vec![
            (
                AddError::InvalidDnSyntax(InvalidDn {
                    dn: "x".to_string(),
                    reason: "bad".to_string(),
                }),
                LdapResultCode::InvalidDNSyntax,
            ),
            (
                AddError::ReservedEntryExists(ReservedEntry::RootDse),
                LdapResultCode::EntryAlreadyExists,
            ),
            (AddError::NoAttributesProvided, LdapResultCode::ProtocolError),
            (
                AddError::DuplicateAttributeType("cn".into()),
                LdapResultCode::AttributeOrValueExists,
            ),
            (
                ConstraintError::undefined_type("fooBar").into(),
                LdapResultCode::UndefinedAttributeType,
            ),
            (AddError::NoBackend, LdapResultCode::UnwillingToPerform),
            (
                AddError::InsufficientAccess("no".to_string()),
                LdapResultCode::InsufficentAccessRights,
            ),
            (
                StorageError::AlreadyExists("cn=bob".to_string()).into(),
                LdapResultCode::EntryAlreadyExists,
            ),
            (
                StorageError::Busy("main".to_string()).into(),
                LdapResultCode::Busy,
            ),
        ];
        for (error, code) in cases {
            assert_eq!(LdapError::from(error).code, code);
        }
    }

    #[test]
    fn test_missing_parent_reports_matched_dn() {
        let error = LdapError::from(AddError::from(StorageError::NoSuchParent {
            dn: "cn=bob,ou=people,dc=example,dc=com".to_string(),
            matched: "dc=example,dc=com".to_string(),
        }));
        assert_eq!(
            error,
            LdapError {
                code: LdapResultCode::NoSuchObject,
                message: "parent of `cn=bob,ou=people,dc=example,dc=com` does not exist"
                    .to_string(),
                matched_dn: "dc=example,dc=com".to_string(),
            }
        );
    }
}
