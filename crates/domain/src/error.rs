use thiserror::Error;

use crate::types::AttributeName;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid DN `{dn}`: {reason}")]
pub struct InvalidDn {
    pub dn: String,
    pub reason: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("matching rule `{0}` cannot compare these values")]
    Unavailable(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstraintKind {
    UndefinedAttributeType,
    InvalidAttributeSyntax,
    ObjectClassViolation,
    Violation,
    Other,
}

/// A rejection from schema checking or from a pre-add plugin.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ConstraintError {
    pub kind: ConstraintKind,
    pub message: String,
}

impl ConstraintError {
    pub fn new(kind: ConstraintKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn undefined_type(name: &str) -> Self {
        Self::new(
            ConstraintKind::UndefinedAttributeType,
            format!("{name}: attribute type undefined"),
        )
    }

    pub fn invalid_syntax(name: &AttributeName, index: usize, reason: &str) -> Self {
        Self::new(
            ConstraintKind::InvalidAttributeSyntax,
            format!("{name}: value #{index} invalid per syntax ({reason})"),
        )
    }

    pub fn violation(message: impl Into<String>) -> Self {
        Self::new(ConstraintKind::Violation, message)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("entry `{0}` already exists")]
    AlreadyExists(String),
    #[error("parent of `{dn}` does not exist")]
    NoSuchParent { dn: String, matched: String },
    #[error("backend `{0}` is busy")]
    Busy(String),
    #[error("storage error: {0}")]
    Other(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("invalid credentials")]
    InvalidCredentials,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, derive_more::Display)]
pub enum ReservedEntry {
    #[display("root DSE")]
    RootDse,
    #[display("subschema subentry")]
    SubschemaSubentry,
}

/// Every way an add can end other than a commit or a referral.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddError {
    #[error("invalid DN")]
    InvalidDnSyntax(#[from] InvalidDn),
    #[error("{0} already exists")]
    ReservedEntryExists(ReservedEntry),
    #[error("no attributes provided")]
    NoAttributesProvided,
    #[error("no values for attribute type `{0}`")]
    NoValuesForType(String),
    #[error("attribute '{0}' provided more than once")]
    DuplicateAttributeType(AttributeName),
    #[error("{attribute}: value #{index} provided more than once")]
    DuplicateValue {
        attribute: AttributeName,
        /// Position of the repeated value.
        index: usize,
        /// Position of the value it repeats.
        first_index: usize,
    },
    #[error(transparent)]
    ConstraintViolation(#[from] ConstraintError),
    #[error("referral missing")]
    NoBackend,
    #[error("{0}")]
    UnwillingToPerform(String),
    #[error("{0}")]
    InsufficientAccess(String),
    #[error(transparent)]
    StorageFailure(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, AddError>;
