use ldap3_proto::{control::LdapControl, proto::LdapAttribute};
use ldapd_domain::modification::{Modification, ModificationList};

/// ManageDsaIT (RFC 3296): operate on referral objects and subordinate
/// suffix entries instead of following them.
pub const OID_MANAGE_DSA_IT: &str = "2.16.840.1.113730.3.4.2";

pub fn is_manage_dsa_it(controls: &[LdapControl]) -> bool {
    controls
        .iter()
        .any(|control| matches!(control, LdapControl::Unknown { oid, .. } if oid == OID_MANAGE_DSA_IT))
}

/// One pending modification per attribute of the request, in request order.
/// Type names and values are kept as sent.
pub fn modifications_from_attributes(attributes: Vec<LdapAttribute>) -> ModificationList {
    attributes
        .into_iter()
        .map(|attribute| Modification::add(&attribute.atype, attribute.vals))
        .collect()
}
