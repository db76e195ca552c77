use ldap3_proto::proto::{LdapAddRequest, LdapOp, LdapResult as LdapResultOp, LdapResultCode};
use ldapd_domain::dn::DistinguishedName;
use ldapd_domain_handlers::handler::{AddOutcome, DirectoryBackendHandler};
use tracing::{debug, instrument};

use crate::{
    add::AddHandler,
    core::{
        error::{LdapError, LdapResult},
        utils::modifications_from_attributes,
    },
};

pub(crate) fn make_add_response(code: LdapResultCode, message: String) -> LdapOp {
    LdapOp::AddResponse(LdapResultOp {
        code,
        matcheddn: "".to_string(),
        message,
        referral: vec![],
    })
}

pub(crate) fn make_add_error_response(error: LdapError) -> LdapOp {
    LdapOp::AddResponse(LdapResultOp {
        code: error.code,
        matcheddn: error.matched_dn,
        message: error.message,
        referral: vec![],
    })
}

pub(crate) fn make_add_referral(referrals: Vec<String>) -> LdapOp {
    LdapOp::AddResponse(LdapResultOp {
        code: LdapResultCode::Referral,
        matcheddn: "".to_string(),
        message: "".to_string(),
        referral: referrals,
    })
}

#[instrument(skip_all, level = "debug", fields(dn = %request.dn, manage_dsa_it))]
pub(crate) fn add_entry<Backend: DirectoryBackendHandler>(
    add_handler: &AddHandler<Backend>,
    request: LdapAddRequest,
    requester: Option<&DistinguishedName>,
    manage_dsa_it: bool,
) -> LdapResult<Vec<LdapOp>> {
    let modifications = modifications_from_attributes(request.attributes);
    let outcome = add_handler.add_entry(&request.dn, modifications, requester, manage_dsa_it)?;
    debug!(?outcome);
    Ok(vec![match outcome {
        AddOutcome::Committed => make_add_response(LdapResultCode::Success, "".to_string()),
        AddOutcome::Referral(referrals) => make_add_referral(referrals),
    }])
}
