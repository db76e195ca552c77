use std::sync::Arc;

use ldap3_proto::{
    control::LdapControl,
    proto::{
        LdapBindCred, LdapBindRequest, LdapBindResponse, LdapExtendedResponse, LdapOp,
        LdapResult as LdapResultOp, LdapResultCode,
    },
};
use ldapd_domain::dn::DistinguishedName;
use ldapd_domain_handlers::handler::{BindRequest, DirectoryBackendHandler, LoginHandler};
use tracing::{debug, instrument};

use crate::{
    add::AddHandler,
    core::{
        error::{LdapError, LdapResult},
        utils::is_manage_dsa_it,
    },
    create::{self, make_add_error_response},
};

pub(crate) fn make_extended_response(code: LdapResultCode, message: String) -> LdapOp {
    LdapOp::ExtendedResponse(LdapExtendedResponse {
        res: LdapResultOp {
            code,
            matcheddn: "".to_string(),
            message,
            referral: vec![],
        },
        name: None,
        value: None,
    })
}

pub(crate) fn make_bind_response(code: LdapResultCode, message: String) -> LdapOp {
    LdapOp::BindResponse(LdapBindResponse {
        res: LdapResultOp {
            code,
            matcheddn: "".to_string(),
            message,
            referral: vec![],
        },
        saslcreds: None,
    })
}

/// One LDAP session: the bound identity plus the shared add path.
pub struct LdapHandler<Backend> {
    bound_dn: Option<DistinguishedName>,
    add_handler: Arc<AddHandler<Backend>>,
    session_uuid: uuid::Uuid,
}

impl<Backend> LdapHandler<Backend> {
    pub fn session_uuid(&self) -> &uuid::Uuid {
        &self.session_uuid
    }

    pub fn bound_dn(&self) -> Option<&DistinguishedName> {
        self.bound_dn.as_ref()
    }
}

impl<Backend: DirectoryBackendHandler + LoginHandler> LdapHandler<Backend> {
    pub fn new(add_handler: Arc<AddHandler<Backend>>, session_uuid: uuid::Uuid) -> Self {
        Self {
            bound_dn: None,
            add_handler,
            session_uuid,
        }
    }

    /// An empty DN is an anonymous bind and clears the identity.
    fn bind(&self, request: &LdapBindRequest) -> LdapResult<Option<DistinguishedName>> {
        #[allow(unreachable_patterns)]
        let password = match &request.cred {
            LdapBindCred::Simple(password) => password,
            _ => {
                return Err(LdapError::new(
                    LdapResultCode::AuthMethodNotSupported,
                    "only simple binds are supported",
                ))
            }
        };
        let dn = self
            .add_handler
            .dn_normalizer()
            .normalize_dn(&request.dn)
            .map_err(|e| LdapError::new(LdapResultCode::InvalidDNSyntax, e.to_string()))?;
        if dn.is_root() {
            return Ok(None);
        }
        self.add_handler
            .backend_handler()
            .bind(&BindRequest {
                dn: dn.clone(),
                password: password.clone(),
            })
            .map_err(|e| LdapError::new(LdapResultCode::InvalidCredentials, e.to_string()))?;
        Ok(Some(dn))
    }

    #[instrument(skip_all, level = "debug", fields(dn = %request.dn))]
    pub fn do_bind(&mut self, request: &LdapBindRequest) -> Vec<LdapOp> {
        let (code, message) = match self.bind(request) {
            Ok(dn) => {
                debug!(anonymous = dn.is_none(), "Success!");
                self.bound_dn = dn;
                (LdapResultCode::Success, "".to_string())
            }
            Err(err) => {
                self.bound_dn = None;
                (err.code, err.message)
            }
        };
        vec![make_bind_response(code, message)]
    }

    pub fn handle_ldap_message(
        &mut self,
        ldap_op: LdapOp,
        controls: &[LdapControl],
    ) -> Option<Vec<LdapOp>> {
        Some(match ldap_op {
            LdapOp::BindRequest(request) => self.do_bind(&request),
            LdapOp::UnbindRequest => {
                debug!(
                    "Unbind request for {}",
                    self.bound_dn
                        .as_ref()
                        .map(DistinguishedName::name)
                        .unwrap_or("<not bound>"),
                );
                self.bound_dn = None;
                // No need to notify on unbind (per rfc4511)
                return None;
            }
            LdapOp::AddRequest(request) => create::add_entry(
                &self.add_handler,
                request,
                self.bound_dn.as_ref(),
                is_manage_dsa_it(controls),
            )
            .unwrap_or_else(|e: LdapError| vec![make_add_error_response(e)]),
            op => vec![make_extended_response(
                LdapResultCode::UnwillingToPerform,
                format!("Unsupported operation: {op:#?}"),
            )],
        })
    }
}
