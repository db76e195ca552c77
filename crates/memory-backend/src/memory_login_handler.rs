use ldapd_domain::error::BindError;
use ldapd_domain_handlers::handler::{BindRequest, LoginHandler};
use secstr::SecUtf8;
use tracing::{debug, instrument};

use crate::memory_backend_handler::MemoryBackendHandler;

impl LoginHandler for MemoryBackendHandler {
    #[instrument(skip_all, level = "debug", err, fields(dn = %request.dn))]
    fn bind(&self, request: &BindRequest) -> Result<(), BindError> {
        let password = SecUtf8::from(request.password.as_str());
        match self.bind_users.iter().find(|user| user.dn == request.dn) {
            Some(user) if user.password == password => Ok(()),
            Some(_) => {
                debug!("Invalid password");
                Err(BindError::InvalidCredentials)
            }
            None => {
                debug!("No such bind user");
                Err(BindError::InvalidCredentials)
            }
        }
    }
}
