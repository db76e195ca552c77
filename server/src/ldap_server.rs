use crate::configuration::Configuration;
use actix_rt::net::TcpStream;
use actix_server::ServerBuilder;
use actix_service::{ServiceFactoryExt, fn_service};
use anyhow::{Context, Result};
use ldap3_proto::{LdapCodec, control::LdapControl, proto::LdapMsg};
use ldapd_domain_handlers::handler::{DirectoryBackendHandler, LoginHandler};
use ldapd_ldap::{AddHandler, LdapHandler, core::utils::OID_MANAGE_DSA_IT};
use std::sync::Arc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

#[instrument(skip_all, level = "info", name = "LDAP request", fields(session_id = %session.session_uuid()))]
async fn handle_ldap_message<Backend, Writer>(
    msg: Result<LdapMsg, std::io::Error>,
    resp: &mut Writer,
    session: &mut LdapHandler<Backend>,
) -> Result<bool>
where
    Backend: DirectoryBackendHandler + LoginHandler,
    Writer: futures_util::Sink<LdapMsg> + Unpin,
    <Writer as futures_util::Sink<LdapMsg>>::Error: std::error::Error + Send + Sync + 'static,
{
    use futures_util::SinkExt;
    let msg = msg.context("while receiving LDAP op")?;
    for control in msg.ctrl.iter() {
        if let LdapControl::Unknown { oid, .. } = control {
            if oid != OID_MANAGE_DSA_IT {
                info!("Received unknown control: {}, ignoring", oid);
            }
        }
    }
    debug!(?msg);
    match session.handle_ldap_message(msg.op, &msg.ctrl) {
        None => return Ok(false),
        Some(result) => {
            if result.is_empty() {
                debug!("No response");
            }
            for response in result.into_iter() {
                debug!(?response);
                resp.send(LdapMsg {
                    msgid: msg.msgid,
                    op: response,
                    ctrl: vec![],
                })
                .await
                .context("while sending a response")?
            }

            resp.flush()
                .await
                .context("while flushing responses")?
        }
    }
    Ok(true)
}

async fn handle_ldap_stream<Stream, Backend>(
    stream: Stream,
    add_handler: Arc<AddHandler<Backend>>,
) -> Result<Stream>
where
    Backend: DirectoryBackendHandler + LoginHandler + 'static,
    Stream: tokio::io::AsyncRead + tokio::io::AsyncWrite + std::marker::Unpin,
{
    use tokio_stream::StreamExt;
    let (r, w) = tokio::io::split(stream);
    // Configure the codec etc.
    let mut requests = FramedRead::new(r, LdapCodec::default());
    let mut resp = FramedWrite::new(w, LdapCodec::default());

    let session_uuid = Uuid::new_v4();
    let mut session = LdapHandler::new(add_handler, session_uuid);

    info!("LDAP session start: {}", session_uuid);
    while let Some(msg) = requests.next().await {
        if !handle_ldap_message(msg, &mut resp, &mut session)
            .await
            .context("while handling incoming messages")?
        {
            break;
        }
    }
    info!("LDAP session end: {}", session_uuid);
    Ok(requests.into_inner().unsplit(resp.into_inner()))
}

pub fn build_ldap_server<Backend>(
    config: &Configuration,
    add_handler: Arc<AddHandler<Backend>>,
    server_builder: ServerBuilder,
) -> Result<ServerBuilder>
where
    Backend: DirectoryBackendHandler + LoginHandler + 'static,
{
    let binder = move || {
        let add_handler = add_handler.clone();
        fn_service(move |stream: TcpStream| {
            let add_handler = add_handler.clone();
            async move { handle_ldap_stream(stream, add_handler).await }
        })
        .map_err(|err: anyhow::Error| error!("[LDAP] Service Error: {:#}", err))
    };

    info!("Starting the LDAP server on port {}", config.ldap_port);
    server_builder
        .bind("ldap", (config.ldap_host.clone(), config.ldap_port), binder)
        .with_context(|| format!("while binding to the port {}", config.ldap_port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::SinkExt;
    use ldap3_proto::proto::{
        LdapAddRequest, LdapAttribute, LdapBindCred, LdapBindRequest, LdapOp, LdapResultCode,
    };
    use ldapd_domain::{backend::BackendDescriptor, backend::BackendId};
    use ldapd_domain_handlers::handler::DnNormalizer;
    use ldapd_ldap::{DirectoryInfo, PluginRegistry};
    use ldapd_memory_backend::{BindUser, MemoryBackendHandler, replication_log::NoopReplicationLog};
    use ldapd_schema::Schema;
    use pretty_assertions::assert_eq;
    use secstr::SecUtf8;
    use tokio_stream::StreamExt;

    fn add_handler() -> Arc<AddHandler<MemoryBackendHandler>> {
        let schema = Arc::new(Schema::default());
        let directory = DirectoryInfo::new(
            vec![BackendDescriptor::new(
                "example",
                vec![schema.normalize_dn("dc=example,dc=com").unwrap()],
            )],
            Vec::new(),
            schema.normalize_dn("cn=Subschema").unwrap(),
        )
        .unwrap();
        let backend_handler = MemoryBackendHandler::new(
            schema.clone(),
            vec![BindUser {
                dn: schema.normalize_dn("cn=admin,dc=example,dc=com").unwrap(),
                password: SecUtf8::from("secret"),
            }],
            Arc::new(NoopReplicationLog),
        );
        Arc::new(AddHandler::new(
            backend_handler,
            Arc::new(directory),
            schema,
            PluginRegistry::new(),
        ))
    }

    fn add_request(msgid: i32, dn: &str, attributes: Vec<(&str, &str)>) -> LdapMsg {
        LdapMsg {
            msgid,
            op: LdapOp::AddRequest(LdapAddRequest {
                dn: dn.to_string(),
                attributes: attributes
                    .into_iter()
                    .map(|(atype, value)| LdapAttribute {
                        atype: atype.to_string(),
                        vals: vec![value.as_bytes().to_vec()],
                    })
                    .collect(),
            }),
            ctrl: vec![],
        }
    }

    fn result_code(msg: &LdapMsg) -> LdapResultCode {
        match &msg.op {
            LdapOp::BindResponse(response) => response.res.code.clone(),
            LdapOp::AddResponse(response) => response.code.clone(),
            other => panic!("Unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ldap_session() {
        let add_handler = add_handler();
        let (client, server) = tokio::io::duplex(64 * 1024);
        let session = tokio::spawn(handle_ldap_stream(server, add_handler.clone()));
        let (r, w) = tokio::io::split(client);
        let mut responses = FramedRead::new(r, LdapCodec::default());
        let mut requests = FramedWrite::new(w, LdapCodec::default());

        requests
            .send(LdapMsg {
                msgid: 1,
                op: LdapOp::BindRequest(LdapBindRequest {
                    dn: "cn=admin,dc=example,dc=com".to_string(),
                    cred: LdapBindCred::Simple("secret".to_string()),
                }),
                ctrl: vec![],
            })
            .await
            .unwrap();
        let response = responses.next().await.unwrap().unwrap();
        assert_eq!(response.msgid, 1);
        assert_eq!(result_code(&response), LdapResultCode::Success);

        requests
            .send(add_request(
                2,
                "dc=example,dc=com",
                vec![("objectClass", "domain"), ("dc", "example")],
            ))
            .await
            .unwrap();
        let response = responses.next().await.unwrap().unwrap();
        assert_eq!(response.msgid, 2);
        assert_eq!(result_code(&response), LdapResultCode::Success);

        requests
            .send(add_request(
                3,
                "cn=Bob,ou=people,dc=example,dc=com",
                vec![("objectClass", "person"), ("cn", "Bob")],
            ))
            .await
            .unwrap();
        let response = responses.next().await.unwrap().unwrap();
        assert_eq!(result_code(&response), LdapResultCode::NoSuchObject);

        requests
            .send(LdapMsg {
                msgid: 4,
                op: LdapOp::UnbindRequest,
                ctrl: vec![],
            })
            .await
            .unwrap();
        session.await.unwrap().unwrap();
        assert_eq!(
            add_handler
                .backend_handler()
                .entry_count(&BackendId::new("example")),
            1
        );
    }
}
