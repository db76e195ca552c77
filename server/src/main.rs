#![forbid(unsafe_code)]
#![forbid(non_ascii_idents)]

mod cli;
mod configuration;
mod ldap_server;
mod logging;

use crate::{
    cli::{Command, GeneralConfigOpts, RunOpts},
    configuration::Configuration,
};
use actix_server::ServerBuilder;
use anyhow::{Context, Result};
use ldapd_domain::types::AttributeName;
use ldapd_domain_handlers::handler::ReplicationLogHandler;
use ldapd_ldap::{
    AddHandler, PluginRegistry,
    plugins::{AuditPlugin, RequiredAttributesPlugin},
};
use ldapd_memory_backend::{
    MemoryBackendHandler,
    replication_log::{FileReplicationLog, NoopReplicationLog},
};
use ldapd_schema::Schema;
use std::{path::Path, sync::Arc};
use tracing::{debug, info, instrument};

fn build_add_handler(config: &Configuration) -> Result<AddHandler<MemoryBackendHandler>> {
    let schema = Arc::new(Schema::default().with_unknown_attributes(config.allow_unknown_attributes));
    let directory = config.directory_info(schema.as_ref())?;
    let bind_users = config.bind_users(schema.as_ref())?;
    let replication_log: Arc<dyn ReplicationLogHandler> = match &config.replication_log_file {
        Some(path) => Arc::new(
            FileReplicationLog::open(Path::new(path))
                .with_context(|| format!("while opening the replication log {path}"))?,
        ),
        None => Arc::new(NoopReplicationLog),
    };
    let backend_handler = MemoryBackendHandler::new(schema.clone(), bind_users, replication_log);
    let mut plugins = PluginRegistry::new();
    if !config.required_attributes.is_empty() {
        let required_attributes = config
            .required_attributes
            .iter()
            .map(|name| AttributeName::new(name))
            .collect();
        plugins = plugins.register(Arc::new(RequiredAttributesPlugin::new(required_attributes)));
    }
    let plugins = plugins.register(Arc::new(AuditPlugin));
    Ok(AddHandler::new(
        backend_handler,
        Arc::new(directory),
        schema,
        plugins,
    ))
}

#[instrument(skip_all)]
fn set_up_server(config: Configuration) -> Result<ServerBuilder> {
    info!("Starting ldapd version {}", env!("CARGO_PKG_VERSION"));

    let add_handler = Arc::new(build_add_handler(&config)?);
    info!(
        backends = add_handler.directory().backends().len(),
        "Directory loaded"
    );
    let server_builder = ldap_server::build_ldap_server(&config, add_handler, ServerBuilder::new())
        .context("while binding the LDAP server")?;
    Ok(server_builder)
}

async fn run_server_command(opts: RunOpts) -> Result<()> {
    debug!("CLI: {:#?}", &opts);

    let config = configuration::init(opts)?;
    logging::init(&config)?;

    let server = set_up_server(config)?.workers(1);
    server.run().await.context("while starting the server")
}

fn check_config_command(opts: GeneralConfigOpts) -> Result<()> {
    let config = configuration::init(opts)?;
    let add_handler = build_add_handler(&config)?;
    let directory = add_handler.directory();
    for backend in directory.backends() {
        let suffixes: Vec<_> = backend.suffixes.iter().map(ToString::to_string).collect();
        println!(
            "{}: suffixes [{}], add {}, replication {:?}",
            backend.id,
            suffixes.join("; "),
            if backend.supports_add { "enabled" } else { "disabled" },
            backend.replication,
        );
    }
    if !directory.default_referrals().is_empty() {
        println!(
            "Default referrals: {}",
            directory.default_referrals().join(" ")
        );
    }
    println!("Subschema subentry: {}", directory.subschema_dn());
    println!("Configuration is valid");
    Ok(())
}

#[actix::main]
async fn main() -> Result<()> {
    let cli_opts = cli::init();
    match cli_opts.command {
        Command::Run(opts) => run_server_command(opts).await,
        Command::CheckConfig(opts) => check_config_command(opts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{BackendOptions, ConfigurationBuilder};
    use ldapd_domain::{
        backend::{BackendId, ReplicationRole},
        error::{AddError, ConstraintKind},
        modification::{Modification, ModificationList},
    };
    use ldapd_domain_handlers::handler::AddOutcome;
    use pretty_assertions::assert_eq;

    const ADMIN: &str = "cn=admin,dc=example,dc=com";

    fn config(required_attributes: Option<Vec<String>>) -> Configuration {
        let mut builder = ConfigurationBuilder::default().backends(vec![BackendOptions {
            name: "example".to_string(),
            suffixes: vec!["dc=example,dc=com".to_string()],
            supports_add: true,
            read_only: false,
            require_authentication: false,
            update_dn: Some(ADMIN.to_string()),
            update_referrals: vec![],
            replication: ReplicationRole::SingleMaster,
        }]);
        if let Some(required_attributes) = required_attributes {
            builder = builder.required_attributes(required_attributes);
        }
        builder.build().unwrap()
    }

    fn add_bob(
        add_handler: &AddHandler<MemoryBackendHandler>,
    ) -> ldapd_domain::error::Result<AddOutcome> {
        let admin = add_handler.dn_normalizer().normalize_dn(ADMIN).unwrap();
        let suffix: ModificationList = vec![
            Modification::add("objectClass", ["domain"]),
            Modification::add("dc", ["example"]),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            add_handler.add_entry("dc=example,dc=com", suffix, Some(&admin), false),
            Ok(AddOutcome::Committed)
        );
        let bob: ModificationList = vec![
            Modification::add("cn", ["Bob"]),
            Modification::add("sn", ["Jones"]),
            Modification::add("mail", ["bob@example.com"]),
        ]
        .into_iter()
        .collect();
        add_handler.add_entry("cn=Bob,dc=example,dc=com", bob, Some(&admin), false)
    }

    #[test]
    fn test_default_configuration_commits_plain_entry() {
        let add_handler = build_add_handler(&config(None)).unwrap();
        assert_eq!(add_bob(&add_handler), Ok(AddOutcome::Committed));
        let bob = add_handler
            .dn_normalizer()
            .normalize_dn("cn=Bob,dc=example,dc=com")
            .unwrap();
        let entry = add_handler
            .backend_handler()
            .get_entry(&BackendId::new("example"), &bob)
            .unwrap();
        let names: Vec<&str> = entry.attribute_names().map(|name| name.as_str()).collect();
        assert_eq!(names[..3], ["cn", "sn", "mail"]);
    }

    #[test]
    fn test_configured_required_attributes_are_enforced() {
        let add_handler =
            build_add_handler(&config(Some(vec!["objectClass".to_string()]))).unwrap();
        let err = match add_bob(&add_handler) {
            Err(AddError::ConstraintViolation(err)) => err,
            other => panic!("Unexpected result: {other:?}"),
        };
        assert_eq!(err.kind, ConstraintKind::ObjectClassViolation);
        assert_eq!(err.message, "no objectClass information");
    }
}
