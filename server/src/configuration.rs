use std::collections::HashSet;

use crate::cli::{GeneralConfigOpts, RunOpts};
use anyhow::{Context, Result, bail};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use ldapd_domain::{
    backend::{BackendDescriptor, ReplicationRole, Restrictions},
    dn::DistinguishedName,
};
use ldapd_domain_handlers::handler::DnNormalizer;
use ldapd_ldap::DirectoryInfo;
use ldapd_memory_backend::BindUser;
use secstr::SecUtf8;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct BackendOptions {
    pub name: String,
    pub suffixes: Vec<String>,
    #[serde(default = "default_true")]
    pub supports_add: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub require_authentication: bool,
    #[serde(default)]
    pub update_dn: Option<String>,
    #[serde(default)]
    pub update_referrals: Vec<String>,
    #[serde(default)]
    pub replication: ReplicationRole,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BindUserOptions {
    pub dn: String,
    pub password: SecUtf8,
}

#[derive(Clone, Deserialize, Serialize, derive_builder::Builder, Debug)]
#[builder(pattern = "owned")]
pub struct Configuration {
    #[builder(default = r#"String::from("0.0.0.0")"#)]
    pub ldap_host: String,
    #[builder(default = "3890")]
    pub ldap_port: u16,
    #[builder(default = "false")]
    pub verbose: bool,
    #[builder(default = r#"String::from("cn=Subschema")"#)]
    pub subschema_dn: String,
    #[builder(default)]
    pub default_referrals: Vec<String>,
    #[builder(default)]
    pub replication_log_file: Option<String>,
    #[builder(default = "false")]
    pub allow_unknown_attributes: bool,
    #[builder(default)]
    pub required_attributes: Vec<String>,
    #[builder(default)]
    pub bind_users: Vec<BindUserOptions>,
    #[builder(default)]
    pub backends: Vec<BackendOptions>,
}

impl std::default::Default for Configuration {
    fn default() -> Self {
        ConfigurationBuilder::default().build().unwrap()
    }
}

fn normalize(normalizer: &dyn DnNormalizer, raw: &str, what: &str) -> Result<DistinguishedName> {
    normalizer
        .normalize_dn(raw)
        .with_context(|| format!("Invalid {what} in configuration: {raw}"))
}

impl BackendOptions {
    fn to_descriptor(&self, normalizer: &dyn DnNormalizer) -> Result<BackendDescriptor> {
        let suffixes = self
            .suffixes
            .iter()
            .map(|suffix| normalize(normalizer, suffix, "backend suffix"))
            .collect::<Result<Vec<_>>>()?;
        if suffixes.iter().any(|suffix| suffix.is_root()) {
            bail!("backend `{}` cannot serve the root DSE", self.name);
        }
        let mut descriptor = BackendDescriptor::new(&self.name, suffixes);
        descriptor.supports_add = self.supports_add;
        descriptor.restrictions = Restrictions {
            read_only: self.read_only,
            require_authentication: self.require_authentication,
        };
        descriptor.update_dn = self
            .update_dn
            .as_deref()
            .map(|dn| normalize(normalizer, dn, "update_dn"))
            .transpose()?;
        descriptor.update_referrals = self.update_referrals.clone();
        descriptor.replication = self.replication.clone();
        if descriptor.is_consumer() && descriptor.update_dn.is_none() {
            bail!(
                "backend `{}` consumes a replication stream but has no update_dn",
                self.name
            );
        }
        Ok(descriptor)
    }
}

impl Configuration {
    /// Validates the backend table. The result is never mutated afterwards.
    pub fn directory_info(&self, normalizer: &dyn DnNormalizer) -> Result<DirectoryInfo> {
        let backends = self
            .backends
            .iter()
            .map(|backend| backend.to_descriptor(normalizer))
            .collect::<Result<Vec<_>>>()?;
        let subschema_dn = normalize(normalizer, &self.subschema_dn, "subschema_dn")?;
        Ok(DirectoryInfo::new(
            backends,
            self.default_referrals.clone(),
            subschema_dn,
        )?)
    }

    pub fn bind_users(&self, normalizer: &dyn DnNormalizer) -> Result<Vec<BindUser>> {
        self.bind_users
            .iter()
            .map(|user| {
                Ok(BindUser {
                    dn: normalize(normalizer, &user.dn, "bind user DN")?,
                    password: user.password.clone(),
                })
            })
            .collect()
    }
}

pub trait ConfigOverrider {
    fn override_config(&self, config: &mut Configuration);
}

pub trait TopLevelCommandOpts {
    fn general_config(&self) -> &GeneralConfigOpts;
}

impl TopLevelCommandOpts for RunOpts {
    fn general_config(&self) -> &GeneralConfigOpts {
        &self.general_config
    }
}

impl TopLevelCommandOpts for GeneralConfigOpts {
    fn general_config(&self) -> &GeneralConfigOpts {
        self
    }
}

impl ConfigOverrider for RunOpts {
    fn override_config(&self, config: &mut Configuration) {
        self.general_config.override_config(config);

        if let Some(host) = self.ldap_host.as_ref() {
            config.ldap_host.clone_from(host);
        }

        if let Some(port) = self.ldap_port {
            config.ldap_port = port;
        }
    }
}

impl ConfigOverrider for GeneralConfigOpts {
    fn override_config(&self, config: &mut Configuration) {
        if self.verbose {
            config.verbose = true;
        }
    }
}

fn extract_keys(dict: &figment::value::Dict) -> HashSet<String> {
    use figment::value::{Dict, Value};
    fn process_value(value: &Dict, keys: &mut HashSet<String>, path: &mut Vec<String>) {
        for (key, value) in value {
            match value {
                Value::Dict(_, dict) => {
                    path.push(format!("{}__", key.to_ascii_uppercase()));
                    process_value(dict, keys, path);
                    path.pop();
                }
                _ => {
                    keys.insert(format!(
                        "LDAPD_{}{}",
                        path.join(""),
                        key.to_ascii_uppercase()
                    ));
                }
            }
        }
    }
    let mut keys = HashSet::new();
    let mut path = Vec::new();
    process_value(dict, &mut keys, &mut path);
    keys
}

fn expected_keys(dict: &figment::value::Dict) -> HashSet<String> {
    let mut keys = extract_keys(dict);
    // CLI-only values.
    keys.insert("LDAPD_CONFIG_FILE".to_string());
    // Not part of the defaults, since they are optional.
    keys.insert("LDAPD_REPLICATION_LOG_FILE".to_string());
    // Logging switches, read by the logging setup.
    keys.insert("LDAPD_RAW_LOG".to_string());
    keys.insert("LDAPD_LOCAL_TZ_LOG".to_string());
    keys
}

pub fn init<C>(overrides: C) -> Result<Configuration>
where
    C: TopLevelCommandOpts + ConfigOverrider,
{
    println!(
        "Loading configuration from {}",
        &overrides.general_config().config_file
    );

    let env_variable_provider = || Env::prefixed("LDAPD_").split("__");
    let figment_config = Figment::from(Serialized::defaults(Configuration::default()))
        .merge(Toml::file(&overrides.general_config().config_file))
        .merge(env_variable_provider());
    let mut config: Configuration = figment_config
        .extract()
        .context("while parsing the configuration")?;

    overrides.override_config(&mut config);
    if config.verbose {
        println!("Configuration: {:#?}", &config);
    }
    {
        use figment::{Profile, Provider};
        let expected_keys = expected_keys(
            &Figment::from(Serialized::defaults(Configuration::default()))
                .data()
                .context("while listing the configuration keys")?[&Profile::default()],
        );
        if let Some(env_keys) = env_variable_provider().data()?.get(&Profile::default()) {
            extract_keys(env_keys)
                .iter()
                .filter(|k| !expected_keys.contains(k.as_str()))
                .for_each(|k| {
                    eprintln!("WARNING: Unknown environment variable: {}", k);
                });
        }
    }
    Ok(config)
}
