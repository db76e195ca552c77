use clap::{Args, Parser, Subcommand};

/// ldapd is a directory server handling LDAP add requests
#[derive(Debug, Parser, Clone)]
#[clap(version, author)]
pub struct CLIOpts {
    /// Export
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the LDAP server.
    #[clap(name = "run")]
    Run(RunOpts),
    /// Load and validate the configuration, print the backend table and exit.
    #[clap(name = "check-config")]
    CheckConfig(GeneralConfigOpts),
}

#[derive(Debug, Args, Clone)]
pub struct GeneralConfigOpts {
    /// Change config file name.
    #[clap(
        short,
        long,
        default_value = "ldapd_config.toml",
        env = "LDAPD_CONFIG_FILE"
    )]
    pub config_file: String,

    /// Set verbose logging.
    #[clap(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Args, Clone)]
pub struct RunOpts {
    #[clap(flatten)]
    pub general_config: GeneralConfigOpts,

    /// Change ldap host. Default: "0.0.0.0"
    #[clap(long, env = "LDAPD_LDAP_HOST")]
    pub ldap_host: Option<String>,

    /// Change ldap port. Default: 3890
    #[clap(long, env = "LDAPD_LDAP_PORT")]
    pub ldap_port: Option<u16>,
}

pub fn init() -> CLIOpts {
    CLIOpts::parse()
}
