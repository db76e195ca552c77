use crate::configuration::Configuration;
use std::env;
use tracing_subscriber::{
    filter::EnvFilter, fmt::time::ChronoLocal, layer::SubscriberExt, util::SubscriberInitExt,
};

pub fn init(config: &Configuration) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if config.verbose { "debug" } else { "info" }));
    let registry = tracing_subscriber::registry().with(env_filter);

    let raw_logs = env::var("LDAPD_RAW_LOG").is_ok();
    let local_tz = env::var("LDAPD_LOCAL_TZ_LOG").is_ok();

    if local_tz {
        registry
            .with(tracing_subscriber::fmt::layer().with_timer(ChronoLocal::rfc_3339()))
            .try_init()?;
    } else if raw_logs {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    } else {
        registry
            .with(tracing_forest::ForestLayer::default())
            .try_init()?;
    }

    Ok(())
}
