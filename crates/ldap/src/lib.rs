pub mod add;
pub mod assembler;
pub mod authority;
pub mod core;
pub(crate) mod create;
pub(crate) mod handler;
pub mod plugins;
pub mod resolver;
pub mod router;

pub use add::AddHandler;
pub use crate::core::error::{LdapError, LdapResult};
pub use handler::LdapHandler;
pub use plugins::PluginRegistry;
pub use router::{ConfigurationError, DirectoryInfo};
