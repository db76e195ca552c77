#![forbid(unsafe_code)]

pub mod memory_backend_handler;
mod memory_login_handler;
mod memory_storage_handler;
pub mod replication_log;

pub use memory_backend_handler::{BindUser, MemoryBackendHandler};
