#![forbid(unsafe_code)]
#![forbid(non_ascii_idents)]

pub mod backend;
pub mod dn;
pub mod entry;
pub mod error;
pub mod modification;
pub mod replication;
pub mod types;
