#![forbid(unsafe_code)]
#![forbid(non_ascii_idents)]

pub mod dn;
pub mod matching;
mod opattrs;
pub mod schema;
pub mod syntax;

pub use schema::Schema;
