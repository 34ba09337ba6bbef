//! Persistence layer, where completed profiles are written.

pub mod libsql_backend;
pub mod memory;
mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlProfileStore;
pub use memory::MemoryProfileStore;
pub use traits::ProfileStore;
