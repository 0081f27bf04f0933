//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_access_store;
mod postgres_access_repository;
mod postgres_audit_repository;

pub use in_memory_access_store::InMemoryAccessStore;
pub use postgres_access_repository::PostgresAccessRepository;
pub use postgres_audit_repository::PostgresAuditRepository;

/// Embedded schema migrations for the access-control tables.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();
