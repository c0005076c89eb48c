//! # Lineage - crash-safe schema migration for on-disk stores
//!
//! Lineage evolves a persistent store across any number of schema versions
//! without losing data. Given a store whose version is not known up front, it
//! determines that version, plans the chain of single-version steps up to the
//! target and applies them to scratch copies. The original store is replaced
//! in one atomic rename only after the whole chain succeeded.
//!
//! ## Key Features
//!
//! - **Linear version history**: versions are registered once, oldest first
//! - **Version detection**: stores are recognised by their metadata header
//! - **Crash safety**: the original store is never written before the final swap
//! - **Pluggable storage**: any engine implementing [`store::StoreFormatProvider`]
//! - **Reference format**: a journaled single-file store for tests and small apps
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lineage::migration::{MigrationEngine, StepTransformers};
//! use lineage::store::{rewrite_records, StoreMetadata};
//! use lineage::version::{SchemaFingerprint, VersionRegistry};
//!
//! let registry = VersionRegistry::builder()
//!     .version("v1", SchemaFingerprint::new("app/v1"))
//!     .version("v2", SchemaFingerprint::new("app/v2"))
//!     .build()?;
//!
//! let engine = MigrationEngine::builder()
//!     .registry(registry)
//!     .transformer(StepTransformers::new().register("v1", "v2", |input, output| {
//!         rewrite_records(input, output, StoreMetadata::new("app/v2"), |record| {
//!             Ok(Some(record.to_vec()))
//!         })
//!     }))
//!     .build()?;
//!
//! let report = engine.migrate_to_latest(Path::new("/data/app.store"))?;
//! ```
//!
//! ## Module Organization
//!
//! - [`common`] - Shared constants and lock helpers
//! - [`errors`] - Error types and result definitions
//! - [`migration`] - Planner, transformers and the migration engine
//! - [`store`] - Store formats, inspection, swapping and scratch space
//! - [`version`] - Schema versions and the version registry

pub mod common;
pub mod errors;
pub mod migration;
pub mod store;
pub mod version;

pub use errors::{ErrorKind, MigrationError, MigrationResult};
pub use migration::{MigrationEngine, MigrationReport, MigrationState};
pub use version::{SchemaVersion, VersionRegistry};

#[cfg(test)]
#[ctor::ctor]
fn init() {
    colog::init();
}
