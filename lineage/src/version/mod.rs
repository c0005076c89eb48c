//! Schema versions and the registry that chains them.
//!
//! A store is always written in exactly one [`SchemaVersion`]. The
//! [`VersionRegistry`] lists every version ever shipped, oldest first, and pairs
//! each one with a [`SchemaDescriptor`] able to recognise stores written in it.

mod descriptor;
mod registry;
mod schema_version;

pub use descriptor::{SchemaDescriptor, SchemaFingerprint};
pub use registry::{VersionRegistry, VersionRegistryBuilder};
pub use schema_version::SchemaVersion;
