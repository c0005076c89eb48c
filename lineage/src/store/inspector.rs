use super::{StoreFormat, StoreMetadata};
use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use crate::version::{SchemaVersion, VersionRegistry};
use itertools::Itertools;
use std::path::Path;

/// Resolves a store on disk to the registered schema version it was written in.
#[derive(Clone)]
pub struct StoreInspector {
    registry: VersionRegistry,
    format: StoreFormat,
}

impl StoreInspector {
    pub fn new(registry: VersionRegistry, format: StoreFormat) -> Self {
        StoreInspector { registry, format }
    }

    /// Reads the store's metadata header without modifying the store.
    pub fn read_metadata(&self, path: &Path) -> MigrationResult<StoreMetadata> {
        self.format.read_metadata(path)
    }

    /// Tests every registered descriptor against `metadata`, oldest version first.
    ///
    /// Returns `Ok(None)` when no version matches.
    ///
    /// # Errors
    ///
    /// More than one matching version means the version table is ambiguous and
    /// is reported as [`ErrorKind::ConfigurationError`].
    pub fn compatible_version(
        &self,
        metadata: &StoreMetadata,
    ) -> MigrationResult<Option<SchemaVersion>> {
        let matches = self
            .registry
            .descriptors()
            .filter(|(_, descriptor)| descriptor.is_compatible(metadata))
            .map(|(version, _)| version.clone());

        matches.at_most_one().map_err(|ambiguous| {
            let candidates = ambiguous.map(|v| v.identifier().to_string()).join(", ");
            log::error!(
                "Store metadata {} matches several schema versions: {}",
                metadata,
                candidates
            );
            MigrationError::new(
                &format!(
                    "Store metadata {} matches several schema versions: {}",
                    metadata, candidates
                ),
                ErrorKind::ConfigurationError,
            )
        })
    }

    /// Reads and resolves the version of the store at `path`.
    ///
    /// # Errors
    ///
    /// A store matching no registered version is a configuration error: the
    /// shipped version table does not know the shape it was written in.
    pub fn inspect(&self, path: &Path) -> MigrationResult<SchemaVersion> {
        let metadata = self.read_metadata(path)?;
        self.compatible_version(&metadata)?.ok_or_else(|| {
            log::error!(
                "Store {} with metadata {} matches no registered schema version",
                path.display(),
                metadata
            );
            MigrationError::new(
                &format!(
                    "Store {} with metadata {} matches no registered schema version",
                    path.display(),
                    metadata
                ),
                ErrorKind::ConfigurationError,
            )
        })
    }

    /// `true` unless the store at `path` is already at `target`.
    pub fn requires_migration(&self, path: &Path, target: &SchemaVersion) -> MigrationResult<bool> {
        let metadata = self.read_metadata(path)?;
        let current = self.compatible_version(&metadata)?;
        Ok(current.as_ref() != Some(target))
    }

    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }
}
