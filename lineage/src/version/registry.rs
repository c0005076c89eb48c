use super::{SchemaDescriptor, SchemaVersion};
use crate::common::INITIAL_ORDINAL;
use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use indexmap::IndexMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Ordered, immutable catalog of every schema version a store has ever been
/// written in.
///
/// The registry is a single linear chain: the first registered version is the
/// root, the last one is the latest, and every other version has exactly one
/// successor. It is built once at process start and never changes afterwards,
/// so clones share one inner table and can be handed to any number of threads.
///
/// # Examples
///
/// ```rust
/// use lineage::version::{SchemaFingerprint, VersionRegistry};
///
/// let registry = VersionRegistry::builder()
///     .version("v1", SchemaFingerprint::new("app/v1"))
///     .version("v2", SchemaFingerprint::new("app/v2"))
///     .build()
///     .unwrap();
///
/// let v1 = registry.get("v1").unwrap();
/// assert_eq!(registry.successor(&v1).unwrap().identifier(), "v2");
/// assert!(registry.successor(&registry.latest().unwrap()).is_none());
/// ```
#[derive(Clone)]
pub struct VersionRegistry {
    inner: Arc<VersionRegistryInner>,
}

impl VersionRegistry {
    pub fn builder() -> VersionRegistryBuilder {
        VersionRegistryBuilder::new()
    }

    /// Next version in the chain, or `None` when `version` is the latest or is
    /// not part of this registry.
    pub fn successor(&self, version: &SchemaVersion) -> Option<SchemaVersion> {
        let index = self.index_of(version)?;
        self.inner
            .entries
            .get_index(index + 1)
            .map(|(_, entry)| entry.version.clone())
    }

    /// The terminal (current) version.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no version was registered.
    pub fn latest(&self) -> MigrationResult<SchemaVersion> {
        self.inner
            .entries
            .last()
            .map(|(_, entry)| entry.version.clone())
            .ok_or_else(|| {
                log::error!("Version registry is empty, no latest version");
                MigrationError::new(
                    "Version registry is empty, no latest version",
                    ErrorKind::ConfigurationError,
                )
            })
    }

    /// The oldest version, where the chain starts.
    pub fn root(&self) -> MigrationResult<SchemaVersion> {
        self.inner
            .entries
            .first()
            .map(|(_, entry)| entry.version.clone())
            .ok_or_else(|| {
                log::error!("Version registry is empty, no root version");
                MigrationError::new(
                    "Version registry is empty, no root version",
                    ErrorKind::ConfigurationError,
                )
            })
    }

    /// Looks a version up by its identifier.
    pub fn get(&self, identifier: &str) -> Option<SchemaVersion> {
        self.inner
            .entries
            .get(identifier)
            .map(|entry| entry.version.clone())
    }

    pub fn contains(&self, version: &SchemaVersion) -> bool {
        self.index_of(version).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// All versions, oldest first.
    pub fn versions(&self) -> impl Iterator<Item = &SchemaVersion> + '_ {
        self.inner.entries.values().map(|entry| &entry.version)
    }

    /// Versions together with their descriptors, in registry order.
    pub(crate) fn descriptors(
        &self,
    ) -> impl Iterator<Item = (&SchemaVersion, &dyn SchemaDescriptor)> + '_ {
        self.inner
            .entries
            .values()
            .map(|entry| (&entry.version, entry.descriptor.as_ref()))
    }

    fn index_of(&self, version: &SchemaVersion) -> Option<usize> {
        let (index, _, entry) = self.inner.entries.get_full(version.identifier())?;
        if entry.version == *version {
            Some(index)
        } else {
            None
        }
    }
}

impl Debug for VersionRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.versions()).finish()
    }
}

struct VersionRegistryInner {
    entries: IndexMap<String, RegisteredVersion>,
}

struct RegisteredVersion {
    version: SchemaVersion,
    descriptor: Arc<dyn SchemaDescriptor>,
}

/// Collects versions oldest first and freezes them into a [`VersionRegistry`].
///
/// Errors are captured while chaining and reported by [`build`](Self::build).
#[derive(Default)]
pub struct VersionRegistryBuilder {
    error: Option<MigrationError>,
    entries: IndexMap<String, RegisteredVersion>,
}

impl VersionRegistryBuilder {
    pub fn new() -> Self {
        VersionRegistryBuilder {
            error: None,
            entries: IndexMap::new(),
        }
    }

    /// Appends the next version of the chain.
    ///
    /// An empty or already registered identifier is recorded as a configuration
    /// error and returned from `build()`.
    pub fn version<D>(mut self, identifier: &str, descriptor: D) -> Self
    where
        D: SchemaDescriptor + 'static,
    {
        if self.error.is_some() {
            return self;
        }

        if identifier.trim().is_empty() {
            log::error!("Schema version identifier cannot be empty");
            self.error = Some(MigrationError::new(
                "Schema version identifier cannot be empty",
                ErrorKind::ConfigurationError,
            ));
            return self;
        }

        if self.entries.contains_key(identifier) {
            log::error!("Schema version {} is registered twice", identifier);
            self.error = Some(MigrationError::new(
                &format!("Schema version {} is registered twice", identifier),
                ErrorKind::ConfigurationError,
            ));
            return self;
        }

        let ordinal = INITIAL_ORDINAL + self.entries.len() as u32;
        self.entries.insert(
            identifier.to_string(),
            RegisteredVersion {
                version: SchemaVersion::new(ordinal, identifier),
                descriptor: Arc::new(descriptor),
            },
        );
        self
    }

    pub fn build(self) -> MigrationResult<VersionRegistry> {
        if let Some(error) = self.error {
            return Err(error);
        }

        Ok(VersionRegistry {
            inner: Arc::new(VersionRegistryInner {
                entries: self.entries,
            }),
        })
    }
}
