use super::{JournaledFileFormat, StoreMetadata};
use crate::errors::MigrationResult;
use smallvec::SmallVec;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Auxiliary files a store keeps next to its main file.
pub type SideFiles = SmallVec<[PathBuf; 2]>;

/// The storage-engine specific operations the migration engine relies on.
///
/// Everything else about the on-disk layout stays opaque to the engine.
/// Implementations must be usable from any thread.
pub trait StoreFormatProvider: Send + Sync {
    /// Reads the metadata header of the store at `path`.
    ///
    /// Must not mutate the store.
    fn read_metadata(&self, path: &Path) -> MigrationResult<StoreMetadata>;

    /// Merges every journaled write into the main file so it becomes a complete,
    /// self-contained snapshot, then releases the store.
    fn checkpoint(&self, path: &Path) -> MigrationResult<()>;

    /// Paths of the auxiliary files (journal, shared memory, ...) that belong to
    /// the store at `path`, whether or not they currently exist.
    fn side_files(&self, path: &Path) -> SideFiles;
}

/// Cheaply cloneable handle to a [`StoreFormatProvider`].
///
/// Defaults to the built-in [`JournaledFileFormat`].
#[derive(Clone)]
pub struct StoreFormat {
    inner: Arc<dyn StoreFormatProvider>,
}

impl StoreFormat {
    pub fn new<T: StoreFormatProvider + 'static>(inner: T) -> Self {
        StoreFormat {
            inner: Arc::new(inner),
        }
    }
}

impl Default for StoreFormat {
    fn default() -> Self {
        StoreFormat::new(JournaledFileFormat)
    }
}

impl Deref for StoreFormat {
    type Target = Arc<dyn StoreFormatProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
