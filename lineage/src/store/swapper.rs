use super::io::{remove_if_exists, sibling_path, sync_parent_dir};
use super::StoreFormat;
use crate::common::SWAP_INFIX;
use crate::errors::{MigrationError, MigrationResult};
use std::fs::{self, File};
use std::path::Path;

/// Replaces store files atomically and removes obsolete store artifacts.
#[derive(Clone)]
pub struct StoreSwapper {
    format: StoreFormat,
    sync: bool,
}

impl StoreSwapper {
    /// `sync` controls whether the replacement and its directory entry are
    /// fsynced before `atomic_replace` returns.
    pub fn new(format: StoreFormat, sync: bool) -> Self {
        StoreSwapper { format, sync }
    }

    /// Replaces the content of `target` with the content of `source`.
    ///
    /// `source` is copied to a uniquely named sibling of `target` (so the final
    /// step is a same-directory rename even when `source` lives on another
    /// filesystem) and then renamed over `target`. Any observer, including a
    /// process that crashes midway, sees either the complete old or the complete
    /// new content. `source` itself is left in place.
    ///
    /// Side-files of the old `target` (such as its journal) are removed right
    /// before the rename; they must not be replayed over the new content.
    pub fn atomic_replace(&self, target: &Path, source: &Path) -> MigrationResult<()> {
        let staging = sibling_path(
            target,
            &format!("{}{}", SWAP_INFIX, uuid::Uuid::new_v4().simple()),
        );

        let result = self.stage_and_commit(target, source, &staging);
        if let Err(e) = &result {
            log::error!(
                "Failed to replace {} with {}: {}",
                target.display(),
                source.display(),
                e
            );
            if let Err(cleanup) = remove_if_exists(&staging) {
                log::warn!(
                    "Could not remove staging file {}: {}",
                    staging.display(),
                    cleanup
                );
            }
        }
        result
    }

    fn stage_and_commit(&self, target: &Path, source: &Path, staging: &Path) -> MigrationResult<()> {
        let copied = fs::copy(source, staging)?;
        if self.sync {
            File::open(staging)?.sync_all()?;
        }

        for side_file in self.format.side_files(target) {
            if remove_if_exists(&side_file)? {
                log::debug!("Removed stale side-file {}", side_file.display());
            }
        }

        fs::rename(staging, target)?;
        if self.sync {
            sync_parent_dir(target)?;
        }

        log::debug!(
            "Replaced {} with {} ({} bytes)",
            target.display(),
            source.display(),
            copied
        );
        Ok(())
    }

    /// Removes the store artifact at `path` together with its side-files.
    ///
    /// Destroying an absent artifact is not an error. Every file is attempted;
    /// the first failure is returned.
    pub fn destroy(&self, path: &Path) -> MigrationResult<()> {
        let mut first_error: Option<MigrationError> = None;
        let side_files = self.format.side_files(path);

        for file in std::iter::once(path).chain(side_files.iter().map(|p| p.as_path())) {
            match remove_if_exists(file) {
                Ok(true) => log::debug!("Destroyed {}", file.display()),
                Ok(false) => {}
                Err(e) => {
                    log::error!("Failed to destroy {}: {}", file.display(), e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::WAL_SUFFIX;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lineage-swap-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn swapper() -> StoreSwapper {
        StoreSwapper::new(StoreFormat::default(), true)
    }

    #[test]
    fn replace_swaps_content_and_keeps_source() {
        let dir = temp_dir();
        let target = dir.join("app.store");
        let source = dir.join("next.store");
        fs::write(&target, b"old").unwrap();
        fs::write(&source, b"new").unwrap();

        swapper().atomic_replace(&target, &source).unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"new");
        assert!(source.exists());
        let leftovers: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(SWAP_INFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn replace_removes_stale_journal_of_target() {
        let dir = temp_dir();
        let target = dir.join("app.store");
        let source = dir.join("next.store");
        fs::write(&target, b"old").unwrap();
        fs::write(sibling_path(&target, WAL_SUFFIX), b"old journal").unwrap();
        fs::write(&source, b"new").unwrap();

        swapper().atomic_replace(&target, &source).unwrap();
        assert!(!sibling_path(&target, WAL_SUFFIX).exists());
    }

    #[test]
    fn failed_replace_leaves_target_untouched() {
        let dir = temp_dir();
        let target = dir.join("app.store");
        fs::write(&target, b"old").unwrap();

        let err = swapper()
            .atomic_replace(&target, &dir.join("missing.store"))
            .unwrap_err();
        assert!(err.kind().is_io());
        assert_eq!(fs::read(&target).unwrap(), b"old");
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 1);
    }

    #[test]
    fn destroy_removes_side_files_and_is_idempotent() {
        let dir = temp_dir();
        let store = dir.join("app.store");
        fs::write(&store, b"data").unwrap();
        fs::write(sibling_path(&store, WAL_SUFFIX), b"journal").unwrap();

        let swapper = swapper();
        swapper.destroy(&store).unwrap();
        assert!(!store.exists());
        assert!(!sibling_path(&store, WAL_SUFFIX).exists());

        swapper.destroy(&store).unwrap();
    }
}
