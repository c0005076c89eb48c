use crate::errors::MigrationResult;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// `path` with `suffix` appended to its file name (`store.db` -> `store.db-wal`).
pub(crate) fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Removes a file, treating an already absent file as success.
///
/// Returns whether a file was actually removed.
pub(crate) fn remove_if_exists(path: &Path) -> MigrationResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Flushes directory entries (creations, renames) of the directory holding `path`.
#[cfg(unix)]
pub(crate) fn sync_parent_dir(path: &Path) -> MigrationResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn sync_parent_dir(_path: &Path) -> MigrationResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_appends_to_file_name() {
        let path = Path::new("/data/app/store.db");
        assert_eq!(sibling_path(path, "-wal"), PathBuf::from("/data/app/store.db-wal"));
    }

    #[test]
    fn remove_if_exists_is_idempotent() {
        let path = std::env::temp_dir().join(format!("lineage-io-{}", uuid::Uuid::new_v4()));
        fs::write(&path, b"x").unwrap();
        assert!(remove_if_exists(&path).unwrap());
        assert!(!remove_if_exists(&path).unwrap());
    }
}
