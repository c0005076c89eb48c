use super::io::remove_if_exists;
use crate::errors::MigrationResult;
use crate::migration::MigrationStep;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding the intermediate stores of a migration chain.
///
/// Every artifact the engine creates here is named after the configured prefix
/// and the store it belongs to, so leftovers of an aborted run can be listed and
/// purged per store. The directory may be shared by many engines and processes.
#[derive(Debug, Clone)]
pub struct ScratchArea {
    dir: PathBuf,
    prefix: String,
}

impl ScratchArea {
    pub fn new(dir: impl Into<PathBuf>, prefix: &str) -> Self {
        ScratchArea {
            dir: dir.into(),
            prefix: prefix.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Creates the scratch directory if needed.
    pub fn ensure(&self) -> MigrationResult<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// A fresh, unique path for the output of `step` applied to `store_path`.
    ///
    /// Nothing is created on disk.
    pub fn allocate(&self, store_path: &Path, step: &MigrationStep) -> PathBuf {
        self.dir.join(format!(
            "{}{}.{}-{}.{}",
            self.prefix,
            store_stem(store_path),
            sanitize_identifier(step.source().identifier()),
            sanitize_identifier(step.destination().identifier()),
            uuid::Uuid::new_v4().simple()
        ))
    }

    /// Files in the scratch directory allocated for `store_path`, sorted by name.
    ///
    /// Artifacts of other stores sharing the directory are never listed.
    pub fn artifacts(&self, store_path: &Path) -> MigrationResult<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let owner = format!("{}{}.", self.prefix, store_stem(store_path));
        let mut artifacts = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name
                .strip_prefix(&owner)
                .map(is_step_suffix)
                .unwrap_or(false)
            {
                artifacts.push(entry.path());
            }
        }
        artifacts.sort();
        Ok(artifacts)
    }

    /// Removes every artifact left in the scratch directory for `store_path`.
    /// Returns how many files were removed.
    pub fn purge(&self, store_path: &Path) -> MigrationResult<usize> {
        let mut removed = 0;
        for artifact in self.artifacts(store_path)? {
            if remove_if_exists(&artifact)? {
                removed += 1;
            }
        }
        if removed > 0 {
            log::info!(
                "Purged {} artifact(s) of {} from {}",
                removed,
                store_path.display(),
                self.dir.display()
            );
        }
        Ok(removed)
    }
}

fn store_stem(store_path: &Path) -> String {
    store_path
        .file_name()
        .map(|name| sanitize(&name.to_string_lossy()))
        .unwrap_or_else(|| "store".to_string())
}

// `<src>-<dst>.<32 hex digits>`, optionally followed by a side-file suffix
// such as `-wal`; identifiers never contain a dot
fn is_step_suffix(suffix: &str) -> bool {
    let Some((step, id)) = suffix.split_once('.') else {
        return false;
    };
    if !step.contains('-') || id.len() < 32 || !id.is_char_boundary(32) {
        return false;
    }
    let (uuid, side) = id.split_at(32);
    uuid.chars().all(|c| c.is_ascii_hexdigit())
        && (side.is_empty()
            || side
                .strip_prefix('-')
                .map(|tag| !tag.is_empty() && tag.chars().all(|c| c.is_ascii_lowercase()))
                .unwrap_or(false))
}

fn sanitize_identifier(identifier: &str) -> String {
    sanitize(identifier).replace('.', "_")
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
