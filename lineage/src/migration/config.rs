use crate::common::{DEFAULT_SCRATCH_DIR_NAME, DEFAULT_TEMP_PREFIX};
use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use std::path::{Path, PathBuf};

/// Tunables of a [`MigrationEngine`](super::MigrationEngine).
///
/// Usually filled in through [`MigrationEngineBuilder`](super::MigrationEngineBuilder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    scratch_dir: PathBuf,
    temp_prefix: String,
    verify_each_step: bool,
    sync_on_swap: bool,
}

impl MigrationConfig {
    pub fn new() -> Self {
        MigrationConfig {
            scratch_dir: std::env::temp_dir().join(DEFAULT_SCRATCH_DIR_NAME),
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
            verify_each_step: true,
            sync_on_swap: true,
        }
    }

    /// Directory receiving intermediate stores.
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// File name prefix of every intermediate store.
    pub fn temp_prefix(&self) -> &str {
        &self.temp_prefix
    }

    /// Whether every step output is inspected before the next step runs.
    pub fn verify_each_step(&self) -> bool {
        self.verify_each_step
    }

    /// Whether the replacement and its directory entry are fsynced on swap.
    pub fn sync_on_swap(&self) -> bool {
        self.sync_on_swap
    }

    pub fn set_scratch_dir(&mut self, scratch_dir: impl Into<PathBuf>) -> MigrationResult<()> {
        let scratch_dir = scratch_dir.into();
        if scratch_dir.as_os_str().is_empty() {
            log::error!("Scratch directory cannot be empty");
            return Err(MigrationError::new(
                "Scratch directory cannot be empty",
                ErrorKind::ConfigurationError,
            ));
        }
        self.scratch_dir = scratch_dir;
        Ok(())
    }

    pub fn set_temp_prefix(&mut self, temp_prefix: &str) -> MigrationResult<()> {
        if temp_prefix.is_empty() {
            log::error!("Temporary file prefix cannot be empty");
            return Err(MigrationError::new(
                "Temporary file prefix cannot be empty",
                ErrorKind::ConfigurationError,
            ));
        }
        if temp_prefix.contains(['/', '\\']) {
            log::error!("Temporary file prefix {} contains a path separator", temp_prefix);
            return Err(MigrationError::new(
                &format!("Temporary file prefix {} contains a path separator", temp_prefix),
                ErrorKind::ConfigurationError,
            ));
        }
        self.temp_prefix = temp_prefix.to_string();
        Ok(())
    }

    pub fn set_verify_each_step(&mut self, verify_each_step: bool) {
        self.verify_each_step = verify_each_step;
    }

    pub fn set_sync_on_swap(&mut self, sync_on_swap: bool) {
        self.sync_on_swap = sync_on_swap;
    }

    /// Checks the configuration against the store about to be migrated.
    pub(crate) fn validate_for(&self, store_path: &Path) -> MigrationResult<()> {
        if self.scratch_dir == store_path {
            log::error!(
                "Scratch directory {} cannot be the store itself",
                self.scratch_dir.display()
            );
            return Err(MigrationError::new(
                &format!(
                    "Scratch directory {} cannot be the store itself",
                    self.scratch_dir.display()
                ),
                ErrorKind::ConfigurationError,
            ));
        }
        Ok(())
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        MigrationConfig::new()
    }
}
