use lineage::errors::{ErrorKind, MigrationError, MigrationResult};
use lineage::migration::{MigrationEngine, MigrationEngineBuilder, MigrationStep, SchemaTransformer};
use lineage::store::{rewrite_records, JournaledStore, OpenMode, StoreMetadata};
use lineage::version::{SchemaFingerprint, VersionRegistry};
use parking_lot::Mutex;
use std::backtrace::Backtrace;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use std::{env, fs};

/// Identifiers of the test schema history, oldest first.
pub const VERSIONS: [&str; 4] = ["v1", "v2", "v3", "v4"];

/// Runs a test between a setup and a teardown step.
///
/// `after` runs whether the test fails or not; a panic anywhere is reported
/// together with the error that caused it.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> MigrationResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> MigrationResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> MigrationResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    let start_time = Instant::now();
    let result = std::panic::catch_unwind(|| {
        let backtrace = Backtrace::capture();
        match before() {
            Ok(ctx) => match test(ctx.clone()) {
                Ok(_) => after(ctx).map_err(|e| {
                    (format!("After run failed: {:?}", e), backtrace.to_string())
                }),
                Err(e) => {
                    let _ = after(ctx);
                    Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                }
            },
            Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
        }
    });

    let error = match result {
        Ok(Ok(_)) => return,
        Ok(Err((e, bt))) => (e, bt),
        Err(panic_err) => {
            let message = if let Some(s) = panic_err.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_err.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            (format!("Panic: {}", message), String::new())
        }
    };

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Took {:?}", start_time.elapsed());
    eprintln!("Error: {}", error.0);
    if !error.1.is_empty() && !error.1.contains("disabled") {
        eprintln!("\nBacktrace:\n{}", error.1);
    }
    eprintln!("=====================================================\n");
    panic!("Test failed. Last error: {}", error.0);
}

/// A private directory holding one store plus the scratch directory used to
/// migrate it.
#[derive(Clone)]
pub struct TestContext {
    dir: PathBuf,
    registry: VersionRegistry,
}

impl TestContext {
    pub fn new(dir: PathBuf, registry: VersionRegistry) -> Self {
        Self { dir, registry }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.join("app.store")
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.dir.join("scratch")
    }

    pub fn registry(&self) -> VersionRegistry {
        self.registry.clone()
    }

    /// Engine builder preconfigured with this context's registry and scratch
    /// directory.
    pub fn engine_builder(&self) -> MigrationEngineBuilder {
        MigrationEngine::builder()
            .registry(self.registry())
            .scratch_dir(self.scratch_dir())
    }

    /// Every file currently in the store directory and the scratch directory.
    pub fn files(&self) -> MigrationResult<Vec<PathBuf>> {
        list_files(&[self.dir.clone(), self.scratch_dir()])
    }
}

pub fn random_path() -> PathBuf {
    let id = uuid::Uuid::new_v4();
    env::temp_dir().join(format!("lineage-it-{}", id))
}

/// Fresh context over the four-version test history.
pub fn create_test_context() -> MigrationResult<TestContext> {
    let dir = random_path();
    fs::create_dir_all(&dir)?;
    Ok(TestContext::new(dir, test_registry(&VERSIONS)?))
}

pub fn cleanup(ctx: TestContext) -> MigrationResult<()> {
    match fs::remove_dir_all(ctx.dir()) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Metadata a test store carries when written in `identifier`.
pub fn fingerprint(identifier: &str) -> SchemaFingerprint {
    SchemaFingerprint::new(format!("lineage-test/{}", identifier))
}

pub fn test_registry(identifiers: &[&str]) -> MigrationResult<VersionRegistry> {
    identifiers
        .iter()
        .fold(VersionRegistry::builder(), |builder, id| {
            builder.version(id, fingerprint(id))
        })
        .build()
}

/// Creates a checkpointed store at `path` holding `records`.
pub fn create_store(path: &Path, metadata: StoreMetadata, records: &[&str]) -> MigrationResult<()> {
    let mut store = JournaledStore::create(path, metadata)?;
    for record in records {
        store.append(record.as_bytes())?;
    }
    store.checkpoint()?;
    store.close()
}

/// Appends `records` to the journal of the store at `path` without
/// checkpointing them.
pub fn append_to_journal(path: &Path, records: &[&str]) -> MigrationResult<()> {
    let mut store = JournaledStore::open(path, OpenMode::ReadWrite)?;
    for record in records {
        store.append(record.as_bytes())?;
    }
    store.close()
}

/// Every record of the store at `path`, journal included.
pub fn read_records(path: &Path) -> MigrationResult<Vec<String>> {
    let store = JournaledStore::open(path, OpenMode::ReadWrite)?;
    store
        .records()
        .map(|record| String::from_utf8(record.to_vec()).map_err(MigrationError::from))
        .collect()
}

fn list_files(dirs: &[PathBuf]) -> MigrationResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for dir in dirs {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Transformer over the journaled test stores that tags every record with the
/// destination version and records what it saw.
///
/// Optionally fails on the step whose destination is `fail_at`, after leaving a
/// partially written output behind.
#[derive(Clone)]
pub struct RecordingTransformer {
    watched: Vec<PathBuf>,
    fail_at: Option<String>,
    calls: Arc<AtomicUsize>,
    steps: Arc<Mutex<Vec<String>>>,
    first_input: Arc<Mutex<Option<Vec<String>>>>,
    peak_files: Arc<AtomicUsize>,
}

impl RecordingTransformer {
    pub fn new(ctx: &TestContext) -> Self {
        RecordingTransformer {
            watched: vec![ctx.dir().to_path_buf(), ctx.scratch_dir()],
            fail_at: None,
            calls: Arc::new(AtomicUsize::new(0)),
            steps: Arc::new(Mutex::new(Vec::new())),
            first_input: Arc::new(Mutex::new(None)),
            peak_files: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_at(mut self, destination: &str) -> Self {
        self.fail_at = Some(destination.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Applied steps, as `"source -> destination"`.
    pub fn steps(&self) -> Vec<String> {
        self.steps.lock().clone()
    }

    /// Records the first step read from its input.
    pub fn first_input(&self) -> Option<Vec<String>> {
        self.first_input.lock().clone()
    }

    /// Most store files seen at once when a step started.
    pub fn peak_files(&self) -> usize {
        self.peak_files.load(Ordering::SeqCst)
    }
}

impl SchemaTransformer for RecordingTransformer {
    fn apply(&self, step: &MigrationStep, input: &Path, output: &Path) -> MigrationResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.steps.lock().push(step.to_string());
        self.peak_files
            .fetch_max(list_files(&self.watched)?.len(), Ordering::SeqCst);

        let seen = read_records(input)?;
        self.first_input.lock().get_or_insert(seen);

        let destination = step.destination().identifier();
        if self.fail_at.as_deref() == Some(destination) {
            fs::write(output, b"partially written")?;
            return Err(MigrationError::new(
                &format!("simulated failure migrating to {}", destination),
                ErrorKind::IOError,
            ));
        }

        let tag = format!("|{}", destination);
        rewrite_records(input, output, fingerprint(destination).metadata(), |record| {
            Ok(Some([record, tag.as_bytes()].concat()))
        })
    }
}
