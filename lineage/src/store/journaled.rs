use super::io::{remove_if_exists, sibling_path, sync_parent_dir};
use super::{SideFiles, StoreFormatProvider, StoreMetadata};
use crate::common::{CHECKPOINT_SUFFIX, STORE_FORMAT_VERSION, STORE_MAGIC, WAL_SUFFIX};
use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use smallvec::smallvec;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// How [`JournaledStore::open`] treats the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Journaled records stay in the journal until [`JournaledStore::checkpoint`].
    ReadWrite,
    /// The journal is merged into the main file while opening.
    Checkpoint,
}

/// Built-in single-file store with a write-ahead journal.
///
/// Layout of the main file:
///
/// ```text
/// "LNGS" | u16 format version | u32 metadata length | metadata | record*
/// record := u32 length | bytes            (all integers little endian)
/// ```
///
/// Appended records go to the `<file>-wal` sibling using the same record framing
/// and only reach the main file on checkpoint, which rewrites it through a
/// `<file>-ckpt` sibling and a rename.
#[derive(Debug, Clone, Copy, Default)]
pub struct JournaledFileFormat;

impl StoreFormatProvider for JournaledFileFormat {
    fn read_metadata(&self, path: &Path) -> MigrationResult<StoreMetadata> {
        let mut reader = BufReader::new(File::open(path)?);
        read_header(&mut reader, path)
    }

    fn checkpoint(&self, path: &Path) -> MigrationResult<()> {
        JournaledStore::open(path, OpenMode::Checkpoint)?.close()
    }

    fn side_files(&self, path: &Path) -> SideFiles {
        smallvec![
            sibling_path(path, WAL_SUFFIX),
            sibling_path(path, CHECKPOINT_SUFFIX),
        ]
    }
}

/// An open [`JournaledFileFormat`] store.
pub struct JournaledStore {
    path: PathBuf,
    metadata: StoreMetadata,
    records: Vec<Vec<u8>>,
    pending: Vec<Vec<u8>>,
    journal: Option<BufWriter<File>>,
}

impl JournaledStore {
    /// Creates an empty store at `path`. Fails if the file already exists.
    pub fn create(path: &Path, metadata: StoreMetadata) -> MigrationResult<JournaledStore> {
        if path.exists() {
            log::error!("Cannot create store, {} already exists", path.display());
            return Err(MigrationError::new(
                &format!("Cannot create store, {} already exists", path.display()),
                ErrorKind::IOError,
            ));
        }

        write_snapshot(path, &metadata, std::iter::empty())?;
        Ok(JournaledStore {
            path: path.to_path_buf(),
            metadata,
            records: Vec::new(),
            pending: Vec::new(),
            journal: None,
        })
    }

    /// Opens the store at `path` together with its journal.
    ///
    /// A torn record at the end of the journal (a write interrupted by a crash)
    /// is discarded. Damage anywhere in the main file is reported as
    /// [`ErrorKind::FileCorrupted`].
    pub fn open(path: &Path, mode: OpenMode) -> MigrationResult<JournaledStore> {
        let mut reader = BufReader::new(File::open(path)?);
        let metadata = read_header(&mut reader, path)?;
        let records = read_records(&mut reader, path, false)?;

        let journal_path = sibling_path(path, WAL_SUFFIX);
        let pending = match File::open(&journal_path) {
            Ok(file) => read_records(&mut BufReader::new(file), &journal_path, true)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let mut store = JournaledStore {
            path: path.to_path_buf(),
            metadata,
            records,
            pending,
            journal: None,
        };

        if mode == OpenMode::Checkpoint {
            store.checkpoint()?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &StoreMetadata {
        &self.metadata
    }

    /// Appends a record to the journal.
    ///
    /// Records must not be empty; a zero length in the journal marks a
    /// preallocated or torn tail.
    pub fn append(&mut self, record: &[u8]) -> MigrationResult<()> {
        if record.is_empty() {
            log::error!("Cannot journal an empty record in {}", self.path.display());
            return Err(MigrationError::new(
                &format!("Cannot journal an empty record in {}", self.path.display()),
                ErrorKind::EncodingError,
            ));
        }

        if self.journal.is_none() {
            // whatever the journal ends with was read into `pending`; start over
            // so new records never land behind a discarded tail
            if sibling_path(&self.path, WAL_SUFFIX).exists() {
                self.checkpoint()?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(sibling_path(&self.path, WAL_SUFFIX))?;
            self.journal = Some(BufWriter::new(file));
        }

        if let Some(journal) = self.journal.as_mut() {
            write_record(journal, record)?;
            journal.flush()?;
        }
        self.pending.push(record.to_vec());
        Ok(())
    }

    /// Checkpointed records followed by journaled ones.
    pub fn records(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.records
            .iter()
            .chain(self.pending.iter())
            .map(|record| record.as_slice())
    }

    pub fn record_count(&self) -> usize {
        self.records.len() + self.pending.len()
    }

    /// Number of records that live only in the journal.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Merges the journal into the main file and deletes the journal.
    pub fn checkpoint(&mut self) -> MigrationResult<()> {
        let journal_path = sibling_path(&self.path, WAL_SUFFIX);
        if self.pending.is_empty() && !journal_path.exists() {
            return Ok(());
        }

        // release the journal handle before the file goes away
        if let Some(mut journal) = self.journal.take() {
            journal.flush()?;
        }

        let all = self.records.iter().chain(self.pending.iter());
        write_snapshot(&self.path, &self.metadata, all)?;
        remove_if_exists(&journal_path)?;

        log::debug!(
            "Checkpointed {} journaled record(s) into {}",
            self.pending.len(),
            self.path.display()
        );
        self.records.append(&mut self.pending);
        Ok(())
    }

    /// Flushes the journal and releases the store.
    pub fn close(mut self) -> MigrationResult<()> {
        if let Some(mut journal) = self.journal.take() {
            journal.flush()?;
            journal.get_ref().sync_all()?;
        }
        Ok(())
    }
}

/// Writes a new store at `output` holding every record of `input` passed through
/// `mapper`, stamped with `metadata`.
///
/// `mapper` returns `None` to drop a record. `input` is only read; its journal is
/// included in what `mapper` sees. This is the building block of step
/// transformers for this format.
pub fn rewrite_records<F>(
    input: &Path,
    output: &Path,
    metadata: StoreMetadata,
    mut mapper: F,
) -> MigrationResult<()>
where
    F: FnMut(&[u8]) -> MigrationResult<Option<Vec<u8>>>,
{
    let source = JournaledStore::open(input, OpenMode::ReadWrite)?;
    let mut mapped = Vec::with_capacity(source.record_count());
    for record in source.records() {
        if let Some(record) = mapper(record)? {
            mapped.push(record);
        }
    }

    if output.exists() {
        log::error!("Rewrite target {} already exists", output.display());
        return Err(MigrationError::new(
            &format!("Rewrite target {} already exists", output.display()),
            ErrorKind::IOError,
        ));
    }
    write_snapshot(output, &metadata, mapped.iter())
}

fn corrupted(path: &Path, detail: &str) -> MigrationError {
    log::error!("Store {} is corrupted: {}", path.display(), detail);
    MigrationError::new(
        &format!("Store {} is corrupted: {}", path.display(), detail),
        ErrorKind::FileCorrupted,
    )
}

fn read_header<R: Read>(reader: &mut R, path: &Path) -> MigrationResult<StoreMetadata> {
    let mut magic = [0u8; 4];
    reader
        .read_exact(&mut magic)
        .map_err(|_| corrupted(path, "missing header"))?;
    if &magic != STORE_MAGIC {
        return Err(corrupted(path, "unknown magic"));
    }

    let mut version = [0u8; 2];
    reader
        .read_exact(&mut version)
        .map_err(|_| corrupted(path, "truncated header"))?;
    let version = u16::from_le_bytes(version);
    if version != STORE_FORMAT_VERSION {
        return Err(corrupted(path, &format!("unsupported format version {}", version)));
    }

    let mut len = [0u8; 4];
    reader
        .read_exact(&mut len)
        .map_err(|_| corrupted(path, "truncated header"))?;
    let mut metadata = vec![0u8; u32::from_le_bytes(len) as usize];
    reader
        .read_exact(&mut metadata)
        .map_err(|_| corrupted(path, "truncated metadata"))?;
    Ok(StoreMetadata::new(metadata))
}

fn read_records<R: Read>(
    reader: &mut R,
    path: &Path,
    tolerate_torn_tail: bool,
) -> MigrationResult<Vec<Vec<u8>>> {
    let mut records = Vec::new();
    loop {
        let mut len = [0u8; 4];
        let read = read_fully(reader, &mut len)?;
        if read == 0 {
            break;
        }

        let mut record = vec![0u8; u32::from_le_bytes(len) as usize];
        let complete = read == len.len()
            && !(tolerate_torn_tail && record.is_empty())
            && read_fully(reader, &mut record)? == record.len();
        if !complete {
            if tolerate_torn_tail {
                log::warn!(
                    "Discarding torn record at the end of {} after {} record(s)",
                    path.display(),
                    records.len()
                );
                break;
            }
            return Err(corrupted(path, "truncated record"));
        }
        records.push(record);
    }
    Ok(records)
}

// like read_exact, but reports how much was read instead of failing at EOF
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> MigrationResult<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

fn write_record<W: Write>(writer: &mut W, record: &[u8]) -> MigrationResult<()> {
    let len = u32::try_from(record.len()).map_err(|_| {
        MigrationError::new(
            &format!("Record of {} bytes exceeds the format limit", record.len()),
            ErrorKind::EncodingError,
        )
    })?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(record)?;
    Ok(())
}

/// Writes header and records to a `-ckpt` sibling, then renames it over `path`.
fn write_snapshot<'a, I>(path: &Path, metadata: &StoreMetadata, records: I) -> MigrationResult<()>
where
    I: Iterator<Item = &'a Vec<u8>>,
{
    let temp_path = sibling_path(path, CHECKPOINT_SUFFIX);
    let result = (|| -> MigrationResult<()> {
        let mut writer = BufWriter::new(File::create(&temp_path)?);
        writer.write_all(STORE_MAGIC)?;
        writer.write_all(&STORE_FORMAT_VERSION.to_le_bytes())?;
        write_record(&mut writer, metadata.as_bytes())?;
        for record in records {
            write_record(&mut writer, record)?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    })();

    if let Err(e) = result {
        let _ = remove_if_exists(&temp_path);
        return Err(e);
    }

    std::fs::rename(&temp_path, path)?;
    sync_parent_dir(path)
}
