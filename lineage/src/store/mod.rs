//! Store artifacts on disk: reading their metadata, checkpointing their
//! journal, swapping them atomically and keeping scratch copies.
//!
//! The engine only depends on the [`StoreFormatProvider`] seam. The built-in
//! [`JournaledFileFormat`] is a single main file plus a `-wal` journal sibling;
//! other storage engines plug in by implementing the trait.

mod format;
mod inspector;
pub(crate) mod io;
mod journaled;
mod metadata;
mod scratch;
mod swapper;

pub use format::{SideFiles, StoreFormat, StoreFormatProvider};
pub use inspector::StoreInspector;
pub use journaled::{rewrite_records, JournaledFileFormat, JournaledStore, OpenMode};
pub use metadata::StoreMetadata;
pub use scratch::ScratchArea;
pub use swapper::StoreSwapper;
