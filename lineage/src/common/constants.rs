// journaled store format
pub const STORE_MAGIC: &[u8; 4] = b"LNGS";
pub const STORE_FORMAT_VERSION: u16 = 1;
pub const WAL_SUFFIX: &str = "-wal";
pub const CHECKPOINT_SUFFIX: &str = "-ckpt";

// engine defaults
pub const DEFAULT_SCRATCH_DIR_NAME: &str = "lineage-scratch";
pub const DEFAULT_TEMP_PREFIX: &str = ".lineage-";
pub const SWAP_INFIX: &str = ".swap-";

// registry
pub const INITIAL_ORDINAL: u32 = 1;
