use thiserror::Error;

/// Errors raised by the NTFS on-disk decoder.
///
/// `Geometry` and `Io` failures from the bootstrap path are fatal; `Format`
/// and `Missing` are caught at the MFT record boundary and turned into a
/// null or partial slot instead of aborting the run.
#[derive(Debug, Error)]
pub enum NtfsError {
    #[error("not an NTFS volume: {0}")]
    Geometry(String),

    #[error("short read at offset {offset}: wanted {wanted} bytes, got {got}")]
    ShortRead {
        offset: u64,
        wanted: usize,
        got: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed {what} at record offset {record_offset}: {detail}")]
    Format {
        record_offset: u64,
        what: &'static str,
        detail: String,
    },

    #[error("missing {0}")]
    Missing(String),

    #[error("orphaned record {0}: could not resolve a parent chain to root")]
    Orphaned(u64),
}

pub type Result<T> = std::result::Result<T, NtfsError>;
