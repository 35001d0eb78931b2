//! Positioned reads over the raw volume, with an alignment workaround for
//! hosts whose raw-device drivers reject non-block-aligned seeks.
//!
//! Same align-down-and-discard-prefix technique as a plain sector-aligned
//! device reader, without a sector cache: the decoder already deduplicates
//! access patterns at the MFT-index layer above this one.

use std::io::{Read, Seek, SeekFrom};

use crate::error::{NtfsError, Result};

/// Alignment boundary assumed by hosts that reject arbitrary seeks.
const ALIGNMENT: u64 = 512;

/// Abstracts positioned reads over the volume.
///
/// Implementations must leave the underlying cursor unobservable: callers
/// never rely on stream position surviving a call. `Sync` so a single
/// reader can be shared behind an `Arc` (guarded by a `Mutex`, since
/// `read_at` takes `&mut self`) across worker threads by a parallel
/// extraction front-end, per spec.md §5's "the block reader must be the
/// serialization point" allowance.
pub trait BlockReader: Sync {
    /// Return exactly `length` bytes starting at absolute byte `offset`.
    /// A short read is always an error, never a truncated result.
    fn read_at(&mut self, offset: u64, length: usize) -> Result<Vec<u8>>;
}

/// `BlockReader` backed by any seekable byte source, aligning reads down
/// to a 512-byte boundary and discarding the unwanted prefix.
pub struct FileBlockReader<R: Read + Seek> {
    inner: R,
}

impl<R: Read + Seek> FileBlockReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read + Seek + Sync> BlockReader for FileBlockReader<R> {
    fn read_at(&mut self, offset: u64, length: usize) -> Result<Vec<u8>> {
        if length == 0 {
            return Ok(Vec::new());
        }

        let aligned_offset = (offset / ALIGNMENT) * ALIGNMENT;
        let prefix = (offset - aligned_offset) as usize;

        log::trace!(
            "read_at offset={} length={} (aligned to {}, prefix {})",
            offset,
            length,
            aligned_offset,
            prefix
        );

        self.inner
            .seek(SeekFrom::Start(aligned_offset))
            .map_err(NtfsError::Io)?;

        let mut buf = vec![0u8; prefix + length];
        self.inner.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                NtfsError::ShortRead {
                    offset,
                    wanted: length,
                    got: 0,
                }
            } else {
                NtfsError::Io(e)
            }
        })?;

        Ok(buf.split_off(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_exact_bytes_at_aligned_offset() {
        let data: Vec<u8> = (0u8..=255).collect();
        let mut reader = FileBlockReader::new(Cursor::new(data));
        let got = reader.read_at(512, 8).unwrap();
        assert_eq!(got, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn reads_exact_bytes_at_unaligned_offset() {
        let data: Vec<u8> = (0u8..=255).collect();
        let mut reader = FileBlockReader::new(Cursor::new(data));
        let got = reader.read_at(5, 4).unwrap();
        assert_eq!(got, vec![5, 6, 7, 8]);
    }

    #[test]
    fn short_source_is_an_error() {
        let data = vec![1, 2, 3];
        let mut reader = FileBlockReader::new(Cursor::new(data));
        assert!(reader.read_at(0, 100).is_err());
    }

    #[test]
    fn zero_length_read_is_empty() {
        let data = vec![1, 2, 3];
        let mut reader = FileBlockReader::new(Cursor::new(data));
        assert_eq!(reader.read_at(0, 0).unwrap(), Vec::<u8>::new());
    }
}
