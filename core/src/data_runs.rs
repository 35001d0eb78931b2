//! NTFS runlist decoder.
//!
//! Decodes the variable-width delta-encoded cluster runs that describe a
//! non-resident attribute's on-disk extents.

use crate::error::{NtfsError, Result};
use crate::varint::parse_varint;

/// One decoded run: `length` clusters starting at absolute cluster `lcn`.
///
/// A sparse run (`offset_size == 0` in its header byte) carries a delta of
/// 0, so `lcn` is simply whatever the running absolute offset already was
/// before this run — materialization re-reads from that last-known
/// position rather than zero-filling a hole. This core does not give
/// sparse runs any special physical representation beyond that signed-delta
/// decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRun {
    /// Absolute logical cluster number this run starts at.
    pub lcn: u64,
    /// Length of the run, in clusters.
    pub length: u64,
}

/// Decode a runlist starting at the beginning of `data`.
///
/// Stops at the first `0x00` header byte or at the end of the slice,
/// whichever comes first; trailing bytes after the end marker are not
/// consumed.
pub fn decode_data_runs(data: &[u8]) -> Result<Vec<DataRun>> {
    let mut runs = Vec::new();
    let mut pos = 0;
    let mut prev_lcn: i64 = 0;

    while pos < data.len() {
        let header = data[pos];
        if header == 0 {
            break;
        }

        let length_size = (header & 0x0F) as usize;
        let offset_size = ((header >> 4) & 0x0F) as usize;
        pos += 1;

        if pos + length_size + offset_size > data.len() {
            return Err(NtfsError::Format {
                record_offset: pos as u64,
                what: "runlist",
                detail: "run extends beyond buffer".to_string(),
            });
        }

        let length = parse_varint(&data[pos..pos + length_size], false) as u64;
        pos += length_size;

        // offset_size == 0 is a sparse run: the delta is 0, so the running
        // absolute offset carries over unchanged and this run reads from
        // the same position the previous one left off at.
        let delta = if offset_size == 0 {
            0
        } else {
            let d = parse_varint(&data[pos..pos + offset_size], true);
            pos += offset_size;
            d
        };

        let lcn = prev_lcn + delta;
        prev_lcn = lcn;

        if lcn < 0 {
            return Err(NtfsError::Format {
                record_offset: pos as u64,
                what: "runlist",
                detail: format!("negative LCN after delta: {}", lcn),
            });
        }

        log::trace!("run: lcn={} length={}", lcn, length);
        runs.push(DataRun {
            lcn: lcn as u64,
            length,
        });
    }

    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_simple_run() {
        let data = vec![0x21, 0x10, 0x64, 0x00, 0x00];
        let runs = decode_data_runs(&data).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].lcn, 100);
        assert_eq!(runs[0].length, 16);
    }

    #[test]
    fn decode_multiple_runs() {
        let data = vec![0x21, 0x0A, 0x64, 0x00, 0x21, 0x14, 0x64, 0x00, 0x00];
        let runs = decode_data_runs(&data).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].lcn, 100);
        assert_eq!(runs[0].length, 10);
        assert_eq!(runs[1].lcn, 200);
        assert_eq!(runs[1].length, 20);
    }

    #[test]
    fn decode_sparse_run_at_start_reads_from_offset_zero() {
        // No prior run, so the carried-over running offset is still 0: a
        // leading sparse run has no "last known position" of its own.
        let data = vec![0x01, 0x20, 0x00];
        let runs = decode_data_runs(&data).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].lcn, 0);
        assert_eq!(runs[0].length, 32);
    }

    #[test]
    fn decode_sparse_run_after_real_run_reuses_last_known_offset() {
        // Real run at lcn=100, then a sparse run (offset_size=0) that must
        // carry forward the same lcn rather than being a zero-filled hole.
        let data = vec![0x21, 0x0A, 0x64, 0x00, 0x01, 0x05, 0x00];
        let runs = decode_data_runs(&data).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].lcn, 100);
        assert_eq!(runs[0].length, 10);
        assert_eq!(runs[1].lcn, 100);
        assert_eq!(runs[1].length, 5);
    }

    #[test]
    fn decode_negative_offset() {
        let data = vec![0x22, 0x0A, 0x00, 0xE8, 0x03, 0x11, 0x05, 0x9C, 0x00];
        let runs = decode_data_runs(&data).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].lcn, 1000);
        assert_eq!(runs[1].lcn, 900);
    }

    #[test]
    fn empty_runlist_yields_no_runs() {
        let data = vec![0x00];
        let runs = decode_data_runs(&data).unwrap();
        assert!(runs.is_empty());
    }

    #[test]
    fn truncated_run_is_format_error() {
        let data = vec![0x21, 0x10];
        assert!(decode_data_runs(&data).is_err());
    }
}
