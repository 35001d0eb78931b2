//! Attribute header parsing and the deferred byte-producer abstraction.
//!
//! Producers are a tagged variant rather than a closure, so they are
//! owned, movable, and don't keep a borrow on the record buffer they
//! were parsed from.

use byteorder::{ByteOrder, LittleEndian};

use crate::block_reader::BlockReader;
use crate::data_runs::{decode_data_runs, DataRun};
use crate::error::{NtfsError, Result};
use crate::structures::{
    file_name_offsets, non_resident_offsets, resident_offsets, AttrShortName,
    AttributeHeaderPrefix,
};

/// A parsed attribute's deferred value. Resident values are already in
/// hand; non-resident values carry only the runlist and real size until
/// `materialize` is called.
#[derive(Debug, Clone)]
pub enum AttributeValue {
    Resident(Vec<u8>),
    NonResident {
        runs: Vec<DataRun>,
        bytes_per_cluster: u64,
        real_size: u64,
    },
}

impl AttributeValue {
    /// Produce the logical value bytes. Resident values are cloned
    /// in-place; non-resident values walk their runlist through `reader`,
    /// concatenate, and truncate to `real_size`. A sparse run's `lcn` is
    /// already the last-known absolute offset carried forward by the
    /// runlist decoder, so it is read like any other run rather than
    /// zero-filled; this core gives sparse holes no special materialization.
    ///
    /// Calling this multiple times is safe and always re-derives the
    /// result; no state is mutated.
    pub fn materialize(&self, reader: &mut dyn BlockReader) -> Result<Vec<u8>> {
        match self {
            AttributeValue::Resident(bytes) => Ok(bytes.clone()),
            AttributeValue::NonResident {
                runs,
                bytes_per_cluster,
                real_size,
            } => {
                let mut out = Vec::new();
                for run in runs {
                    let run_len = (run.length * bytes_per_cluster) as usize;
                    let chunk = reader.read_at(run.lcn * bytes_per_cluster, run_len)?;
                    out.extend_from_slice(&chunk);
                }
                let real_size = *real_size as usize;
                if out.len() < real_size {
                    log::warn!(
                        "non-resident value shorter than declared real size: {} < {}",
                        out.len(),
                        real_size
                    );
                } else {
                    out.truncate(real_size);
                }
                Ok(out)
            }
        }
    }
}

/// One parsed attribute: its canonical short name, optional stream name,
/// and deferred value.
#[derive(Debug, Clone)]
pub struct ParsedAttribute {
    pub short_name: AttrShortName,
    pub stream_name: Option<String>,
    pub value: AttributeValue,
}

/// Decode a UTF-16LE name field of `len` code units starting at `offset`.
fn read_utf16_name(bytes: &[u8], offset: usize, len: usize) -> Option<String> {
    if len == 0 {
        return None;
    }
    let end = offset + len * 2;
    if end > bytes.len() {
        return None;
    }
    let units: Vec<u16> = bytes[offset..end]
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    Some(String::from_utf16_lossy(&units))
}

/// Decode the FILE_NAME attribute payload: parent file reference and
/// filename.
pub fn parse_file_name(bytes: &[u8]) -> Result<(u64, String)> {
    if bytes.len() < file_name_offsets::NAME {
        return Err(NtfsError::Format {
            record_offset: 0,
            what: "FILE_NAME",
            detail: "payload shorter than fixed header".to_string(),
        });
    }
    let parent_ref = LittleEndian::read_u64(
        &bytes[file_name_offsets::PARENT_REFERENCE..file_name_offsets::PARENT_REFERENCE + 8],
    );
    let name_len = bytes[file_name_offsets::NAME_LENGTH] as usize;
    let name = read_utf16_name(bytes, file_name_offsets::NAME, name_len).ok_or_else(|| {
        NtfsError::Format {
            record_offset: 0,
            what: "FILE_NAME",
            detail: "filename extends beyond payload".to_string(),
        }
    })?;
    Ok((parent_ref, name))
}

/// Parse one attribute record (the slice spans exactly the attribute's
/// declared `size`) into its short name, stream name, and deferred value.
pub fn parse_attr(bytes_per_cluster: u64, record: &[u8]) -> Result<ParsedAttribute> {
    let prefix = AttributeHeaderPrefix::read(record).ok_or_else(|| NtfsError::Format {
        record_offset: 0,
        what: "attribute",
        detail: "record shorter than 12-byte prefix".to_string(),
    })?;

    let type_code = prefix.type_code;
    let non_resident = prefix.non_resident;
    let name_length = prefix.name_length as usize;
    let name_offset = prefix.name_offset as usize;

    let short_name = AttrShortName::from_type_code(type_code as u32);
    let stream_name = read_utf16_name(record, name_offset, name_length);

    let value = if non_resident == 0 {
        if record.len() < resident_offsets::VALUE_OFFSET + 2 {
            return Err(NtfsError::Format {
                record_offset: 0,
                what: "attribute",
                detail: "resident header truncated".to_string(),
            });
        }
        let value_length = LittleEndian::read_u32(
            &record[resident_offsets::VALUE_LENGTH..resident_offsets::VALUE_LENGTH + 4],
        ) as usize;
        let value_offset = LittleEndian::read_u16(
            &record[resident_offsets::VALUE_OFFSET..resident_offsets::VALUE_OFFSET + 2],
        ) as usize;
        let end = value_offset + value_length;
        if end > record.len() {
            return Err(NtfsError::Format {
                record_offset: 0,
                what: "attribute",
                detail: "resident value extends beyond attribute record".to_string(),
            });
        }
        AttributeValue::Resident(record[value_offset..end].to_vec())
    } else {
        if record.len() < non_resident_offsets::REAL_SIZE + 8 {
            return Err(NtfsError::Format {
                record_offset: 0,
                what: "attribute",
                detail: "non-resident header truncated".to_string(),
            });
        }
        let runlist_offset = LittleEndian::read_u16(
            &record[non_resident_offsets::RUNLIST_OFFSET..non_resident_offsets::RUNLIST_OFFSET + 2],
        ) as usize;
        let real_size = LittleEndian::read_u64(
            &record[non_resident_offsets::REAL_SIZE..non_resident_offsets::REAL_SIZE + 8],
        );
        let runs = if runlist_offset <= record.len() {
            decode_data_runs(&record[runlist_offset..])?
        } else {
            Vec::new()
        };
        AttributeValue::NonResident {
            runs,
            bytes_per_cluster,
            real_size,
        }
    };

    Ok(ParsedAttribute {
        short_name,
        stream_name,
        value,
    })
}
