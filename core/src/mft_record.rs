//! Parses one 1024-byte MFT slot into its attribute map.

use std::collections::HashMap;

use crate::attributes::{parse_attr, AttributeValue};
use crate::structures::{AttrShortName, AttributeHeaderPrefix, MftRecordHeader, ATTR_TYPE_END, FILE_SIGNATURE};
use crate::usa::usa_fixup;

/// Attributes of one file, keyed by canonical short name then by stream
/// name (`None` is the unnamed default stream). A duplicate `(type, name)`
/// pair within a record keeps the last occurrence, matching source
/// behavior of overwriting a dict entry.
pub type AttributeMap = HashMap<AttrShortName, HashMap<Option<String>, AttributeValue>>;

/// Parse a 1024-byte slot. `record_offset` is used only for diagnostics.
///
/// Returns `None` if the slot doesn't carry the `FILE` tag (an absent
/// slot, never an error). A structurally broken record after the tag
/// still yields `Some`, with however many attributes were parsed before
/// the corruption was hit.
pub fn parse_file_record(
    record_offset: u64,
    bytes_per_cluster: u64,
    chunk: &[u8],
) -> Option<AttributeMap> {
    if chunk.len() < 4 || &chunk[0..4] != FILE_SIGNATURE {
        return None;
    }

    let header = match MftRecordHeader::read(chunk) {
        Some(h) => h,
        None => {
            log::warn!("record at {} too short for header", record_offset);
            return Some(HashMap::new());
        }
    };

    let chunk = usa_fixup(chunk, header.usa_offset, header.usa_count);

    let mut attrs: AttributeMap = HashMap::new();
    let mut pos = header.first_attr_offset as usize;

    loop {
        if pos + AttributeHeaderPrefix::LEN > chunk.len() {
            log::warn!(
                "record at {}: attribute loop truncated at offset {}",
                record_offset,
                pos
            );
            break;
        }

        let prefix = match AttributeHeaderPrefix::read(&chunk[pos..]) {
            Some(p) => p,
            None => break,
        };

        if prefix.type_code == ATTR_TYPE_END {
            break;
        }

        let size = prefix.size as usize;
        if size == 0 {
            log::warn!(
                "record at {}: zero-length attribute at offset {}, stopping",
                record_offset,
                pos
            );
            break;
        }

        let end = pos + size;
        if end > chunk.len() {
            log::warn!(
                "record at {}: attribute at offset {} declares size {} beyond record bounds",
                record_offset,
                pos,
                size
            );
            break;
        }

        match parse_attr(bytes_per_cluster, &chunk[pos..end]) {
            Ok(parsed) => {
                attrs
                    .entry(parsed.short_name)
                    .or_default()
                    .insert(parsed.stream_name, parsed.value);
            }
            Err(e) => {
                log::warn!(
                    "record at {}: failed to parse attribute type={} pos={}: {}",
                    record_offset,
                    prefix.type_code,
                    pos,
                    e
                );
            }
        }

        pos += size;
    }

    Some(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_record_with_resident_data(name_value: &[u8]) -> Vec<u8> {
        let attr_offset = 56u16;
        let value_offset = 24u16;
        let attr_size = value_offset as usize + name_value.len();
        let mut chunk = vec![0u8; 1024];
        chunk[0..4].copy_from_slice(FILE_SIGNATURE);
        chunk[4..6].copy_from_slice(&0u16.to_le_bytes()); // usa_offset = 0 -> no fixup
        chunk[6..8].copy_from_slice(&0u16.to_le_bytes()); // usa_count = 0
        chunk[20..22].copy_from_slice(&attr_offset.to_le_bytes());

        let pos = attr_offset as usize;
        chunk[pos..pos + 4].copy_from_slice(&0x80i32.to_le_bytes());
        chunk[pos + 4..pos + 8].copy_from_slice(&(attr_size as u32).to_le_bytes());
        chunk[pos + 8] = 0;
        chunk[pos + 9] = 0;
        chunk[pos + 16..pos + 20].copy_from_slice(&(name_value.len() as u32).to_le_bytes());
        chunk[pos + 20..pos + 22].copy_from_slice(&value_offset.to_le_bytes());
        chunk[pos + value_offset as usize..pos + value_offset as usize + name_value.len()]
            .copy_from_slice(name_value);

        let end = pos + attr_size;
        chunk[end..end + 4].copy_from_slice(&ATTR_TYPE_END.to_le_bytes());

        chunk
    }

    #[test]
    fn non_file_slot_is_none() {
        let chunk = vec![0u8; 1024];
        assert!(parse_file_record(0, 512, &chunk).is_none());
    }

    #[test]
    fn parses_resident_data_into_map() {
        let chunk = minimal_record_with_resident_data(b"hello");
        let attrs = parse_file_record(0, 512, &chunk).unwrap();
        let data = attrs.get(&AttrShortName::Data).unwrap();
        let value = data.get(&None).unwrap();
        let mut reader =
            crate::block_reader::FileBlockReader::new(std::io::Cursor::new(Vec::<u8>::new()));
        assert_eq!(value.materialize(&mut reader).unwrap(), b"hello");
    }

    #[test]
    fn short_chunk_does_not_panic() {
        let chunk = vec![b'F', b'I', b'L', b'E'];
        let attrs = parse_file_record(0, 512, &chunk).unwrap();
        assert!(attrs.is_empty());
    }
}
