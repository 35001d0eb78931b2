//! Reconstructs full paths by walking parent file references through
//! FILE_NAME attributes, bottom-up from a given slot to the root.
//!
//! Shaped as a struct owning a cache with a `new()` constructor and
//! `debug!`/`trace!` logging, but walks up through parent pointers rather
//! than down through a directory index.

use std::collections::HashMap;

use crate::attributes::parse_file_name;
use crate::mft_record::AttributeMap;
use crate::structures::{AttrShortName, FILE_REFERENCE_INDEX_MASK, MFT_RECORD_ROOT};

/// Resolves MFT slot indices to their full path.
pub struct PathResolver {
    /// Cache of slot index to resolved path components, populated as
    /// walks complete so siblings under a shared ancestor don't re-walk
    /// the common prefix.
    component_cache: HashMap<u64, Vec<String>>,
}

/// Why a path walk could not reach the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathResolveError {
    /// The slot at the given index has no `FILE_NAME` attribute, or the
    /// slot itself doesn't exist.
    Orphaned(u64),
    /// The walk exceeded the total record count without reaching root;
    /// a corrupt parent chain forms a cycle.
    CycleDetected(u64),
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PathResolver {
    pub fn new() -> Self {
        Self {
            component_cache: HashMap::new(),
        }
    }

    /// Resolve slot `i` to its ordered path components, root-to-leaf.
    ///
    /// `mft_index` is the parsed MFT; `total_records` bounds the walk so a
    /// corrupt parent cycle aborts instead of looping forever.
    pub fn path_of(
        &mut self,
        mft_index: &[Option<AttributeMap>],
        total_records: usize,
        i: u64,
    ) -> Result<Vec<String>, PathResolveError> {
        if let Some(cached) = self.component_cache.get(&i) {
            log::trace!("path_of({}): cache hit", i);
            return Ok(cached.clone());
        }

        let mut bits = Vec::new();
        let mut current = i;
        let mut steps = 0usize;

        loop {
            if steps > total_records {
                log::warn!("path_of({}): exceeded {} steps, aborting as cycle", i, total_records);
                return Err(PathResolveError::CycleDetected(i));
            }
            steps += 1;

            let (parent_ref, name) = self.file_name_of(mft_index, current)?;

            if name == "." {
                if current != MFT_RECORD_ROOT {
                    log::warn!(
                        "path_of({}): self-reference \".\" found at record {}, not the usual root record {}",
                        i,
                        current,
                        MFT_RECORD_ROOT
                    );
                }
                break;
            }

            bits.push(name);
            current = parent_ref & FILE_REFERENCE_INDEX_MASK;
        }

        bits.reverse();
        log::debug!("path_of({}): resolved to {} components", i, bits.len());
        self.component_cache.insert(i, bits.clone());
        Ok(bits)
    }

    fn file_name_of(
        &self,
        mft_index: &[Option<AttributeMap>],
        i: u64,
    ) -> Result<(u64, String), PathResolveError> {
        let attrs = mft_index
            .get(i as usize)
            .and_then(|slot| slot.as_ref())
            .ok_or(PathResolveError::Orphaned(i))?;

        let file_name_bytes = attrs
            .get(&AttrShortName::FileName)
            .and_then(|streams| streams.get(&None))
            .ok_or(PathResolveError::Orphaned(i))?;

        // FILE_NAME is always resident in practice; materialize doesn't
        // need a block reader for the resident branch, so pass a reader
        // whose non-resident path is unreachable here.
        let mut reader = crate::block_reader::FileBlockReader::new(std::io::Cursor::new(Vec::<u8>::new()));
        let bytes = file_name_bytes
            .materialize(&mut reader)
            .map_err(|_| PathResolveError::Orphaned(i))?;

        parse_file_name(&bytes).map_err(|_| PathResolveError::Orphaned(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeValue;
    use std::collections::HashMap;

    fn file_name_attr(parent_ref: u64, name: &str) -> AttributeValue {
        let name_units: Vec<u16> = name.encode_utf16().collect();
        let mut payload = vec![0u8; 66 + name_units.len() * 2];
        payload[0..8].copy_from_slice(&parent_ref.to_le_bytes());
        payload[64] = name_units.len() as u8;
        for (i, unit) in name_units.iter().enumerate() {
            payload[66 + i * 2..66 + i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        }
        AttributeValue::Resident(payload)
    }

    fn slot_with_file_name(parent_ref: u64, name: &str) -> AttributeMap {
        let mut attrs: AttributeMap = HashMap::new();
        let mut streams = HashMap::new();
        streams.insert(None, file_name_attr(parent_ref, name));
        attrs.insert(AttrShortName::FileName, streams);
        attrs
    }

    #[test]
    fn resolves_nested_path_to_root() {
        // slot 5 = root ("."), slot 6 = "dir" under root, slot 7 = "a.txt" under dir
        let mft = vec![
            None,
            None,
            None,
            None,
            None,
            Some(slot_with_file_name(5, ".")),
            Some(slot_with_file_name(5, "dir")),
            Some(slot_with_file_name(6, "a.txt")),
        ];
        let mut resolver = PathResolver::new();
        let path = resolver.path_of(&mft, mft.len(), 7).unwrap();
        assert_eq!(path, vec!["dir".to_string(), "a.txt".to_string()]);
    }

    #[test]
    fn resolves_even_when_root_self_reference_is_not_record_five() {
        // The walk only requires the literal "." name to terminate, not
        // that it lives at MFT_RECORD_ROOT; a non-standard root still
        // resolves (with only a logged warning, not a failure).
        let mft = vec![
            Some(slot_with_file_name(0, ".")),
            Some(slot_with_file_name(0, "a.txt")),
        ];
        let mut resolver = PathResolver::new();
        let path = resolver.path_of(&mft, mft.len(), 1).unwrap();
        assert_eq!(path, vec!["a.txt".to_string()]);
    }

    #[test]
    fn missing_file_name_is_orphaned() {
        let mft: Vec<Option<AttributeMap>> = vec![None];
        let mut resolver = PathResolver::new();
        let err = resolver.path_of(&mft, mft.len(), 0).unwrap_err();
        assert_eq!(err, PathResolveError::Orphaned(0));
    }

    #[test]
    fn parent_cycle_is_bounded() {
        let mft = vec![
            Some(slot_with_file_name(1, "a")),
            Some(slot_with_file_name(0, "b")),
        ];
        let mut resolver = PathResolver::new();
        let err = resolver.path_of(&mft, mft.len(), 0).unwrap_err();
        assert_eq!(err, PathResolveError::CycleDetected(0));
    }
}
