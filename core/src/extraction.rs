//! Extraction façade: turns one MFT slot's attribute map into byte
//! sequences ready for an external output collaborator.

use std::collections::HashMap;

use crate::block_reader::BlockReader;
use crate::error::Result;
use crate::mft_record::AttributeMap;
use crate::structures::AttrShortName;

/// Materialized data streams of one file.
pub struct ExtractedFile {
    pub primary: Vec<u8>,
    pub alternates: HashMap<String, Vec<u8>>,
}

/// Materialize the primary DATA stream and every alternate data stream of
/// `attrs`. Missing unnamed DATA yields an empty primary rather than an
/// error; this never retries, since producers are idempotent.
pub fn materialize(attrs: &AttributeMap, reader: &mut dyn BlockReader) -> Result<ExtractedFile> {
    let mut primary = Vec::new();
    let mut alternates = HashMap::new();

    if let Some(streams) = attrs.get(&AttrShortName::Data) {
        for (stream_name, value) in streams {
            match stream_name {
                None => primary = value.materialize(reader)?,
                Some(name) => {
                    alternates.insert(name.clone(), value.materialize(reader)?);
                }
            }
        }
    }

    Ok(ExtractedFile {
        primary,
        alternates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeValue;
    use crate::block_reader::FileBlockReader;
    use std::io::Cursor;

    fn reader() -> FileBlockReader<Cursor<Vec<u8>>> {
        FileBlockReader::new(Cursor::new(Vec::new()))
    }

    #[test]
    fn missing_data_yields_empty_primary() {
        let attrs: AttributeMap = HashMap::new();
        let extracted = materialize(&attrs, &mut reader()).unwrap();
        assert!(extracted.primary.is_empty());
        assert!(extracted.alternates.is_empty());
    }

    #[test]
    fn primary_and_ads_are_separated() {
        let mut attrs: AttributeMap = HashMap::new();
        let mut streams = HashMap::new();
        streams.insert(None, AttributeValue::Resident(b"primary".to_vec()));
        streams.insert(
            Some("stream".to_string()),
            AttributeValue::Resident(b"alt".to_vec()),
        );
        attrs.insert(AttrShortName::Data, streams);

        let extracted = materialize(&attrs, &mut reader()).unwrap();
        assert_eq!(extracted.primary, b"primary");
        assert_eq!(extracted.alternates.get("stream").unwrap(), b"alt");
    }
}
