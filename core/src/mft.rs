//! MFT loader: resolves the chicken-and-egg of a fragmented `$MFT` by
//! reading a geometry-estimated bootstrap chunk, parsing its first slot as
//! `$MFT` itself, then re-reading the full MFT through that record's own
//! DATA runlist.

use crate::attributes::AttributeValue;
use crate::block_reader::BlockReader;
use crate::error::{NtfsError, Result};
use crate::mft_record::parse_file_record;
use crate::structures::{AttrShortName, MFT_RECORD_SIZE};
use crate::volume::VolumeGeometry;

/// Read the full MFT byte image.
///
/// `bootstrap_clusters_hint` comes from the boot sector's
/// clusters-per-MFT-record byte; at least one 1024-byte slot is always
/// read regardless of what it claims.
pub fn read_mft(
    reader: &mut dyn BlockReader,
    geometry: &VolumeGeometry,
    bootstrap_clusters_hint: u8,
) -> Result<Vec<u8>> {
    let bpc = geometry.bytes_per_cluster();
    let bootstrap_bytes =
        (bootstrap_clusters_hint.max(1) as u64 * bpc).max(MFT_RECORD_SIZE as u64) as usize;

    log::debug!(
        "bootstrapping MFT from cluster {} ({} bytes)",
        geometry.mft_start_cluster,
        bootstrap_bytes
    );

    let bootstrap = reader.read_at(geometry.mft_start_cluster * bpc, bootstrap_bytes)?;

    let mft_record_attrs = parse_file_record(0, bpc, &bootstrap[..MFT_RECORD_SIZE]);

    let mft_record_attrs = match mft_record_attrs {
        Some(attrs) => attrs,
        None => {
            return Err(NtfsError::Format {
                record_offset: geometry.mft_start_cluster * bpc,
                what: "$MFT record 0",
                detail: "missing FILE signature".to_string(),
            });
        }
    };

    let data_producer = mft_record_attrs
        .get(&AttrShortName::Data)
        .and_then(|streams| streams.get(&None));

    let data_producer = match data_producer {
        Some(p) => p,
        None => {
            log::warn!("$MFT record 0 has no unnamed DATA attribute, using bootstrap read as-is");
            return Ok(bootstrap);
        }
    };

    match materialize_mft(data_producer, reader) {
        Ok(full_mft) if full_mft.len() >= bootstrap.len() => {
            log::info!(
                "re-read $MFT via its own runlist: {} bytes (bootstrap was {})",
                full_mft.len(),
                bootstrap.len()
            );
            Ok(full_mft)
        }
        Ok(full_mft) => {
            log::warn!(
                "$MFT re-read ({} bytes) shorter than bootstrap read ({} bytes), keeping bootstrap",
                full_mft.len(),
                bootstrap.len()
            );
            Ok(bootstrap)
        }
        Err(e) => {
            log::warn!(
                "failed to load $MFT via its own runlist ({}), proceeding with bootstrap read",
                e
            );
            Ok(bootstrap)
        }
    }
}

fn materialize_mft(value: &AttributeValue, reader: &mut dyn BlockReader) -> Result<Vec<u8>> {
    value.materialize(reader)
}
