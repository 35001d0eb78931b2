//! Boot sector validation and volume geometry extraction.

use byteorder::{ByteOrder, LittleEndian};

use crate::block_reader::BlockReader;
use crate::error::{NtfsError, Result};
use crate::structures::boot_sector_offsets as off;

/// Volume geometry, fixed once the boot sector has been read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeGeometry {
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub mft_start_cluster: u64,
    pub mft_mirror_start_cluster: u64,
    pub clusters_per_mft_record_hint: u8,
}

impl VolumeGeometry {
    pub fn bytes_per_cluster(&self) -> u64 {
        self.bytes_per_sector as u64 * self.sectors_per_cluster as u64
    }
}

/// Caller-supplied overrides for boot-sector-derived geometry
/// (`sector_size` / `cluster_size` collaborator options).
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryOverrides {
    pub sector_size: Option<u16>,
    pub cluster_size: Option<u8>,
}

/// Read and validate the boot sector at offset 0, producing volume
/// geometry. Fatal on a magic mismatch or short read.
pub fn read_boot_sector(
    reader: &mut dyn BlockReader,
    overrides: GeometryOverrides,
) -> Result<VolumeGeometry> {
    let boot = reader.read_at(0, off::BOOT_SECTOR_MIN_LEN)?;

    if &boot[off::OEM_ID] != off::OEM_ID_EXPECTED {
        return Err(NtfsError::Geometry(format!(
            "boot sector OEM id mismatch: {:?}",
            &boot[off::OEM_ID]
        )));
    }

    let bytes_per_sector = overrides.sector_size.unwrap_or_else(|| {
        LittleEndian::read_u16(&boot[off::BYTES_PER_SECTOR..off::BYTES_PER_SECTOR + 2])
    });
    let sectors_per_cluster = overrides
        .cluster_size
        .unwrap_or(boot[off::SECTORS_PER_CLUSTER]);

    let mft_start_cluster =
        LittleEndian::read_u64(&boot[off::MFT_START_CLUSTER..off::MFT_START_CLUSTER + 8]);
    let mft_mirror_start_cluster = LittleEndian::read_u64(
        &boot[off::MFT_MIRROR_START_CLUSTER..off::MFT_MIRROR_START_CLUSTER + 8],
    );
    let clusters_per_mft_record_hint = boot[off::CLUSTERS_PER_MFT_RECORD];

    let geometry = VolumeGeometry {
        bytes_per_sector,
        sectors_per_cluster,
        mft_start_cluster,
        mft_mirror_start_cluster,
        clusters_per_mft_record_hint,
    };

    if geometry.bytes_per_cluster() == 0 {
        return Err(NtfsError::Geometry(
            "bytes-per-cluster resolved to 0".to_string(),
        ));
    }

    log::debug!(
        "volume geometry: bps={} spc={} bpc={} mft_start={}",
        geometry.bytes_per_sector,
        geometry.sectors_per_cluster,
        geometry.bytes_per_cluster(),
        geometry.mft_start_cluster
    );

    Ok(geometry)
}
