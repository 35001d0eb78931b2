//! On-disk constants and fixed layouts for NTFS boot sectors, MFT records and
//! attribute headers, read via `#[repr(C, packed)]` structs and
//! `read_unaligned`.

/// Size of one MFT slot. Always 1024 bytes regardless of what the boot
/// sector's clusters-per-record hint claims.
pub const MFT_RECORD_SIZE: usize = 1024;

/// ASCII tag that marks a valid (in-use or not) MFT record slot.
pub const FILE_SIGNATURE: &[u8; 4] = b"FILE";

/// Sentinel attribute type terminating the attribute list in a record.
pub const ATTR_TYPE_END: i32 = -1;

/// Sector size fixup operates on.
pub const USA_SECTOR_SIZE: usize = 512;

/// MFT record number of the root directory ("." self-reference record).
pub const MFT_RECORD_ROOT: u64 = 5;

/// Mask isolating the 48-bit MFT index from a 64-bit file reference.
pub const FILE_REFERENCE_INDEX_MASK: u64 = 0x0000_FFFF_FFFF_FFFF;

/// Canonical short names for known attribute types.
///
/// Two collisions exist in the table this is grounded on: 0x40 is declared
/// twice (`vol_ver`/`obj_id`) and 0xC0 is declared twice (`sym_link`/
/// `reparse`). The second declaration wins in both cases, so 0x40
/// resolves to `ObjectId` and 0xC0 resolves to `Reparse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrShortName {
    StandardInfo,
    AttrList,
    FileName,
    ObjectId,
    Security,
    VolName,
    VolInfo,
    Data,
    IndexRoot,
    IndexAlloc,
    Bitmap,
    Reparse,
    EaInfo,
    Ea,
    LogUtil,
    /// Unknown attribute type, carrying the raw type code for the
    /// `unk_<decimal>` synthetic name.
    Unknown(u32),
}

impl AttrShortName {
    /// Map a raw attribute type code to its canonical short name.
    pub fn from_type_code(code: u32) -> Self {
        match code {
            0x10 => AttrShortName::StandardInfo,
            0x20 => AttrShortName::AttrList,
            0x30 => AttrShortName::FileName,
            0x40 => AttrShortName::ObjectId,
            0x50 => AttrShortName::Security,
            0x60 => AttrShortName::VolName,
            0x70 => AttrShortName::VolInfo,
            0x80 => AttrShortName::Data,
            0x90 => AttrShortName::IndexRoot,
            0xA0 => AttrShortName::IndexAlloc,
            0xB0 => AttrShortName::Bitmap,
            0xC0 => AttrShortName::Reparse,
            0xD0 => AttrShortName::EaInfo,
            0xE0 => AttrShortName::Ea,
            0x100 => AttrShortName::LogUtil,
            other => AttrShortName::Unknown(other),
        }
    }

    /// Render as the `unk_<decimal>` synthetic name for unknown types, or
    /// the canonical lowercase name otherwise.
    pub fn display_name(&self) -> String {
        match self {
            AttrShortName::StandardInfo => "standard_info".to_string(),
            AttrShortName::AttrList => "attr_list".to_string(),
            AttrShortName::FileName => "filename".to_string(),
            AttrShortName::ObjectId => "object_id".to_string(),
            AttrShortName::Security => "security".to_string(),
            AttrShortName::VolName => "vol_name".to_string(),
            AttrShortName::VolInfo => "vol_info".to_string(),
            AttrShortName::Data => "data".to_string(),
            AttrShortName::IndexRoot => "index_root".to_string(),
            AttrShortName::IndexAlloc => "index_alloc".to_string(),
            AttrShortName::Bitmap => "bitmap".to_string(),
            AttrShortName::Reparse => "reparse".to_string(),
            AttrShortName::EaInfo => "ea_info".to_string(),
            AttrShortName::Ea => "ea".to_string(),
            AttrShortName::LogUtil => "log_util".to_string(),
            AttrShortName::Unknown(code) => format!("unk_{}", code),
        }
    }
}

/// Header of a 1024-byte MFT record slot, up to the first-attribute offset
/// field used by the parser.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct MftRecordHeader {
    pub signature: [u8; 4],
    pub usa_offset: u16,
    pub usa_count: u16,
    pub lsn: u64,
    pub sequence_number: u16,
    pub hard_link_count: u16,
    pub first_attr_offset: u16,
    pub flags: u16,
    pub bytes_used: u32,
    pub bytes_allocated: u32,
}

impl MftRecordHeader {
    /// Read the header from the start of a 1024-byte record chunk.
    ///
    /// # Safety-free
    /// Uses `read_unaligned` rather than a transmute, so it is sound even
    /// though the input slice is not guaranteed to be aligned to the
    /// struct's natural alignment (it never is: these come from positioned
    /// disk reads).
    pub fn read(chunk: &[u8]) -> Option<Self> {
        if chunk.len() < std::mem::size_of::<MftRecordHeader>() {
            return None;
        }
        Some(unsafe { std::ptr::read_unaligned(chunk.as_ptr() as *const MftRecordHeader) })
    }
}

/// 12-byte prefix common to every attribute record within an MFT slot.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct AttributeHeaderPrefix {
    pub type_code: i32,
    pub size: u32,
    pub non_resident: u8,
    pub name_length: u8,
    pub name_offset: u16,
}

impl AttributeHeaderPrefix {
    pub const LEN: usize = 12;

    pub fn read(chunk: &[u8]) -> Option<Self> {
        if chunk.len() < Self::LEN {
            return None;
        }
        Some(unsafe { std::ptr::read_unaligned(chunk.as_ptr() as *const AttributeHeaderPrefix) })
    }
}

/// Byte offsets of the fields a resident attribute body needs, relative to
/// the start of the attribute record.
pub mod resident_offsets {
    pub const VALUE_LENGTH: usize = 16;
    pub const VALUE_OFFSET: usize = 20;
}

/// Byte offsets of the fields a non-resident attribute body needs, relative
/// to the start of the attribute record.
pub mod non_resident_offsets {
    pub const RUNLIST_OFFSET: usize = 32;
    pub const REAL_SIZE: usize = 48;
}

/// Byte layout of a FILE_NAME attribute value.
pub mod file_name_offsets {
    pub const PARENT_REFERENCE: usize = 0;
    pub const NAME_LENGTH: usize = 64;
    pub const NAME: usize = 66;
}

/// Boot sector field offsets.
pub mod boot_sector_offsets {
    pub const OEM_ID: std::ops::Range<usize> = 3..11;
    pub const OEM_ID_EXPECTED: &[u8; 8] = b"NTFS    ";
    pub const BYTES_PER_SECTOR: usize = 11;
    pub const SECTORS_PER_CLUSTER: usize = 13;
    pub const MFT_START_CLUSTER: usize = 48;
    pub const MFT_MIRROR_START_CLUSTER: usize = 56;
    pub const CLUSTERS_PER_MFT_RECORD: usize = 64;
    pub const BOOT_SECTOR_MIN_LEN: usize = 65;
}
