//! Update Sequence Array fixup.
//!
//! NTFS displaces the last two bytes of every on-disk sector in a
//! multi-sector record (MFT records, index allocation records) into an
//! update-sequence array, so torn writes during a crash are detectable.
//! This undoes that displacement before the record is parsed.

use crate::structures::USA_SECTOR_SIZE;

/// Restore the original per-sector tail bytes of `chunk`.
///
/// If either `usa_ofs` or `usa_count` is zero the chunk is returned
/// unchanged (no fixup was applied to this record). Sectors whose stored
/// tail doesn't match the update-sequence number are left alone and a
/// warning is logged with the sector's offset within `chunk`; the caller
/// is expected to add its own base offset when it wants a disk-relative
/// position in the log.
pub fn usa_fixup(chunk: &[u8], usa_ofs: u16, usa_count: u16) -> Vec<u8> {
    let mut chunk = chunk.to_vec();
    if usa_ofs == 0 || usa_count == 0 {
        return chunk;
    }

    let usa_ofs = usa_ofs as usize;
    if usa_ofs + 2 > chunk.len() {
        log::warn!("USA offset {} out of bounds for {}-byte record", usa_ofs, chunk.len());
        return chunk;
    }

    let usa_num = [chunk[usa_ofs], chunk[usa_ofs + 1]];
    let mut array_pos = usa_ofs + 2;

    let sector_count = chunk.len() / USA_SECTOR_SIZE;
    for sector in 0..sector_count {
        let tail = sector * USA_SECTOR_SIZE + USA_SECTOR_SIZE - 2;
        if array_pos + 2 > chunk.len() {
            break;
        }
        if chunk[tail] != usa_num[0] || chunk[tail + 1] != usa_num[1] {
            log::warn!("bad USA data at record offset {} - disk corrupt?", tail);
        } else {
            chunk[tail] = chunk[array_pos];
            chunk[tail + 1] = chunk[array_pos + 1];
        }
        array_pos += 2;
    }

    chunk
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(sector_count: usize, usa_num: [u8; 2], tails_ok: bool) -> Vec<u8> {
        let mut chunk = vec![0u8; sector_count * USA_SECTOR_SIZE];
        // usa_ofs = 48 (arbitrary, past the fixed MFT header), usa_count = sector_count + 1.
        let usa_ofs = 48usize;
        chunk[usa_ofs] = usa_num[0];
        chunk[usa_ofs + 1] = usa_num[1];
        let mut array_pos = usa_ofs + 2;
        for sector in 0..sector_count {
            let tail = sector * USA_SECTOR_SIZE + USA_SECTOR_SIZE - 2;
            if tails_ok {
                chunk[tail] = usa_num[0];
                chunk[tail + 1] = usa_num[1];
            }
            // original bytes displaced into the array; use the sector index as a marker.
            chunk[array_pos] = sector as u8;
            chunk[array_pos + 1] = 0xAA;
            array_pos += 2;
        }
        chunk
    }

    #[test]
    fn zero_usa_ofs_is_noop() {
        let chunk = vec![1, 2, 3, 4];
        let fixed = usa_fixup(&chunk, 0, 3);
        assert_eq!(fixed, chunk);
    }

    #[test]
    fn zero_usa_count_is_noop() {
        let chunk = vec![1, 2, 3, 4];
        let fixed = usa_fixup(&chunk, 48, 0);
        assert_eq!(fixed, chunk);
    }

    #[test]
    fn restores_matching_sector_tails() {
        let chunk = make_record(2, [0x5A, 0x5A], true);
        let fixed = usa_fixup(&chunk, 48, 3);
        assert_eq!(&fixed[510..512], &[0, 0xAA]);
        assert_eq!(&fixed[1022..1024], &[1, 0xAA]);
    }

    #[test]
    fn leaves_mismatched_tail_untouched_but_continues() {
        let chunk = make_record(2, [0x5A, 0x5A], false);
        let fixed = usa_fixup(&chunk, 48, 3);
        // Tails were never stamped with the USA number, so the fixup should
        // warn and skip them, leaving the original (zeroed) bytes in place.
        assert_eq!(&fixed[510..512], &[0, 0]);
        assert_eq!(&fixed[1022..1024], &[0, 0]);
    }
}
