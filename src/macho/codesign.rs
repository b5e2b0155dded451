//! Minimal code-signature walking for entitlements extraction.
//!
//! The code signature located by LC_CODE_SIGNATURE is a SuperBlob: a
//! big-endian header followed by an index of typed sub-blobs. Only the
//! entitlements slot is consumed here; certificate chains and code
//! directories are left untouched.

use tracing::warn;

use super::binary::MachBinary;
use crate::error::Result;
use crate::util;

/// Embedded signature SuperBlob magic.
pub const CSMAGIC_EMBEDDED_SIGNATURE: u32 = 0xFADE_0CC0;

/// Embedded entitlements blob magic.
pub const CSMAGIC_EMBEDDED_ENTITLEMENTS: u32 = 0xFADE_7171;

/// SuperBlob index slot for entitlements.
pub const CSSLOT_ENTITLEMENTS: u32 = 5;

/// Extracts the entitlements XML from a code-signature SuperBlob.
///
/// Returns `Ok(None)` when the signature carries no entitlements slot.
pub fn entitlements_from_superblob(
    binary: &MachBinary,
    dataoff: u32,
    datasize: u32,
) -> Result<Option<Vec<u8>>> {
    if datasize < 12 {
        return Ok(None);
    }

    let base = dataoff as u64;
    let blob = binary.read_at(base, datasize as usize)?;

    let magic = util::read_u32_be(blob);
    if magic != CSMAGIC_EMBEDDED_SIGNATURE {
        warn!(magic = format_args!("{:#x}", magic), "unexpected code signature magic");
        return Ok(None);
    }

    let count = util::read_u32_be(&blob[8..]);
    for i in 0..count as usize {
        let index_off = 12 + i * 8;
        if index_off + 8 > blob.len() {
            break;
        }
        let slot_type = util::read_u32_be(&blob[index_off..]);
        let slot_offset = util::read_u32_be(&blob[index_off + 4..]) as usize;

        if slot_type != CSSLOT_ENTITLEMENTS {
            continue;
        }
        if slot_offset + 8 > blob.len() {
            break;
        }

        let ent_magic = util::read_u32_be(&blob[slot_offset..]);
        let ent_length = util::read_u32_be(&blob[slot_offset + 4..]) as usize;
        if ent_magic != CSMAGIC_EMBEDDED_ENTITLEMENTS
            || ent_length < 8
            || slot_offset + ent_length > blob.len()
        {
            warn!("malformed entitlements blob in code signature");
            return Ok(None);
        }

        return Ok(Some(blob[slot_offset + 8..slot_offset + ent_length].to_vec()));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a SuperBlob containing a single entitlements blob.
    pub(crate) fn build_superblob(xml: &[u8]) -> Vec<u8> {
        let ent_len = 8 + xml.len() as u32;
        let mut blob = Vec::new();
        blob.extend_from_slice(&CSMAGIC_EMBEDDED_SIGNATURE.to_be_bytes());
        blob.extend_from_slice(&(20 + ent_len).to_be_bytes());
        blob.extend_from_slice(&1u32.to_be_bytes());
        // one index entry: entitlements at offset 20
        blob.extend_from_slice(&CSSLOT_ENTITLEMENTS.to_be_bytes());
        blob.extend_from_slice(&20u32.to_be_bytes());
        blob.extend_from_slice(&CSMAGIC_EMBEDDED_ENTITLEMENTS.to_be_bytes());
        blob.extend_from_slice(&ent_len.to_be_bytes());
        blob.extend_from_slice(xml);
        blob
    }

    #[test]
    fn test_superblob_layout() {
        let xml = b"<plist/>";
        let blob = build_superblob(xml);
        assert_eq!(util::read_u32_be(&blob), CSMAGIC_EMBEDDED_SIGNATURE);
        assert_eq!(util::read_u32_be(&blob[12..]), CSSLOT_ENTITLEMENTS);
        assert_eq!(&blob[28..], xml);
    }
}
