//! Dyld bind opcode stream parsing.
//!
//! LC_DYLD_INFO locates byte streams that drive a small stack machine in
//! dyld. Interpreting the bind and lazy-bind streams reconstructs which
//! virtual address dyld will overwrite with which imported symbol: the
//! same information the indirect symbol table provides for stub sections,
//! but covering every bound pointer in the binary.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use super::binary::MachBinary;
use crate::error::Result;
use crate::util;

// =============================================================================
// Bind Opcodes
// =============================================================================

/// Opcode mask (high nibble of each stream byte).
pub const BIND_OPCODE_MASK: u8 = 0xF0;
/// Immediate mask (low nibble of each stream byte).
pub const BIND_IMMEDIATE_MASK: u8 = 0x0F;

/// End of the stream.
pub const BIND_OPCODE_DONE: u8 = 0x00;
/// Set library ordinal from the immediate.
pub const BIND_OPCODE_SET_DYLIB_ORDINAL_IMM: u8 = 0x10;
/// Set library ordinal from a trailing ULEB.
pub const BIND_OPCODE_SET_DYLIB_ORDINAL_ULEB: u8 = 0x20;
/// Set a special (negative) library ordinal from the immediate.
pub const BIND_OPCODE_SET_DYLIB_SPECIAL_IMM: u8 = 0x30;
/// Set the symbol name from a trailing NUL-terminated string.
pub const BIND_OPCODE_SET_SYMBOL_TRAILING_FLAGS_IMM: u8 = 0x40;
/// Set the bind type from the immediate.
pub const BIND_OPCODE_SET_TYPE_IMM: u8 = 0x50;
/// Set the addend from a trailing SLEB.
pub const BIND_OPCODE_SET_ADDEND_SLEB: u8 = 0x60;
/// Select segment (immediate) and offset (ULEB).
pub const BIND_OPCODE_SET_SEGMENT_AND_OFFSET_ULEB: u8 = 0x70;
/// Advance the offset by a ULEB.
pub const BIND_OPCODE_ADD_ADDR_ULEB: u8 = 0x80;
/// Apply a bind at the current location.
pub const BIND_OPCODE_DO_BIND: u8 = 0x90;
/// Apply a bind, then advance by a ULEB.
pub const BIND_OPCODE_DO_BIND_ADD_ADDR_ULEB: u8 = 0xA0;
/// Apply a bind, then advance by immediate * pointer size.
pub const BIND_OPCODE_DO_BIND_ADD_ADDR_IMM_SCALED: u8 = 0xB0;
/// Apply count binds, each advancing by skip bytes.
pub const BIND_OPCODE_DO_BIND_ULEB_TIMES_SKIPPING_ULEB: u8 = 0xC0;

/// A pointer dyld will rewrite at load time, joined to its symbol.
#[derive(Debug, Clone)]
pub struct BoundSymbol {
    /// Virtual address of the pointer slot
    pub address: u64,
    /// Imported symbol name
    pub name: Arc<str>,
    /// Library ordinal the bind references (negative = special)
    pub library_ordinal: i64,
}

/// Interprets the bind and lazy-bind streams of a binary.
///
/// Returns a map of bound-pointer virtual address → symbol.
pub fn parse_bind_streams(binary: &MachBinary) -> Result<HashMap<u64, BoundSymbol>> {
    let mut bound = HashMap::new();

    let dyld_info = match binary.dyld_info() {
        Some(d) => *d,
        None => return Ok(bound),
    };

    for (off, size) in [
        (dyld_info.bind_off, dyld_info.bind_size),
        (dyld_info.lazy_bind_off, dyld_info.lazy_bind_size),
    ] {
        if size == 0 {
            continue;
        }
        let stream = binary.read_at(off as u64, size as usize)?;
        interpret_stream(binary, stream, &mut bound);
    }

    Ok(bound)
}

/// Runs one bind stream through the opcode machine, committing a bound
/// symbol at every DO_BIND.
fn interpret_stream(binary: &MachBinary, stream: &[u8], out: &mut HashMap<u64, BoundSymbol>) {
    let segments: Vec<(u64, u64)> = binary.segments().map(|s| (s.vmaddr, s.vmsize)).collect();
    let pointer_size = binary.word_size();

    let mut index = 0usize;
    let mut name: Arc<str> = Arc::from("");
    let mut segment_index = 0usize;
    let mut segment_offset: u64 = 0;
    let mut library_ordinal: i64 = 0;

    let mut commit = |segment_index: usize, segment_offset: u64, name: &Arc<str>, ordinal: i64| {
        let Some(&(seg_base, seg_size)) = segments.get(segment_index) else {
            warn!(segment_index, "bind stream references unknown segment");
            return;
        };
        if segment_offset >= seg_size {
            warn!(
                segment_offset = format_args!("{:#x}", segment_offset),
                "bind stream offset escapes segment"
            );
            return;
        }
        let address = seg_base + segment_offset;
        out.insert(
            address,
            BoundSymbol {
                address,
                name: Arc::clone(name),
                library_ordinal: ordinal,
            },
        );
    };

    while index < stream.len() {
        let byte = stream[index];
        let opcode = byte & BIND_OPCODE_MASK;
        let immediate = byte & BIND_IMMEDIATE_MASK;
        index += 1;

        match opcode {
            BIND_OPCODE_DONE => {}
            BIND_OPCODE_SET_DYLIB_ORDINAL_IMM => {
                library_ordinal = immediate as i64;
            }
            BIND_OPCODE_SET_DYLIB_ORDINAL_ULEB => {
                let Some((value, used)) = util::read_uleb128(&stream[index..]) else {
                    warn!(index, "truncated ULEB in bind stream");
                    return;
                };
                library_ordinal = value as i64;
                index += used;
            }
            BIND_OPCODE_SET_DYLIB_SPECIAL_IMM => {
                library_ordinal = -(immediate as i64);
            }
            BIND_OPCODE_SET_SYMBOL_TRAILING_FLAGS_IMM => {
                let len = util::memchr_null(&stream[index..]);
                name = Arc::from(String::from_utf8_lossy(&stream[index..index + len]).as_ref());
                index += len;
            }
            BIND_OPCODE_SET_TYPE_IMM => {}
            BIND_OPCODE_SET_ADDEND_SLEB => {
                let Some((_, used)) = util::read_sleb128(&stream[index..]) else {
                    warn!(index, "truncated SLEB in bind stream");
                    return;
                };
                index += used;
            }
            BIND_OPCODE_SET_SEGMENT_AND_OFFSET_ULEB => {
                segment_index = immediate as usize;
                let Some((value, used)) = util::read_uleb128(&stream[index..]) else {
                    warn!(index, "truncated ULEB in bind stream");
                    return;
                };
                segment_offset = value;
                index += used;
            }
            BIND_OPCODE_ADD_ADDR_ULEB => {
                let Some((value, used)) = util::read_uleb128(&stream[index..]) else {
                    warn!(index, "truncated ULEB in bind stream");
                    return;
                };
                segment_offset = segment_offset.wrapping_add(value);
                index += used;
            }
            BIND_OPCODE_DO_BIND => {
                commit(segment_index, segment_offset, &name, library_ordinal);
                segment_offset = segment_offset.wrapping_add(pointer_size);
            }
            BIND_OPCODE_DO_BIND_ADD_ADDR_ULEB => {
                commit(segment_index, segment_offset, &name, library_ordinal);
                segment_offset = segment_offset.wrapping_add(pointer_size);
                let Some((value, used)) = util::read_uleb128(&stream[index..]) else {
                    warn!(index, "truncated ULEB in bind stream");
                    return;
                };
                segment_offset = segment_offset.wrapping_add(value);
                index += used;
            }
            BIND_OPCODE_DO_BIND_ADD_ADDR_IMM_SCALED => {
                commit(segment_index, segment_offset, &name, library_ordinal);
                segment_offset = segment_offset
                    .wrapping_add(pointer_size + immediate as u64 * pointer_size);
            }
            BIND_OPCODE_DO_BIND_ULEB_TIMES_SKIPPING_ULEB => {
                let Some((count, used)) = util::read_uleb128(&stream[index..]) else {
                    warn!(index, "truncated ULEB in bind stream");
                    return;
                };
                index += used;
                let Some((skip, used)) = util::read_uleb128(&stream[index..]) else {
                    warn!(index, "truncated ULEB in bind stream");
                    return;
                };
                index += used;
                for _ in 0..count {
                    commit(segment_index, segment_offset, &name, library_ordinal);
                    segment_offset = segment_offset.wrapping_add(pointer_size + skip);
                }
            }
            other => {
                warn!(
                    opcode = format_args!("{:#x}", other),
                    immediate, "unknown dyld bind opcode"
                );
                return;
            }
        }
    }
}
