//! Symbol table and string table access.
//!
//! The Mach-O string table is a packed array of NUL-terminated strings
//! referenced by start index from nlist entries. If it were scanned on
//! demand, every name lookup would be an O(n) search, so the table is
//! preprocessed once into a start-index → interned-string map. Symbol and
//! selector names recur constantly downstream; interning them as `Arc<str>`
//! makes clones and hash-map keys cheap.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use zerocopy::FromBytes;

use super::binary::MachBinary;
use super::constants::*;
use super::structs::{ByteSwap, Nlist32, Nlist64};
use crate::error::{Error, Result};
use crate::util;

/// A symbol table entry widened to 64-bit, independent of slice width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nlist {
    /// Index into the string table
    pub n_strx: u32,
    /// Type flag
    pub n_type: u8,
    /// Section number or NO_SECT
    pub n_sect: u8,
    /// Flags; holds the library ordinal for two-level imports
    pub n_desc: u16,
    /// Symbol value (an address for defined symbols)
    pub n_value: u64,
}

impl Nlist {
    /// Returns true if this is an external symbol.
    #[inline]
    pub fn is_external(&self) -> bool {
        (self.n_type & N_EXT) != 0
    }

    /// Returns true if this is an undefined symbol.
    #[inline]
    pub fn is_undefined(&self) -> bool {
        (self.n_type & N_TYPE) == N_UNDF
    }

    /// Returns true if this symbol is defined in a section.
    #[inline]
    pub fn is_defined(&self) -> bool {
        (self.n_type & N_TYPE) == N_SECT
    }

    /// Returns true if this is a symbolic debugging entry.
    #[inline]
    pub fn is_debug(&self) -> bool {
        (self.n_type & N_STAB) != 0
    }

    /// Returns the two-level namespace library ordinal from n_desc.
    #[inline]
    pub fn library_ordinal(&self) -> u32 {
        ((self.n_desc >> 8) & 0xFF) as u32
    }
}

/// Decoded symbol table plus preprocessed string table.
#[derive(Debug)]
pub struct SymbolTable {
    nlists: Vec<Nlist>,
    strtab: Vec<u8>,
    /// Interned names keyed by string-table start index.
    names: HashMap<u32, Arc<str>>,
    imported: Vec<Arc<str>>,
    exported: Vec<(Arc<str>, u64)>,
}

impl SymbolTable {
    /// Parses the symbol and string tables located by LC_SYMTAB.
    ///
    /// Returns `Ok(None)` when the binary carries no symtab command.
    pub fn parse(binary: &MachBinary) -> Result<Option<Self>> {
        let symtab = match binary.symtab() {
            Some(s) => *s,
            None => return Ok(None),
        };

        // Decode every nlist record in the slice's width. The table read
        // is bounds-checked before anything is allocated.
        let mut nlists = Vec::new();
        if binary.is_64 {
            let data = binary.read_at(
                symtab.symoff as u64,
                symtab.nsyms as usize * Nlist64::SIZE,
            )?;
            nlists.reserve(symtab.nsyms as usize);
            for chunk in data.chunks_exact(Nlist64::SIZE) {
                let mut raw = Nlist64::read_from_bytes(chunk)
                    .map_err(|_| Error::parse(symtab.symoff as usize, "bad nlist record"))?;
                if binary.is_swap {
                    raw = raw.byte_swapped();
                }
                nlists.push(Nlist {
                    n_strx: raw.n_strx,
                    n_type: raw.n_type,
                    n_sect: raw.n_sect,
                    n_desc: raw.n_desc,
                    n_value: raw.n_value,
                });
            }
        } else {
            let data = binary.read_at(
                symtab.symoff as u64,
                symtab.nsyms as usize * Nlist32::SIZE,
            )?;
            nlists.reserve(symtab.nsyms as usize);
            for chunk in data.chunks_exact(Nlist32::SIZE) {
                let mut raw = Nlist32::read_from_bytes(chunk)
                    .map_err(|_| Error::parse(symtab.symoff as usize, "bad nlist record"))?;
                if binary.is_swap {
                    raw = raw.byte_swapped();
                }
                nlists.push(Nlist {
                    n_strx: raw.n_strx,
                    n_type: raw.n_type,
                    n_sect: raw.n_sect,
                    n_desc: raw.n_desc,
                    n_value: raw.n_value as u64,
                });
            }
        }

        let strtab = binary
            .read_at(symtab.stroff as u64, symtab.strsize as usize)?
            .to_vec();

        // Preprocess the packed table into interned entries keyed by start
        // index.
        let mut names: HashMap<u32, Arc<str>> = HashMap::new();
        let mut start = 0usize;
        while start < strtab.len() {
            let len = util::memchr_null(&strtab[start..]);
            if len > 0 {
                let s = String::from_utf8_lossy(&strtab[start..start + len]);
                names.insert(start as u32, Arc::from(s.as_ref()));
            }
            start += len + 1;
        }

        // Classify external symbols into imported and exported lists.
        let mut imported = Vec::new();
        let mut exported = Vec::new();
        for sym in &nlists {
            if sym.is_debug() {
                continue;
            }
            let name = match names.get(&sym.n_strx) {
                Some(n) => Arc::clone(n),
                None => continue,
            };
            if sym.is_undefined() && sym.is_external() {
                imported.push(name);
            } else if sym.is_defined() && sym.is_external() {
                exported.push((name, sym.n_value));
            }
        }

        debug!(
            symbols = nlists.len(),
            imported = imported.len(),
            exported = exported.len(),
            "parsed symbol table"
        );

        Ok(Some(Self {
            nlists,
            strtab,
            names,
            imported,
            exported,
        }))
    }

    /// Returns every nlist record.
    #[inline]
    pub fn symbols(&self) -> &[Nlist] {
        &self.nlists
    }

    /// Returns the nlist record at `index`.
    #[inline]
    pub fn symbol(&self, index: usize) -> Option<&Nlist> {
        self.nlists.get(index)
    }

    /// Resolves a string-table start index to its interned name.
    ///
    /// Falls back to a direct scan for indexes that point into the middle
    /// of an entry (shared-suffix references).
    pub fn name_at(&self, strx: u32) -> Option<Arc<str>> {
        if let Some(name) = self.names.get(&strx) {
            return Some(Arc::clone(name));
        }
        let start = strx as usize;
        if start >= self.strtab.len() {
            return None;
        }
        let len = util::memchr_null(&self.strtab[start..]);
        if len == 0 {
            return None;
        }
        let s = String::from_utf8_lossy(&self.strtab[start..start + len]);
        Some(Arc::from(s.as_ref()))
    }

    /// Returns the name of a symbol.
    pub fn name_of(&self, sym: &Nlist) -> Option<Arc<str>> {
        self.name_at(sym.n_strx)
    }

    /// Returns imported (undefined external) symbol names.
    pub fn imported_symbols(&self) -> Vec<&str> {
        self.imported.iter().map(|s| s.as_ref()).collect()
    }

    /// Returns exported (defined external) symbol names.
    pub fn exported_symbols(&self) -> Vec<&str> {
        self.exported.iter().map(|(s, _)| s.as_ref()).collect()
    }

    /// Returns exported symbols with the addresses they are defined at.
    pub fn exported_with_addresses(&self) -> &[(Arc<str>, u64)] {
        &self.exported
    }

    /// Returns undefined symbols with their library ordinals, for joining
    /// against the linked-dylib list.
    pub fn undefined_with_ordinals(&self) -> Vec<(Arc<str>, u32)> {
        self.nlists
            .iter()
            .filter(|s| !s.is_debug() && s.is_undefined() && s.is_external())
            .filter_map(|s| Some((self.name_at(s.n_strx)?, s.library_ordinal())))
            .collect()
    }
}
