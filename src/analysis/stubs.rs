//! Stub and imported-symbol resolution.
//!
//! A branch to an external function lands on a short trampoline in a
//! stub section, which jumps through a bound pointer that dyld rewrites
//! at load time. The linker erased the names; they are reconstructed by
//! joining four tables: each stub/pointer section's `reserved1` indexes
//! the indirect symbol table, whose entries index the external symbol
//! table, whose `n_strx` fields index the string table.
//!
//! Binaries that carry LC_DYLD_INFO additionally describe every bound
//! pointer in the bind opcode streams; the two sources are reconciled and
//! must agree. Inconsistencies lose only the affected entry; they are
//! logged and recorded in [`StubResolver::warnings`].

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::macho::binary::MachBinary;
use crate::macho::constants::*;
use crate::macho::dyld_info;

/// One stub trampoline joined to its bound pointer and symbol.
#[derive(Debug, Clone)]
pub struct StubEntry {
    /// Address of the trampoline in the stub section
    pub address: u64,
    /// Address of the bound pointer the trampoline jumps through
    pub target: u64,
    /// Imported symbol name, when the indirect-table join produced one
    pub name: Option<Arc<str>>,
}

/// The resolved stub/import maps for one slice.
#[derive(Debug, Default)]
pub struct StubResolver {
    stubs: Vec<StubEntry>,
    stub_to_name: HashMap<u64, Arc<str>>,
    name_to_pointer: HashMap<Arc<str>, u64>,
    pointer_to_name: HashMap<u64, Arc<str>>,
    warnings: Vec<Error>,
}

impl StubResolver {
    /// Performs the full table join for a slice.
    pub fn resolve(binary: &MachBinary) -> Result<Self> {
        let mut resolver = Self::default();

        let indirect = binary.indirect_symbol_table()?;
        resolver.resolve_pointer_sections(binary, &indirect)?;
        resolver.resolve_stub_sections(binary, &indirect)?;
        resolver.reconcile_bind_streams(binary)?;

        debug!(
            stubs = resolver.stubs.len(),
            imports = resolver.name_to_pointer.len(),
            warnings = resolver.warnings.len(),
            "resolved imported symbols"
        );

        Ok(resolver)
    }

    /// Records a symbol-table inconsistency without aborting the join.
    fn record_inconsistency(&mut self, reason: String) {
        warn!(%reason, "inconsistent symbol table");
        self.warnings
            .push(Error::InconsistentSymbolTable { reason });
    }

    /// Builds bound-pointer maps from every lazy/non-lazy pointer section.
    fn resolve_pointer_sections(&mut self, binary: &MachBinary, indirect: &[u32]) -> Result<()> {
        let sections: Vec<_> = binary
            .sections()
            .filter(|s| {
                matches!(
                    s.section_type(),
                    S_LAZY_SYMBOL_POINTERS | S_NON_LAZY_SYMBOL_POINTERS
                        | S_LAZY_DYLIB_SYMBOL_POINTERS
                )
            })
            .cloned()
            .collect();

        for section in sections {
            let count = section.size / binary.word_size();
            if count > 0x10_0000 {
                self.record_inconsistency(format!(
                    "pointer section {} declares {} entries",
                    section.full_name(),
                    count
                ));
                continue;
            }
            for k in 0..count {
                let pointer_addr = section.addr + k * binary.word_size();
                if let Some(name) =
                    self.name_for_indirect_entry(binary, indirect, section.reserved1 as u64 + k)
                {
                    self.name_to_pointer.insert(Arc::clone(&name), pointer_addr);
                    self.pointer_to_name.insert(pointer_addr, name);
                }
            }
        }

        Ok(())
    }

    /// Enumerates each stub section and joins the k-th stub to the k-th
    /// indirect entry.
    fn resolve_stub_sections(&mut self, binary: &MachBinary, indirect: &[u32]) -> Result<()> {
        let stub_sections: Vec<_> = binary
            .sections()
            .filter(|s| s.section_type() == S_SYMBOL_STUBS)
            .cloned()
            .collect();

        // The k-th stub targets the k-th lazy pointer.
        let lazy_pointers = binary
            .sections()
            .find(|s| s.section_type() == S_LAZY_SYMBOL_POINTERS)
            .cloned();

        for section in stub_sections {
            let stub_size = section.reserved2 as u64;
            if stub_size == 0 {
                self.record_inconsistency(format!(
                    "stub section {} declares zero stub size",
                    section.full_name()
                ));
                continue;
            }

            let count = section.size / stub_size;
            if count > 0x10_0000 {
                self.record_inconsistency(format!(
                    "stub section {} declares {} stubs",
                    section.full_name(),
                    count
                ));
                continue;
            }
            for k in 0..count {
                let stub_addr = section.addr + k * stub_size;
                let target = lazy_pointers
                    .as_ref()
                    .map(|lp| lp.addr + k * binary.word_size())
                    .unwrap_or(0);

                let name =
                    self.name_for_indirect_entry(binary, indirect, section.reserved1 as u64 + k);

                if let Some(ref name) = name {
                    self.stub_to_name.insert(stub_addr, Arc::clone(name));
                }

                self.stubs.push(StubEntry {
                    address: stub_addr,
                    target,
                    name,
                });
            }
        }

        Ok(())
    }

    /// Resolves one indirect-table entry to a symbol name.
    ///
    /// Sentinel entries and out-of-range indexes resolve to `None`; the
    /// latter are recorded but do not abort the remaining entries.
    fn name_for_indirect_entry(
        &mut self,
        binary: &MachBinary,
        indirect: &[u32],
        indirect_index: u64,
    ) -> Option<Arc<str>> {
        let entry = match indirect.get(indirect_index as usize) {
            Some(&e) => e,
            None => {
                self.record_inconsistency(format!(
                    "indirect symbol index {} out of range ({} entries)",
                    indirect_index,
                    indirect.len()
                ));
                return None;
            }
        };

        if entry & (INDIRECT_SYMBOL_LOCAL | INDIRECT_SYMBOL_ABS) != 0 {
            return None;
        }

        let symtab = binary.symbol_table()?;
        let sym = match symtab.symbol(entry as usize) {
            Some(s) => s,
            None => {
                self.record_inconsistency(format!(
                    "indirect entry {} indexes past the symbol table ({} symbols)",
                    entry,
                    symtab.symbols().len()
                ));
                return None;
            }
        };

        symtab.name_of(sym)
    }

    /// Walks the dyld bind streams and reconciles them with the
    /// table-derived maps. Disagreements are recorded; the table wins.
    fn reconcile_bind_streams(&mut self, binary: &MachBinary) -> Result<()> {
        let bound = dyld_info::parse_bind_streams(binary)?;

        for (address, symbol) in bound {
            match self.pointer_to_name.get(&address).cloned() {
                Some(existing) if existing.as_ref() != symbol.name.as_ref() => {
                    self.record_inconsistency(format!(
                        "bound pointer {:#x}: indirect table says {}, bind stream says {}",
                        address, existing, symbol.name
                    ));
                }
                Some(_) => {}
                None => {
                    self.name_to_pointer
                        .insert(Arc::clone(&symbol.name), address);
                    self.pointer_to_name.insert(address, symbol.name);
                }
            }
        }

        Ok(())
    }

    /// Returns every stub entry in section order.
    #[inline]
    pub fn stubs(&self) -> &[StubEntry] {
        &self.stubs
    }

    /// Returns the non-fatal inconsistencies encountered during the join.
    #[inline]
    pub fn warnings(&self) -> &[Error] {
        &self.warnings
    }

    /// Maps a stub (branch destination) address to its symbol name.
    pub fn symbol_name_for_stub(&self, stub_addr: u64) -> Option<&Arc<str>> {
        self.stub_to_name.get(&stub_addr)
    }

    /// Map of stub address → imported symbol name.
    #[inline]
    pub fn stubs_to_symbol_names(&self) -> &HashMap<u64, Arc<str>> {
        &self.stub_to_name
    }

    /// Map of imported symbol name → bound pointer address.
    #[inline]
    pub fn symbol_names_to_pointers(&self) -> &HashMap<Arc<str>, u64> {
        &self.name_to_pointer
    }

    /// Map of bound pointer address → imported symbol name.
    #[inline]
    pub fn pointers_to_symbol_names(&self) -> &HashMap<u64, Arc<str>> {
        &self.pointer_to_name
    }
}
