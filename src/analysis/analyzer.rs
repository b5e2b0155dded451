//! Per-slice analysis entry point.
//!
//! `MachAnalyzer` is a lazily populated derived view over one parsed
//! slice: the stub/import maps, the Objective-C runtime model, and
//! per-function decodings are each computed on first use and cached.
//! The caches use single-writer interior mutability; one analyzer belongs
//! to one thread at a time.

use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::error::Result;
use crate::macho::binary::MachBinary;

use super::function::{analyze_function, FunctionAnalyzer, FunctionInfo};
use super::objc::{ObjcClass, ObjcRuntime, ObjcSelector};
use super::stubs::StubResolver;
use super::xref::XrefAnalyzer;

/// Cached analysis view over one Mach-O slice.
///
/// Cross-reference queries live on [`XrefAnalyzer`], which is obtained
/// through [`MachAnalyzer::compute_xrefs`]; the split makes it impossible
/// to consult the XRef index before it has been built.
pub struct MachAnalyzer<'a> {
    binary: &'a MachBinary,
    stubs: OnceCell<StubResolver>,
    objc: OnceCell<ObjcRuntime>,
    exported: OnceCell<HashMap<Arc<str>, u64>>,
    entry_points: OnceCell<Vec<u64>>,
    functions: RefCell<HashMap<u64, Rc<FunctionInfo>>>,
}

impl<'a> MachAnalyzer<'a> {
    /// Creates an analyzer for a parsed slice.
    pub fn for_slice(binary: &'a MachBinary) -> Self {
        Self {
            binary,
            stubs: OnceCell::new(),
            objc: OnceCell::new(),
            exported: OnceCell::new(),
            entry_points: OnceCell::new(),
            functions: RefCell::new(HashMap::new()),
        }
    }

    /// Returns the slice under analysis.
    #[inline]
    pub fn binary(&self) -> &'a MachBinary {
        self.binary
    }

    // =========================================================================
    // Symbol Resolution
    // =========================================================================

    /// Returns the stub/import resolver, computing it on first use.
    pub fn stub_resolver(&self) -> Result<&StubResolver> {
        if let Some(resolver) = self.stubs.get() {
            return Ok(resolver);
        }
        let resolver = StubResolver::resolve(self.binary)?;
        Ok(self.stubs.get_or_init(|| resolver))
    }

    /// Map of imported symbol name → bound pointer address.
    pub fn imported_symbol_names_to_pointers(&self) -> Result<&HashMap<Arc<str>, u64>> {
        Ok(self.stub_resolver()?.symbol_names_to_pointers())
    }

    /// Map of stub (branch destination) address → imported symbol name.
    pub fn imported_symbols_to_symbol_names(&self) -> Result<&HashMap<u64, Arc<str>>> {
        Ok(self.stub_resolver()?.stubs_to_symbol_names())
    }

    /// Map of bound pointer address → imported symbol name.
    pub fn bound_pointers_to_symbol_names(&self) -> Result<&HashMap<u64, Arc<str>>> {
        Ok(self.stub_resolver()?.pointers_to_symbol_names())
    }

    /// Resolves a branch destination to an imported symbol name, when the
    /// destination is a stub.
    pub fn symbol_name_for_branch_destination(&self, addr: u64) -> Result<Option<Arc<str>>> {
        Ok(self
            .stub_resolver()?
            .symbol_name_for_stub(addr)
            .map(Arc::clone))
    }

    /// Map of exported symbol name → definition address.
    pub fn exported_symbol_names_to_pointers(&self) -> &HashMap<Arc<str>, u64> {
        self.exported.get_or_init(|| {
            self.binary
                .symbol_table()
                .map(|table| {
                    table
                        .exported_with_addresses()
                        .iter()
                        .map(|(name, addr)| (Arc::clone(name), *addr))
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    // =========================================================================
    // Objective-C Runtime
    // =========================================================================

    /// Returns the Objective-C runtime model, computing it on first use.
    pub fn objc_runtime(&self) -> Result<&ObjcRuntime> {
        if let Some(runtime) = self.objc.get() {
            return Ok(runtime);
        }
        let bound = self.stub_resolver()?.pointers_to_symbol_names();
        let runtime = ObjcRuntime::parse(self.binary, bound)?;
        Ok(self.objc.get_or_init(|| runtime))
    }

    /// Returns every Objective-C class and category in the binary.
    pub fn objc_classes(&self) -> Result<&[ObjcClass]> {
        Ok(self.objc_runtime()?.classes())
    }

    /// Returns the `__objc_classrefs` entry for a class name.
    pub fn classref_for_class_name(&self, name: &str) -> Result<Option<u64>> {
        Ok(self.objc_runtime()?.classref_for_class_name(name))
    }

    /// Resolves a class object address to its name.
    pub fn class_name_for_class_pointer(&self, addr: u64) -> Result<Option<String>> {
        Ok(self
            .objc_runtime()?
            .class_name_for_class_pointer(addr)
            .map(str::to_owned))
    }

    /// Resolves a selref slot address to its selector.
    pub fn selector_for_selref(&self, selref_addr: u64) -> Result<Option<ObjcSelector>> {
        Ok(self.objc_runtime()?.selector_for_selref(selref_addr).cloned())
    }

    /// Returns the selref slot referencing a selector name.
    pub fn selref_for_selector_name(&self, name: &str) -> Result<Option<u64>> {
        Ok(self.objc_runtime()?.selref_for_selector_name(name))
    }

    /// Returns the implementation addresses of every method with the
    /// given selector name.
    pub fn get_imps_for_sel(&self, selector_name: &str) -> Result<Vec<u64>> {
        Ok(self.objc_runtime()?.method_imp_addresses(selector_name))
    }

    // =========================================================================
    // Functions
    // =========================================================================

    /// Returns the function entry-point candidates known before XRef
    /// analysis: Objective-C method implementations and exported symbols
    /// that land in executable sections.
    pub fn functions(&self) -> Result<&[u64]> {
        if let Some(entries) = self.entry_points.get() {
            return Ok(entries);
        }

        let mut entries: Vec<u64> = Vec::new();

        for class in self.objc_classes()? {
            entries.extend(class.selectors.iter().filter_map(|s| s.implementation));
        }

        for (_, &addr) in self.exported_symbol_names_to_pointers() {
            let executable = self
                .binary
                .section_for_address(addr)
                .map(|s| s.is_executable())
                .unwrap_or(false);
            if executable {
                entries.push(addr);
            }
        }

        entries.sort_unstable();
        entries.dedup();

        Ok(self.entry_points.get_or_init(|| entries))
    }

    /// Returns an analyzer for the function starting at `addr`, decoding
    /// and caching it on first use.
    pub fn function_analyzer(&self, addr: u64) -> Result<FunctionAnalyzer<'_>> {
        if let Some(info) = self.functions.borrow().get(&addr) {
            return Ok(FunctionAnalyzer::new(self.binary, Rc::clone(info)));
        }

        let info = Rc::new(analyze_function(self.binary, addr)?);
        self.functions
            .borrow_mut()
            .insert(addr, Rc::clone(&info));
        Ok(FunctionAnalyzer::new(self.binary, info))
    }

    // =========================================================================
    // Cross References
    // =========================================================================

    /// Runs the cross-reference pass over every known function and
    /// returns the richer query handle.
    pub fn compute_xrefs(&'a self) -> Result<XrefAnalyzer<'a>> {
        XrefAnalyzer::compute(self)
    }
}
