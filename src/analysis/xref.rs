//! Cross-reference index.
//!
//! `XrefAnalyzer` is the second-phase handle: it is constructed by
//! walking every known function once, so any value of this type proves
//! the XRef pass has run. It records three kinds of references:
//!
//! - direct branches and calls, keyed by destination;
//! - Objective-C message sends, with class and selector recovered by
//!   dataflow where possible;
//! - string-literal loads recognized from the adrp/add address-formation
//!   patterns.
//!
//! A function whose bytes fail to decode is abandoned wholesale; none of
//! its partial results are kept, and the rest of the binary proceeds.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::arm64::Instr;
use crate::error::Result;
use crate::macho::binary::MachBinary;

use super::analyzer::MachAnalyzer;
use super::dataflow::{RegisterContents, RegisterFile};
use super::function::FunctionAnalyzer;
use super::objc::ObjcRuntime;
use super::stubs::StubResolver;

/// Sections whose contents are treated as string literals.
const STRING_SECTIONS: &[&str] = &[
    "__cstring",
    "__objc_methname",
    "__objc_classname",
    "__cfstring",
];

/// An Objective-C message-send call site.
#[derive(Debug, Clone)]
pub struct CallSite {
    /// Address of the call instruction
    pub address: u64,
    /// Entry point of the containing function
    pub function_entry: u64,
    /// Runtime entry point the call resolves to (e.g. `_objc_msgSend`)
    pub target_symbol: Arc<str>,
    /// Receiver class name, when the dataflow recovered one
    pub class_name: Option<String>,
    /// Selector name, when the dataflow recovered one
    pub selector_name: Option<String>,
}

/// A recognized load of a string literal.
#[derive(Debug, Clone)]
pub struct StringXref {
    /// Address of the instruction that begins the address formation
    pub source_address: u64,
    /// Entry point of the containing function
    pub function_entry: u64,
    /// Address of the literal in its string section
    pub literal_address: u64,
    /// Literal contents
    pub literal: String,
}

/// The computed cross-reference index over one slice.
///
/// Obtained from [`MachAnalyzer::compute_xrefs`]; holding one is proof
/// the index exists, so there is no "not yet computed" state to misuse.
pub struct XrefAnalyzer<'a> {
    analyzer: &'a MachAnalyzer<'a>,
    callers: HashMap<u64, Vec<u64>>,
    objc_calls: Vec<CallSite>,
    string_xrefs: Vec<StringXref>,
    analyzed: Vec<u64>,
}

impl<'a> XrefAnalyzer<'a> {
    /// Walks every known function and builds the index.
    ///
    /// Branch destinations discovered during the walk are themselves
    /// analyzed, so the index converges on all code reachable from the
    /// initial entry-point candidates.
    pub fn compute(analyzer: &'a MachAnalyzer<'a>) -> Result<Self> {
        let binary = analyzer.binary();
        let stubs = analyzer.stub_resolver()?;
        let objc = analyzer.objc_runtime()?;

        let mut worklist: VecDeque<u64> = analyzer.functions()?.iter().copied().collect();
        let mut seen: HashSet<u64> = HashSet::new();

        let mut callers: HashMap<u64, Vec<u64>> = HashMap::new();
        let mut objc_calls = Vec::new();
        let mut string_xrefs = Vec::new();
        let mut analyzed = Vec::new();

        while let Some(entry) = worklist.pop_front() {
            if !seen.insert(entry) {
                continue;
            }

            let function = match analyzer.function_analyzer(entry) {
                Ok(f) => f,
                Err(e) => {
                    warn!(
                        entry = format_args!("{:#x}", entry),
                        error = %e,
                        "dropping function from XRef index"
                    );
                    continue;
                }
            };

            let mut scan = FunctionScan::default();
            scan.run(binary, &function, stubs, objc);

            for target in scan.discovered_functions {
                if !seen.contains(&target) {
                    worklist.push_back(target);
                }
            }
            for (target, sites) in scan.callers {
                callers.entry(target).or_default().extend(sites);
            }
            objc_calls.extend(scan.objc_calls);
            string_xrefs.extend(scan.string_xrefs);
            analyzed.push(entry);
        }

        for sites in callers.values_mut() {
            sites.sort_unstable();
            sites.dedup();
        }
        analyzed.sort_unstable();
        string_xrefs.sort_by_key(|x| (x.source_address, x.literal_address));
        string_xrefs.dedup_by_key(|x| (x.source_address, x.literal_address));
        objc_calls.sort_by_key(|c| c.address);

        debug!(
            functions = analyzed.len(),
            call_sites = objc_calls.len(),
            string_xrefs = string_xrefs.len(),
            "computed XRef index"
        );

        Ok(Self {
            analyzer,
            callers,
            objc_calls,
            string_xrefs,
            analyzed,
        })
    }

    /// Returns the underlying analyzer.
    #[inline]
    pub fn analyzer(&self) -> &'a MachAnalyzer<'a> {
        self.analyzer
    }

    /// Entry points of every function the index covers.
    #[inline]
    pub fn analyzed_functions(&self) -> &[u64] {
        &self.analyzed
    }

    /// Returns the call-site addresses that branch to `destination`.
    pub fn xrefs_to(&self, destination: u64) -> &[u64] {
        self.callers
            .get(&destination)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns every recognized Objective-C call site.
    #[inline]
    pub fn objc_calls(&self) -> &[CallSite] {
        &self.objc_calls
    }

    /// Returns Objective-C call sites matching the given class and/or
    /// selector names.
    ///
    /// With `requires_both_found`, a site must match one of
    /// `class_names` *and* one of `selector_names`; otherwise either
    /// match suffices.
    pub fn objc_calls_to(
        &self,
        class_names: &[&str],
        selector_names: &[&str],
        requires_both_found: bool,
    ) -> Vec<&CallSite> {
        self.objc_calls
            .iter()
            .filter(|site| {
                let class_match = site
                    .class_name
                    .as_deref()
                    .map(|c| class_names.contains(&c))
                    .unwrap_or(false);
                let sel_match = site
                    .selector_name
                    .as_deref()
                    .map(|s| selector_names.contains(&s))
                    .unwrap_or(false);
                if requires_both_found {
                    class_match && sel_match
                } else {
                    class_match || sel_match
                }
            })
            .collect()
    }

    /// Returns (load-site address, literal address) pairs for every load
    /// of the given literal.
    pub fn string_xrefs_to(&self, literal: &str) -> Vec<(u64, u64)> {
        self.string_xrefs
            .iter()
            .filter(|x| x.literal == literal)
            .map(|x| (x.source_address, x.literal_address))
            .collect()
    }

    /// Returns the string literals loaded by the function at `entry`.
    pub fn strings_in_func(&self, entry: u64) -> Vec<(u64, &str)> {
        self.string_xrefs
            .iter()
            .filter(|x| x.function_entry == entry)
            .map(|x| (x.literal_address, x.literal.as_str()))
            .collect()
    }

    /// Returns every C-string literal in the binary's string sections,
    /// with its address.
    pub fn get_cstrings(&self) -> Vec<(u64, String)> {
        let binary = self.analyzer.binary();
        let mut strings = Vec::new();

        for section in binary.sections() {
            if section.name != "__cstring" && section.name != "__objc_methname" {
                continue;
            }
            let data = match binary.read_at(section.offset as u64, section.size as usize) {
                Ok(d) => d,
                Err(_) => continue,
            };

            let mut start = 0usize;
            while start < data.len() {
                let len = crate::util::memchr_null(&data[start..]);
                if len > 0 {
                    let literal = String::from_utf8_lossy(&data[start..start + len]).into_owned();
                    strings.push((section.addr + start as u64, literal));
                }
                start += len + 1;
            }
        }

        strings
    }
}

// =============================================================================
// Per-Function Scan
// =============================================================================

/// Results collected from one function; committed only if the whole
/// function scanned cleanly.
#[derive(Default)]
struct FunctionScan {
    callers: HashMap<u64, Vec<u64>>,
    objc_calls: Vec<CallSite>,
    string_xrefs: Vec<StringXref>,
    discovered_functions: Vec<u64>,
}

impl FunctionScan {
    fn run(
        &mut self,
        binary: &MachBinary,
        function: &FunctionAnalyzer<'_>,
        stubs: &StubResolver,
        objc: &ObjcRuntime,
    ) {
        let entry = function.entry();

        for &(block_start, block_end) in function.basic_blocks() {
            let mut file = if block_start == entry {
                RegisterFile::function_entry()
            } else {
                RegisterFile::unknown()
            };
            // Where each register's current address value was first
            // formed; string XRefs report the adrp, not the add.
            let mut origins = [None::<u64>; 32];

            for &(addr, ref instr) in function.instructions() {
                if addr < block_start || addr >= block_end {
                    continue;
                }

                self.record_branches(binary, function, stubs, addr, instr);
                self.record_objc_call(function, stubs, objc, &file, addr, instr);

                file.apply(instr);
                track_origins(&mut origins, addr, instr);
                self.record_string_load(binary, entry, &file, &origins, addr, instr);
            }
        }
    }

    fn record_branches(
        &mut self,
        binary: &MachBinary,
        function: &FunctionAnalyzer<'_>,
        stubs: &StubResolver,
        addr: u64,
        instr: &Instr,
    ) {
        let Some(target) = instr.branch_target() else {
            return;
        };

        self.callers.entry(target).or_default().push(addr);

        // A called address that is not a stub is a function entry we may
        // not have seen yet.
        if let Instr::Bl { .. } = instr {
            let is_stub = stubs.symbol_name_for_stub(target).is_some();
            let executable = binary
                .section_for_address(target)
                .map(|s| s.is_executable())
                .unwrap_or(false);
            if !is_stub && executable && (target < function.entry() || target >= function.end()) {
                self.discovered_functions.push(target);
            }
        }
    }

    fn record_objc_call(
        &mut self,
        function: &FunctionAnalyzer<'_>,
        stubs: &StubResolver,
        objc: &ObjcRuntime,
        file: &RegisterFile,
        addr: u64,
        instr: &Instr,
    ) {
        // Resolve the call target to an imported runtime symbol.
        let symbol = match instr {
            Instr::Bl { target } => stubs.symbol_name_for_stub(*target).cloned(),
            Instr::Blr { rn } => match file.get(*rn) {
                RegisterContents::MemoryAddress(pointer) => {
                    stubs.pointers_to_symbol_names().get(&pointer).cloned()
                }
                _ => None,
            },
            _ => None,
        };
        let Some(symbol) = symbol else { return };
        let Some(fast_path_selector) = msgsend_selector(&symbol) else {
            return;
        };

        // The receiver class comes from x0, the selector from x1.
        let class_name = resolve_receiver_class(function, stubs, objc, file.get(0));
        let selector_name = fast_path_selector.or_else(|| match file.get(1) {
            RegisterContents::MemoryAddress(selref) => objc
                .selector_for_selref(selref)
                .map(|s| s.name.as_ref().to_owned()),
            _ => None,
        });

        self.objc_calls.push(CallSite {
            address: addr,
            function_entry: function.entry(),
            target_symbol: symbol,
            class_name,
            selector_name,
        });
    }

    fn record_string_load(
        &mut self,
        binary: &MachBinary,
        function_entry: u64,
        file: &RegisterFile,
        origins: &[Option<u64>; 32],
        addr: u64,
        instr: &Instr,
    ) {
        // Only the address-formation patterns count; values reached
        // through further indirection are out of scope.
        let dest = match *instr {
            Instr::AddImm { rd, .. } => rd,
            Instr::Adr { rd, .. } => rd,
            Instr::LdrImm { rt, .. } | Instr::LdrLit { rt, .. } => rt,
            _ => return,
        };

        let RegisterContents::MemoryAddress(literal_addr) = file.get(dest) else {
            return;
        };

        let Some(section) = binary.section_for_address(literal_addr) else {
            return;
        };
        if !STRING_SECTIONS.contains(&section.name.as_str()) {
            return;
        }

        let Ok(literal) = binary.read_string_at_address(literal_addr) else {
            return;
        };
        if literal.is_empty() {
            return;
        }

        self.string_xrefs.push(StringXref {
            source_address: origins[dest as usize & 0x1F].unwrap_or(addr),
            function_entry,
            literal_address: literal_addr,
            literal,
        });
    }
}

/// Tracks where each register's current address value was first formed,
/// so a string XRef can report the adrp that began the sequence rather
/// than the add that finished it.
fn track_origins(origins: &mut [Option<u64>; 32], addr: u64, instr: &Instr) {
    match *instr {
        Instr::Adrp { rd, .. } | Instr::Adr { rd, .. } => {
            origins[rd as usize & 0x1F] = Some(addr);
        }
        Instr::AddImm { rd, rn, .. } | Instr::SubImm { rd, rn, .. } => {
            origins[rd as usize & 0x1F] = origins[rn as usize & 0x1F].or(Some(addr));
        }
        Instr::LdrImm { rt, rn, .. } => {
            origins[rt as usize & 0x1F] = origins[rn as usize & 0x1F].or(Some(addr));
        }
        Instr::LdrLit { rt, .. } => {
            origins[rt as usize & 0x1F] = Some(addr);
        }
        Instr::MovReg { rd, rm } => {
            origins[rd as usize & 0x1F] = origins[rm as usize & 0x1F];
        }
        Instr::Movz { rd, .. } | Instr::Movk { rd, .. } | Instr::Movn { rd, .. } => {
            origins[rd as usize & 0x1F] = Some(addr);
        }
        _ => {}
    }
}

// =============================================================================
// Objective-C Call Recognition
// =============================================================================

/// Classifies an imported symbol as an Objective-C dispatch entry point.
///
/// Returns `None` when the symbol is not a message send; `Some(None)` for
/// the generic entry points whose selector is loaded through a selref;
/// and `Some(Some(sel))` for the fast paths that encode their selector in
/// the symbol name.
fn msgsend_selector(symbol: &str) -> Option<Option<String>> {
    match symbol {
        "_objc_msgSend" | "_objc_msgSendSuper2" => Some(None),
        "_objc_alloc" => Some(Some("alloc".to_owned())),
        "_objc_alloc_init" => Some(Some("init".to_owned())),
        _ => {
            let suffix = symbol.strip_prefix("_objc_opt_")?;
            // Fast paths for selectors that take an argument keep the
            // trailing colon.
            let takes_argument = matches!(
                suffix,
                "isKindOfClass" | "respondsToSelector" | "conformsToProtocol"
            );
            let selector = if takes_argument {
                format!("{}:", suffix)
            } else {
                suffix.to_owned()
            };
            Some(Some(selector))
        }
    }
}

/// Recovers the receiver class from the contents of x0 at a call site.
fn resolve_receiver_class(
    function: &FunctionAnalyzer<'_>,
    stubs: &StubResolver,
    objc: &ObjcRuntime,
    x0: RegisterContents,
) -> Option<String> {
    match x0 {
        // The receiver is still argument 0: the method's own class.
        RegisterContents::FunctionArgument(0) => objc
            .method_at_imp(function.entry())
            .map(|(class, _)| class.clone()),

        RegisterContents::MemoryAddress(addr) => {
            // A classref slot, either pointing at a local class or
            // rewritten by dyld for an external one.
            if let Some(class_ptr) = objc.class_pointer_for_classref(addr) {
                if class_ptr != 0 {
                    if let Some(name) = objc.class_name_for_class_pointer(class_ptr) {
                        return Some(name.to_owned());
                    }
                }
                return stubs
                    .pointers_to_symbol_names()
                    .get(&addr)
                    .and_then(|sym| external_class_name(sym));
            }

            // A class object address directly.
            if let Some(name) = objc.class_name_for_class_pointer(addr) {
                return Some(name.to_owned());
            }

            // A dyld-bound class pointer outside the classrefs section.
            stubs
                .pointers_to_symbol_names()
                .get(&addr)
                .and_then(|sym| external_class_name(sym))
        }

        _ => None,
    }
}

fn external_class_name(symbol: &str) -> Option<String> {
    symbol.strip_prefix("_OBJC_CLASS_$_").map(str::to_owned)
}
