//! Objective-C runtime metadata parsing.
//!
//! Walks `__objc_classlist`, `__objc_catlist`, `__objc_protolist`,
//! `__objc_selrefs`, `__objc_classrefs`, and `__objc_superrefs` to build a
//! model of every class, category, and protocol the binary implements.
//!
//! Method lists come in two layouts. Classic lists hold three pointers per
//! method. Binaries built for modern deployment targets emit *relative*
//! lists: three 32-bit offsets, each relative to its own field address,
//! with the name field pointing at a selref rather than the selector
//! literal. The list header's entsize flag bit selects the layout; when it
//! disagrees with the deployment target the flag wins and a warning is
//! recorded. Absolute addresses are stored uniformly after parsing, so
//! downstream code never sees the difference.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};
use zerocopy::FromBytes;

use crate::error::{Error, Result};
use crate::macho::binary::MachBinary;
use crate::macho::constants::*;
use crate::macho::structs::*;

/// Strips the runtime symbol prefix from a class symbol name.
///
/// `_OBJC_CLASS_$_NSURLSession` → `NSURLSession`.
fn class_name_from_symbol(symbol: &str) -> Option<&str> {
    symbol
        .strip_prefix("_OBJC_CLASS_$_")
        .or_else(|| symbol.strip_prefix("_OBJC_METACLASS_$_"))
}

/// A selector implemented or referenced by the binary.
#[derive(Debug, Clone)]
pub struct ObjcSelector {
    /// Selector name
    pub name: Arc<str>,
    /// Address of the selref slot referencing this selector, if any
    pub selref: Option<u64>,
    /// Implementation address; `None` for selectors of external classes
    pub implementation: Option<u64>,
    /// Method type encoding
    pub type_encoding: Option<String>,
}

impl ObjcSelector {
    /// Returns true when no implementation exists in this binary.
    #[inline]
    pub fn is_external_definition(&self) -> bool {
        self.implementation.is_none()
    }
}

/// An instance variable declared by a class.
#[derive(Debug, Clone)]
pub struct ObjcIvar {
    /// Ivar name
    pub name: String,
    /// Type encoding
    pub type_encoding: String,
    /// Byte offset of the ivar within an instance, when resolvable
    pub offset: Option<u32>,
    /// Declared size in bytes
    pub size: u32,
}

/// What kind of runtime structure an [`ObjcClass`] models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)] // Variants are self-documenting via names
pub enum ObjcClassKind {
    Class,
    Category,
    Protocol,
}

/// A class, category, or protocol implemented by the binary.
#[derive(Debug, Clone)]
pub struct ObjcClass {
    /// Address of the runtime structure
    pub address: u64,
    /// Name
    pub name: String,
    /// Superclass name; set for classes whose superclass is resolvable
    pub superclass_name: Option<String>,
    /// Base class name; set for categories
    pub base_class_name: Option<String>,
    /// What this entry models
    pub kind: ObjcClassKind,
    /// Selectors, instance methods first, then class methods
    pub selectors: Vec<ObjcSelector>,
    /// Declared instance variables
    pub ivars: Vec<ObjcIvar>,
    /// Names of protocols the class conforms to
    pub protocols: Vec<String>,
}

/// Parsed Objective-C runtime model for one slice.
#[derive(Debug, Default)]
pub struct ObjcRuntime {
    classes: Vec<ObjcClass>,
    protocols: Vec<ObjcClass>,
    selref_to_selector: HashMap<u64, ObjcSelector>,
    literal_to_selref: HashMap<u64, u64>,
    selref_by_name: HashMap<Arc<str>, u64>,
    classrefs: HashMap<u64, u64>,
    classref_by_name: HashMap<String, u64>,
    class_name_by_pointer: HashMap<u64, String>,
    superrefs: HashMap<u64, u64>,
    method_at_imp: HashMap<u64, (String, Arc<str>)>,
    expect_relative_methods: bool,
    warnings: Vec<Error>,
}

impl ObjcRuntime {
    /// Parses the runtime sections of a slice.
    ///
    /// `bound_pointers` maps dyld-bound slot addresses to imported symbol
    /// names; it names superclasses, category base classes, and classrefs
    /// that live outside this binary.
    pub fn parse(binary: &MachBinary, bound_pointers: &HashMap<u64, Arc<str>>) -> Result<Self> {
        let mut runtime = Self {
            expect_relative_methods: relative_methods_expected(binary),
            ..Self::default()
        };

        runtime.parse_selrefs(binary)?;
        runtime.parse_classes(binary, bound_pointers)?;
        runtime.parse_categories(binary, bound_pointers)?;
        runtime.parse_protocols(binary)?;
        runtime.parse_classrefs(binary, bound_pointers)?;
        runtime.parse_superrefs(binary)?;

        debug!(
            classes = runtime.classes.len(),
            protocols = runtime.protocols.len(),
            selrefs = runtime.selref_to_selector.len(),
            warnings = runtime.warnings.len(),
            "parsed ObjC runtime metadata"
        );

        Ok(runtime)
    }

    // =========================================================================
    // Section Walks
    // =========================================================================

    fn parse_selrefs(&mut self, binary: &MachBinary) -> Result<()> {
        let (slots, literals) = binary.read_pointer_section("__objc_selrefs")?;

        for (&slot, &literal) in slots.iter().zip(literals.iter()) {
            let name: Arc<str> = match binary.string_at_addr(literal) {
                Ok(s) => Arc::from(s.as_str()),
                Err(e) => {
                    warn!(slot = format_args!("{:#x}", slot), error = %e, "unreadable selref");
                    continue;
                }
            };

            self.literal_to_selref.insert(literal, slot);
            self.selref_by_name
                .entry(Arc::clone(&name))
                .or_insert(slot);
            self.selref_to_selector.insert(
                slot,
                ObjcSelector {
                    name,
                    selref: Some(slot),
                    implementation: None,
                    type_encoding: None,
                },
            );
        }

        Ok(())
    }

    fn parse_classes(
        &mut self,
        binary: &MachBinary,
        bound_pointers: &HashMap<u64, Arc<str>>,
    ) -> Result<()> {
        let (_, class_pointers) = binary.read_pointer_section("__objc_classlist")?;

        // First pass: register every class address so superclass pointers
        // can be named even when classes reference each other.
        let mut raw_classes = Vec::with_capacity(class_pointers.len());
        for &class_addr in &class_pointers {
            match self.read_class_header(binary, class_addr) {
                Ok((raw, data, name)) => {
                    self.class_name_by_pointer.insert(class_addr, name.clone());
                    raw_classes.push((class_addr, raw, data, name));
                }
                Err(e) if e.is_recoverable() => {
                    warn!(addr = format_args!("{:#x}", class_addr), error = %e, "skipping class");
                    self.warnings.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        for (class_addr, raw, data, name) in raw_classes {
            let mut selectors = Vec::new();
            if data.base_methods != 0 {
                match self.read_method_list(binary, data.base_methods & OBJC_PTR_MASK) {
                    Ok(methods) => selectors.extend(methods),
                    Err(e) if e.is_recoverable() => {
                        warn!(class = %name, error = %e, "skipping instance method list");
                        self.warnings.push(e);
                    }
                    Err(e) => return Err(e),
                }
            }

            // Class methods hang off the metaclass reached through isa.
            let metaclass_addr = raw.isa & OBJC_PTR_MASK;
            if metaclass_addr != 0 && binary.contains_addr(metaclass_addr) {
                if let Ok((_, meta_data, _)) = self.read_class_header(binary, metaclass_addr) {
                    if meta_data.base_methods != 0 {
                        match self.read_method_list(binary, meta_data.base_methods & OBJC_PTR_MASK)
                        {
                            Ok(methods) => selectors.extend(methods),
                            Err(e) if e.is_recoverable() => {
                                warn!(class = %name, error = %e, "skipping class method list");
                                self.warnings.push(e);
                            }
                            Err(e) => return Err(e),
                        }
                    }
                }
            }

            let ivars = if data.ivars != 0 {
                match self.read_ivar_list(binary, data.ivars & OBJC_PTR_MASK) {
                    Ok(list) => list,
                    Err(e) => {
                        warn!(class = %name, error = %e, "skipping ivar list");
                        self.warnings.push(e);
                        Vec::new()
                    }
                }
            } else {
                Vec::new()
            };

            let protocols = if data.base_protocols != 0 {
                self.read_protocol_name_list(binary, data.base_protocols & OBJC_PTR_MASK)
                    .unwrap_or_default()
            } else {
                Vec::new()
            };

            // A zero superclass pointer means dyld binds the slot; the
            // slot address is the class address plus the field offset.
            let superclass_name = if raw.superclass != 0 {
                self.class_name_by_pointer
                    .get(&(raw.superclass & OBJC_PTR_MASK))
                    .cloned()
            } else {
                bound_pointers
                    .get(&(class_addr + 8))
                    .and_then(|sym| class_name_from_symbol(sym))
                    .map(str::to_owned)
            };

            for sel in &selectors {
                if let Some(imp) = sel.implementation {
                    self.method_at_imp
                        .insert(imp, (name.clone(), Arc::clone(&sel.name)));
                }
            }

            self.classes.push(ObjcClass {
                address: class_addr,
                name,
                superclass_name,
                base_class_name: None,
                kind: ObjcClassKind::Class,
                selectors,
                ivars,
                protocols,
            });
        }

        Ok(())
    }

    fn parse_categories(
        &mut self,
        binary: &MachBinary,
        bound_pointers: &HashMap<u64, Arc<str>>,
    ) -> Result<()> {
        let (_, category_pointers) = binary.read_pointer_section("__objc_catlist")?;

        for &cat_addr in &category_pointers {
            let raw = match self.read_struct::<ObjcCategoryRaw64>(binary, cat_addr) {
                Ok(r) => r,
                Err(e) => {
                    warn!(addr = format_args!("{:#x}", cat_addr), error = %e, "skipping category");
                    continue;
                }
            };

            let name = match binary.string_at_addr(raw.name & OBJC_PTR_MASK) {
                Ok(n) => n,
                Err(e) => {
                    warn!(addr = format_args!("{:#x}", cat_addr), error = %e, "unnamed category");
                    continue;
                }
            };

            // The base class is either a class in this binary or a
            // dyld-bound external at the cls field's slot.
            let base_class_name = if raw.cls != 0 {
                self.class_name_by_pointer
                    .get(&(raw.cls & OBJC_PTR_MASK))
                    .cloned()
            } else {
                bound_pointers
                    .get(&(cat_addr + 8))
                    .and_then(|sym| class_name_from_symbol(sym))
                    .map(str::to_owned)
            };

            let mut selectors = Vec::new();
            for methods_ptr in [raw.instance_methods, raw.class_methods] {
                if methods_ptr == 0 {
                    continue;
                }
                match self.read_method_list(binary, methods_ptr & OBJC_PTR_MASK) {
                    Ok(methods) => selectors.extend(methods),
                    Err(e) if e.is_recoverable() => {
                        warn!(category = %name, error = %e, "skipping category method list");
                        self.warnings.push(e);
                    }
                    Err(e) => return Err(e),
                }
            }

            let display_name = match &base_class_name {
                Some(base) => format!("{} ({})", base, name),
                None => name.clone(),
            };
            for sel in &selectors {
                if let Some(imp) = sel.implementation {
                    self.method_at_imp
                        .insert(imp, (display_name.clone(), Arc::clone(&sel.name)));
                }
            }

            self.classes.push(ObjcClass {
                address: cat_addr,
                name,
                superclass_name: None,
                base_class_name,
                kind: ObjcClassKind::Category,
                selectors,
                ivars: Vec::new(),
                protocols: Vec::new(),
            });
        }

        Ok(())
    }

    fn parse_protocols(&mut self, binary: &MachBinary) -> Result<()> {
        let (_, protocol_pointers) = binary.read_pointer_section("__objc_protolist")?;

        for &proto_addr in &protocol_pointers {
            let raw = match self.read_struct::<ObjcProtocolRaw64>(binary, proto_addr) {
                Ok(r) => r,
                Err(e) => {
                    warn!(addr = format_args!("{:#x}", proto_addr), error = %e, "skipping protocol");
                    continue;
                }
            };

            let name = match binary.string_at_addr(raw.name & OBJC_PTR_MASK) {
                Ok(n) => n,
                Err(_) => continue,
            };

            let mut selectors = Vec::new();
            for methods_ptr in [
                raw.required_instance_methods,
                raw.required_class_methods,
                raw.optional_instance_methods,
                raw.optional_class_methods,
            ] {
                if methods_ptr == 0 {
                    continue;
                }
                match self.read_method_list(binary, methods_ptr & OBJC_PTR_MASK) {
                    Ok(methods) => selectors.extend(methods),
                    Err(e) if e.is_recoverable() => {
                        warn!(protocol = %name, error = %e, "skipping protocol method list");
                        self.warnings.push(e);
                    }
                    Err(e) => return Err(e),
                }
            }

            self.protocols.push(ObjcClass {
                address: proto_addr,
                name,
                superclass_name: None,
                base_class_name: None,
                kind: ObjcClassKind::Protocol,
                selectors,
                ivars: Vec::new(),
                protocols: Vec::new(),
            });
        }

        Ok(())
    }

    fn parse_classrefs(
        &mut self,
        binary: &MachBinary,
        bound_pointers: &HashMap<u64, Arc<str>>,
    ) -> Result<()> {
        let (slots, pointers) = binary.read_pointer_section("__objc_classrefs")?;

        for (&slot, &class_ptr) in slots.iter().zip(pointers.iter()) {
            self.classrefs.insert(slot, class_ptr);

            // Name the ref: a non-zero pointer targets a class in this
            // binary; a zero slot is rewritten by dyld and named by its
            // bind entry.
            let name = if class_ptr != 0 {
                self.class_name_by_pointer.get(&class_ptr).cloned()
            } else {
                bound_pointers
                    .get(&slot)
                    .and_then(|sym| class_name_from_symbol(sym))
                    .map(str::to_owned)
            };

            if let Some(name) = name {
                self.classref_by_name.entry(name).or_insert(slot);
            }
        }

        Ok(())
    }

    fn parse_superrefs(&mut self, binary: &MachBinary) -> Result<()> {
        let (slots, pointers) = binary.read_pointer_section("__objc_superrefs")?;
        for (&slot, &ptr) in slots.iter().zip(pointers.iter()) {
            self.superrefs.insert(slot, ptr);
        }
        Ok(())
    }

    // =========================================================================
    // Structure Readers
    // =========================================================================

    fn read_struct<T: FromBytes + Copy>(&self, binary: &MachBinary, addr: u64) -> Result<T> {
        let size = std::mem::size_of::<T>();
        let data = binary
            .read_at_addr(addr & OBJC_PTR_MASK, size)
            .map_err(|_| Error::InvalidObjcClass { addr })?;
        T::read_from_bytes(&data[..size]).map_err(|_| Error::InvalidObjcClass { addr })
    }

    /// Reads an objc_class and its class_ro_t, returning both plus the
    /// class name.
    fn read_class_header(
        &self,
        binary: &MachBinary,
        class_addr: u64,
    ) -> Result<(ObjcClassRaw64, ObjcDataRaw64, String)> {
        let raw: ObjcClassRaw64 = self.read_struct(binary, class_addr)?;

        let data_addr = raw.data & FAST_DATA_MASK;
        if data_addr == 0 {
            return Err(Error::InvalidObjcClass { addr: class_addr });
        }
        let data: ObjcDataRaw64 = self.read_struct(binary, data_addr)?;

        let name = binary
            .string_at_addr(data.name & OBJC_PTR_MASK)
            .map_err(|_| Error::InvalidObjcClass { addr: class_addr })?;

        Ok((raw, data, name))
    }

    /// Reads a method_list_t in whichever layout it declares, returning
    /// selectors with absolute implementation addresses.
    fn read_method_list(&mut self, binary: &MachBinary, addr: u64) -> Result<Vec<ObjcSelector>> {
        let header: ObjcMethodList = self
            .read_struct(binary, addr)
            .map_err(|_| Error::InvalidObjcMethodList { addr })?;

        let flag_relative = header.entsize_and_flags & METHOD_LIST_RELATIVE_FLAG != 0;
        if flag_relative != self.expect_relative_methods {
            // The flag bit wins over the deployment-target inference.
            warn!(
                addr = format_args!("{:#x}", addr),
                flag_relative,
                expected = self.expect_relative_methods,
                "method list layout flag disagrees with deployment target"
            );
            self.warnings.push(Error::AmbiguousLayout {
                addr,
                reason: format!(
                    "entsize flag selects the {} layout but the deployment target implies the {} layout",
                    if flag_relative { "relative" } else { "absolute" },
                    if self.expect_relative_methods { "relative" } else { "absolute" },
                ),
            });
        }

        let count = header.methcount as usize;
        if count > 0x10000 {
            return Err(Error::InvalidObjcMethodList { addr });
        }

        let mut selectors = Vec::with_capacity(count);
        let mut entry_addr = addr + ObjcMethodList::SIZE as u64;

        for _ in 0..count {
            let selector = if flag_relative {
                self.read_relative_method(binary, entry_addr)?
            } else {
                self.read_absolute_method(binary, entry_addr)?
            };

            // Keep the selref map's view of the implementation current.
            if let (Some(selref), Some(imp)) = (selector.selref, selector.implementation) {
                if let Some(entry) = self.selref_to_selector.get_mut(&selref) {
                    entry.implementation = Some(imp);
                    entry.type_encoding = selector.type_encoding.clone();
                }
            }

            selectors.push(selector);
            entry_addr += if flag_relative {
                ObjcMethodRelative::SIZE as u64
            } else {
                ObjcMethod64::SIZE as u64
            };
        }

        Ok(selectors)
    }

    /// Classic three-pointer method entry.
    fn read_absolute_method(&self, binary: &MachBinary, entry_addr: u64) -> Result<ObjcSelector> {
        let raw: ObjcMethod64 = self
            .read_struct(binary, entry_addr)
            .map_err(|_| Error::InvalidObjcMethodList { addr: entry_addr })?;

        let name_ptr = raw.name & OBJC_PTR_MASK;
        let name: Arc<str> = Arc::from(
            binary
                .string_at_addr(name_ptr)
                .map_err(|_| Error::InvalidObjcMethodList { addr: entry_addr })?
                .as_str(),
        );
        let type_encoding = binary
            .string_at_addr(raw.signature & OBJC_PTR_MASK)
            .ok();

        // IMP pointers carry alignment tag bits.
        let imp = (raw.implementation & OBJC_PTR_MASK) & !0x3;

        Ok(ObjcSelector {
            name,
            selref: self.literal_to_selref.get(&name_ptr).copied(),
            implementation: (imp != 0).then_some(imp),
            type_encoding,
        })
    }

    /// Relative method entry: three i32 fields, each an offset from that
    /// field's own address. The name field reaches the selector through a
    /// selref.
    fn read_relative_method(&self, binary: &MachBinary, entry_addr: u64) -> Result<ObjcSelector> {
        let raw: ObjcMethodRelative = self
            .read_struct(binary, entry_addr)
            .map_err(|_| Error::InvalidObjcMethodList { addr: entry_addr })?;

        let selref_addr = entry_addr.wrapping_add_signed(raw.name_offset as i64);
        let name: Arc<str> = match self.selref_to_selector.get(&selref_addr) {
            Some(sel) => Arc::clone(&sel.name),
            None => {
                // Not a known selref slot; dereference it directly.
                let literal = binary
                    .read_word_at_addr(selref_addr)
                    .map_err(|_| Error::InvalidObjcMethodList { addr: entry_addr })?
                    & OBJC_PTR_MASK;
                Arc::from(
                    binary
                        .string_at_addr(literal)
                        .map_err(|_| Error::InvalidObjcMethodList { addr: entry_addr })?
                        .as_str(),
                )
            }
        };

        let types_addr = (entry_addr + 4).wrapping_add_signed(raw.signature_offset as i64);
        let type_encoding = binary.string_at_addr(types_addr).ok();

        let imp = (entry_addr + 8).wrapping_add_signed(raw.implementation_offset as i64);

        Ok(ObjcSelector {
            name,
            selref: Some(selref_addr),
            implementation: Some(imp),
            type_encoding,
        })
    }

    fn read_ivar_list(&self, binary: &MachBinary, addr: u64) -> Result<Vec<ObjcIvar>> {
        let header: ObjcIvarList = self.read_struct(binary, addr)?;

        let count = header.ivarcount as usize;
        if count > 0x10000 {
            return Err(Error::InvalidObjcClass { addr });
        }

        let mut ivars = Vec::with_capacity(count);
        let mut entry_addr = addr + ObjcIvarList::SIZE as u64;
        for _ in 0..count {
            let raw: ObjcIvar64 = self.read_struct(binary, entry_addr)?;

            let name = binary
                .string_at_addr(raw.name & OBJC_PTR_MASK)
                .unwrap_or_default();
            let type_encoding = binary
                .string_at_addr(raw.type_encoding & OBJC_PTR_MASK)
                .unwrap_or_default();
            let offset = if raw.offset_ptr != 0 {
                binary.read_u32_at_addr(raw.offset_ptr & OBJC_PTR_MASK).ok()
            } else {
                None
            };

            ivars.push(ObjcIvar {
                name,
                type_encoding,
                offset,
                size: raw.size,
            });
            entry_addr += ObjcIvar64::SIZE as u64;
        }

        Ok(ivars)
    }

    /// Reads a protocol_list_t (count-prefixed pointer array) into names.
    fn read_protocol_name_list(&self, binary: &MachBinary, addr: u64) -> Result<Vec<String>> {
        let count = binary.read_u64_at_addr(addr)? as usize;
        if count > 0x1000 {
            return Err(Error::InvalidObjcClass { addr });
        }

        let mut names = Vec::with_capacity(count);
        for i in 0..count {
            let proto_ptr = binary.read_u64_at_addr(addr + 8 + i as u64 * 8)? & OBJC_PTR_MASK;
            if proto_ptr == 0 {
                continue;
            }
            let raw: ObjcProtocolRaw64 = self.read_struct(binary, proto_ptr)?;
            if let Ok(name) = binary.string_at_addr(raw.name & OBJC_PTR_MASK) {
                names.push(name);
            }
        }
        Ok(names)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns every class and category implemented by the binary.
    #[inline]
    pub fn classes(&self) -> &[ObjcClass] {
        &self.classes
    }

    /// Returns the non-fatal errors recorded while parsing the runtime
    /// metadata (skipped structures, layout disagreements).
    #[inline]
    pub fn warnings(&self) -> &[Error] {
        &self.warnings
    }

    /// Returns every protocol referenced by __objc_protolist.
    #[inline]
    pub fn protocols(&self) -> &[ObjcClass] {
        &self.protocols
    }

    /// Resolves a selref slot address to its selector.
    pub fn selector_for_selref(&self, selref_addr: u64) -> Option<&ObjcSelector> {
        self.selref_to_selector.get(&selref_addr)
    }

    /// Returns the selref slot referencing a selector name.
    pub fn selref_for_selector_name(&self, name: &str) -> Option<u64> {
        self.selref_by_name.get(name).copied()
    }

    /// Returns the classref-section slot for a class name.
    ///
    /// Only `__objc_classrefs` entries qualify; dyld-bound pointers with a
    /// matching class symbol elsewhere in the binary do not.
    pub fn classref_for_class_name(&self, name: &str) -> Option<u64> {
        self.classref_by_name.get(name).copied()
    }

    /// Resolves a class object address to its name.
    pub fn class_name_for_class_pointer(&self, class_addr: u64) -> Option<&str> {
        self.class_name_by_pointer
            .get(&class_addr)
            .map(String::as_str)
    }

    /// Returns the class pointer stored in a classref slot.
    pub fn class_pointer_for_classref(&self, slot: u64) -> Option<u64> {
        self.classrefs.get(&slot).copied()
    }

    /// Returns the superref slot → class pointer map.
    #[inline]
    pub fn superrefs(&self) -> &HashMap<u64, u64> {
        &self.superrefs
    }

    /// Returns the implementation addresses of every method with the
    /// given selector name.
    pub fn method_imp_addresses(&self, selector_name: &str) -> Vec<u64> {
        let mut imps: Vec<u64> = self
            .classes
            .iter()
            .flat_map(|c| c.selectors.iter())
            .filter(|s| s.name.as_ref() == selector_name)
            .filter_map(|s| s.implementation)
            .collect();
        imps.sort_unstable();
        imps.dedup();
        imps
    }

    /// Returns the (class, selector) pair implemented at an address.
    pub fn method_at_imp(&self, imp: u64) -> Option<&(String, Arc<str>)> {
        self.method_at_imp.get(&imp)
    }
}

/// Whether the deployment target implies relative method lists.
fn relative_methods_expected(binary: &MachBinary) -> bool {
    let Some(minos) = binary.minimum_deployment_target() else {
        return false;
    };
    match binary.build_platform() {
        Some(Platform::Ios) | Some(Platform::IosSimulator) | Some(Platform::MacCatalyst)
        | Some(Platform::TvOs) => minos >= Version::new(14, 0, 0),
        Some(Platform::MacOs) => minos >= Version::new(11, 0, 0),
        Some(Platform::WatchOs) => minos >= Version::new(7, 0, 0),
        _ => false,
    }
}
