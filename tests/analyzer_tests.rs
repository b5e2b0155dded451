//! End-to-end analysis tests over synthetic ARM64 binaries.

mod common;

use armlens::analysis::ObjcClassKind;
use armlens::arm64;
use armlens::macho::constants::*;
use armlens::macho::Version;
use armlens::{Error, FatArchive, MachAnalyzer, RegisterContents};
use common::*;

/// Adds three filler locals so the interesting symbol lands at index 3.
fn pad_symbols(builder: &mut TestBinary) {
    for i in 0..3 {
        builder.add_symbol(&format!("_local{}", i), N_SECT, 1, TEXT_ADDR + i * 4);
    }
}

// =============================================================================
// Stub Resolution
// =============================================================================

#[test]
fn single_msgsend_stub_resolves_through_the_table_join() {
    let mut builder = TestBinary::new();
    builder
        .set_section_size("__text", 0x800)
        .set_section_size("__stubs", 0xC)
        .set_section_size("__la_symbol_ptr", 8);
    pad_symbols(&mut builder);
    let msgsend = builder.add_undefined("_objc_msgSend");
    assert_eq!(msgsend, 3);
    builder.set_indirect(&[3]);

    // The stub body itself: adrp x16 / ldr x16 / br x16.
    builder.write_instrs(
        STUBS_ADDR,
        &[
            arm64::encode_adrp(16, STUBS_ADDR, LA_SYMBOL_PTR_ADDR),
            arm64::encode_ldr_imm(16, 16, 0),
            arm64::encode_br(16),
        ],
    );
    // Garbage pointer dyld would rewrite at load time.
    builder.write_vm_u64(LA_SYMBOL_PTR_ADDR, 0x100010000);

    let data = builder.build();
    let archive = FatArchive::parse(&data).unwrap();
    let slice = archive.arm64_slice().unwrap();
    let analyzer = MachAnalyzer::for_slice(slice);

    assert_eq!(
        analyzer
            .imported_symbol_names_to_pointers()
            .unwrap()
            .get("_objc_msgSend")
            .copied(),
        Some(LA_SYMBOL_PTR_ADDR)
    );
    assert_eq!(
        analyzer
            .symbol_name_for_branch_destination(STUBS_ADDR)
            .unwrap()
            .as_deref(),
        Some("_objc_msgSend")
    );
    assert_eq!(
        analyzer
            .bound_pointers_to_symbol_names()
            .unwrap()
            .get(&LA_SYMBOL_PTR_ADDR)
            .map(|s| s.as_ref()),
        Some("_objc_msgSend")
    );

    // Cached accessors are idempotent.
    let first: Vec<_> = {
        let map = analyzer.imported_symbol_names_to_pointers().unwrap();
        let mut v: Vec<_> = map.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        v.sort();
        v
    };
    let second: Vec<_> = {
        let map = analyzer.imported_symbol_names_to_pointers().unwrap();
        let mut v: Vec<_> = map.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        v.sort();
        v
    };
    assert_eq!(first, second);
}

#[test]
fn sentinel_indirect_entries_are_skipped() {
    let mut builder = TestBinary::new();
    builder
        .set_section_size("__stubs", 0x18)
        .set_section_size("__la_symbol_ptr", 16);
    pad_symbols(&mut builder);
    builder.add_undefined("_free");
    builder.set_indirect(&[INDIRECT_SYMBOL_LOCAL, 3]);

    let data = builder.build();
    let archive = FatArchive::parse(&data).unwrap();
    let analyzer = MachAnalyzer::for_slice(archive.arm64_slice().unwrap());

    let resolver = analyzer.stub_resolver().unwrap();
    // First stub has a sentinel entry and no name; second resolves.
    assert_eq!(resolver.stubs().len(), 2);
    assert!(resolver.stubs()[0].name.is_none());
    assert_eq!(resolver.stubs()[1].name.as_deref(), Some("_free"));
    assert_eq!(
        resolver.symbol_name_for_stub(STUBS_ADDR + 0xC).map(|s| s.as_ref()),
        Some("_free")
    );
}

#[test]
fn out_of_range_indirect_entry_does_not_abort_other_stubs() {
    let mut builder = TestBinary::new();
    builder
        .set_section_size("__stubs", 0x18)
        .set_section_size("__la_symbol_ptr", 16);
    pad_symbols(&mut builder);
    builder.add_undefined("_malloc");
    builder.set_indirect(&[9999, 3]);

    let data = builder.build();
    let archive = FatArchive::parse(&data).unwrap();
    let analyzer = MachAnalyzer::for_slice(archive.arm64_slice().unwrap());

    let resolver = analyzer.stub_resolver().unwrap();
    assert!(resolver.stubs()[0].name.is_none());
    assert_eq!(resolver.stubs()[1].name.as_deref(), Some("_malloc"));

    // The inconsistency is recorded, not just logged.
    assert!(resolver
        .warnings()
        .iter()
        .any(|w| matches!(w, Error::InconsistentSymbolTable { .. })));
}

// =============================================================================
// Basic Blocks
// =============================================================================

#[test]
fn conditional_branch_partitions_into_three_blocks() {
    let entry = TEXT_ADDR;
    let label = entry + 16;

    let mut builder = TestBinary::new();
    builder.set_section_size("__text", 0x800);
    builder.write_instrs(
        entry,
        &[
            arm64::encode_cmp_reg(0, 1),
            arm64::encode_b_cond(0, entry + 4, label), // b.eq L
            arm64::encode_movz(0, 3, 0),
            arm64::encode_ret(),
            arm64::encode_movz(0, 5, 0), // L
            arm64::encode_ret(),
        ],
    );

    let data = builder.build();
    let archive = FatArchive::parse(&data).unwrap();
    let analyzer = MachAnalyzer::for_slice(archive.arm64_slice().unwrap());

    let function = analyzer.function_analyzer(entry).unwrap();
    assert_eq!(function.end(), entry + 24);
    assert_eq!(
        function.basic_blocks(),
        &[(entry, entry + 8), (entry + 8, label), (label, entry + 24)]
    );

    // The partition is total and disjoint.
    let blocks = function.basic_blocks();
    assert_eq!(blocks[0].0, entry);
    assert_eq!(blocks.last().unwrap().1, function.end());
    for pair in blocks.windows(2) {
        assert_eq!(pair[0].1, pair[1].0);
    }
}

#[test]
fn forward_unconditional_branch_is_a_local_goto() {
    let entry = TEXT_ADDR;
    let merge = entry + 8;

    let mut builder = TestBinary::new();
    builder.set_section_size("__text", 0x800);
    builder.write_instrs(
        entry,
        &[
            arm64::encode_b(entry, merge),
            arm64::encode_movz(0, 1, 0), // skipped by the goto
            arm64::encode_ret(),         // merge
        ],
    );

    let data = builder.build();
    let archive = FatArchive::parse(&data).unwrap();
    let analyzer = MachAnalyzer::for_slice(archive.arm64_slice().unwrap());

    // The forward b must not be misread as the function's end.
    let function = analyzer.function_analyzer(entry).unwrap();
    assert_eq!(function.end(), entry + 12);
    assert_eq!(
        function.basic_blocks(),
        &[(entry, entry + 4), (entry + 4, merge), (merge, entry + 12)]
    );
}

#[test]
fn backward_unconditional_branch_ends_the_function() {
    let entry = TEXT_ADDR + 0x40;

    let mut builder = TestBinary::new();
    builder.set_section_size("__text", 0x800);
    builder.write_instrs(
        entry,
        &[
            arm64::encode_movz(0, 1, 0),
            arm64::encode_b(entry + 4, entry), // loop back to the top
        ],
    );

    let data = builder.build();
    let archive = FatArchive::parse(&data).unwrap();
    let analyzer = MachAnalyzer::for_slice(archive.arm64_slice().unwrap());

    let function = analyzer.function_analyzer(entry).unwrap();
    assert_eq!(function.end(), entry + 8);
}

#[test]
fn epilogue_tail_branch_ends_the_function() {
    let entry = TEXT_ADDR + 0x80;
    let elsewhere = TEXT_ADDR + 0x700;

    let mut builder = TestBinary::new();
    builder.set_section_size("__text", 0x800);
    // stp x29, x30 / ldp x29, x30 / b _elsewhere: the pair restore of
    // the link register marks the forward b as a tail jump, not a goto.
    builder.write_instrs(
        entry,
        &[
            arm64::encode_stp(29, 30, 31, -16),
            arm64::encode_ldp(29, 30, 31, 0),
            arm64::encode_b(entry + 8, elsewhere),
        ],
    );
    builder.write_instrs(elsewhere, &[arm64::encode_ret()]);

    let data = builder.build();
    let archive = FatArchive::parse(&data).unwrap();
    let analyzer = MachAnalyzer::for_slice(archive.arm64_slice().unwrap());

    let function = analyzer.function_analyzer(entry).unwrap();
    assert_eq!(function.end(), entry + 12);
}

#[test]
fn register_contents_are_block_scoped() {
    let entry = TEXT_ADDR;
    let label = entry + 16;

    let mut builder = TestBinary::new();
    builder.set_section_size("__text", 0x800);
    builder.write_instrs(
        entry,
        &[
            arm64::encode_movz(2, 0x42, 0),
            arm64::encode_b_cond(0, entry + 4, label),
            arm64::encode_movz(0, 3, 0),
            arm64::encode_ret(),
            arm64::encode_movz(0, 5, 0), // L
            arm64::encode_ret(),
        ],
    );

    let data = builder.build();
    let archive = FatArchive::parse(&data).unwrap();
    let analyzer = MachAnalyzer::for_slice(archive.arm64_slice().unwrap());
    let function = analyzer.function_analyzer(entry).unwrap();

    // Within the entry block the movz result is visible.
    assert_eq!(
        function
            .get_register_contents_at_instruction(2, entry + 4)
            .unwrap(),
        RegisterContents::Immediate(0x42)
    );
    // Entry state: x0 still holds argument 0 at the first instruction.
    assert_eq!(
        function.get_register_contents_at_instruction(0, entry).unwrap(),
        RegisterContents::FunctionArgument(0)
    );
    // A non-entry block starts from an unknown file.
    assert_eq!(
        function.get_register_contents_at_instruction(2, label).unwrap(),
        RegisterContents::Unknown
    );
    // Determinism: asking twice gives the same answer.
    assert_eq!(
        function.get_register_contents_at_instruction(2, entry + 4).unwrap(),
        function.get_register_contents_at_instruction(2, entry + 4).unwrap()
    );
}

// =============================================================================
// String XRefs
// =============================================================================

#[test]
fn adrp_add_string_load_is_indexed() {
    let entry = TEXT_ADDR + 0x100;
    let literal_addr = CSTRING_ADDR + 0x40;

    let mut builder = TestBinary::new();
    builder
        .set_section_size("__text", 0x800)
        .set_section_size("__cstring", 0x100);
    builder.write_cstr(literal_addr, "Reachable via WiFi");
    builder.write_instrs(
        entry,
        &[
            arm64::encode_adrp(2, entry, literal_addr),
            arm64::encode_add_imm(2, 2, 0x40),
            arm64::encode_ret(),
        ],
    );
    builder.add_export("_wifi_log", entry);

    let data = builder.build();
    let archive = FatArchive::parse(&data).unwrap();
    let analyzer = MachAnalyzer::for_slice(archive.arm64_slice().unwrap());
    let xrefs = analyzer.compute_xrefs().unwrap();

    // The xref points at the adrp that began the address formation.
    assert_eq!(
        xrefs.string_xrefs_to("Reachable via WiFi"),
        vec![(entry, literal_addr)]
    );
    assert_eq!(
        xrefs.strings_in_func(entry),
        vec![(literal_addr, "Reachable via WiFi")]
    );
    assert!(xrefs.string_xrefs_to("never loaded").is_empty());

    // The literal also appears in the whole-binary string listing.
    assert!(xrefs
        .get_cstrings()
        .contains(&(literal_addr, "Reachable via WiFi".to_owned())));
}

// =============================================================================
// Objective-C Runtime
// =============================================================================

/// Lays out one class ("MyClass") with one method ("doWork").
///
/// With `relative` the method list uses the modern self-relative layout
/// and the matching LC_BUILD_VERSION; otherwise the classic
/// three-pointer layout.
fn build_objc_class(builder: &mut TestBinary, relative: bool) -> u64 {
    let class_addr = OBJC_DATA_ADDR;
    let class_ro_addr = OBJC_DATA_ADDR + 0x100;
    let method_list_addr = OBJC_DATA_ADDR + 0x200;
    let imp_addr = TEXT_ADDR + 0x200;
    let types_addr = CSTRING_ADDR + 0x80;

    builder
        .set_section_size("__text", 0x800)
        .set_section_size("__cstring", 0x100)
        .set_section_size("__objc_methname", 0x100)
        .set_section_size("__objc_classname", 0x100)
        .set_section_size("__objc_selrefs", 8)
        .set_section_size("__objc_classlist", 8);

    builder.write_cstr(CLASSNAME_ADDR, "MyClass");
    builder.write_cstr(METHNAME_ADDR, "doWork");
    builder.write_cstr(types_addr, "v16@0:8");
    builder.write_vm_u64(SELREFS_ADDR, METHNAME_ADDR);
    builder.write_vm_u64(CLASSLIST_ADDR, class_addr);
    builder.write_instr(imp_addr, arm64::encode_ret());

    // objc_class: isa, superclass, cache, vtable, data
    builder.write_vm_u64(class_addr, 0);
    builder.write_vm_u64(class_addr + 8, 0);
    builder.write_vm_u64(class_addr + 16, 0);
    builder.write_vm_u64(class_addr + 24, 0);
    builder.write_vm_u64(class_addr + 32, class_ro_addr);

    // class_ro_t: 4 u32s, then ivar_layout, name, base_methods, ...
    builder.write_vm_u64(class_ro_addr + 16, 0);
    builder.write_vm_u64(class_ro_addr + 24, CLASSNAME_ADDR);
    builder.write_vm_u64(class_ro_addr + 32, method_list_addr);

    if relative {
        builder.set_build_version(PLATFORM_IOS, Version::new(14, 0, 0));
        // method_list_t header: entsize 12 with the relative flag
        builder.write_vm(method_list_addr, &(0x8000_000Cu32).to_le_bytes());
        builder.write_vm(method_list_addr + 4, &1u32.to_le_bytes());

        let entry = method_list_addr + 8;
        let name_off = (SELREFS_ADDR as i64 - entry as i64) as i32;
        let types_off = (types_addr as i64 - (entry + 4) as i64) as i32;
        let imp_off = (imp_addr as i64 - (entry + 8) as i64) as i32;
        builder.write_vm(entry, &name_off.to_le_bytes());
        builder.write_vm(entry + 4, &types_off.to_le_bytes());
        builder.write_vm(entry + 8, &imp_off.to_le_bytes());
    } else {
        // method_list_t header: entsize 24, no flags
        builder.write_vm(method_list_addr, &24u32.to_le_bytes());
        builder.write_vm(method_list_addr + 4, &1u32.to_le_bytes());

        let entry = method_list_addr + 8;
        builder.write_vm_u64(entry, METHNAME_ADDR);
        builder.write_vm_u64(entry + 8, types_addr);
        builder.write_vm_u64(entry + 16, imp_addr);
    }

    class_addr
}

#[test]
fn relative_method_list_yields_absolute_addresses() {
    let mut builder = TestBinary::new();
    build_objc_class(&mut builder, true);
    let data = builder.build();

    let archive = FatArchive::parse(&data).unwrap();
    let slice = archive.arm64_slice().unwrap();
    assert_eq!(slice.minimum_deployment_target(), Some(Version::new(14, 0, 0)));

    let analyzer = MachAnalyzer::for_slice(slice);
    let classes = analyzer.objc_classes().unwrap();
    assert_eq!(classes.len(), 1);

    let class = &classes[0];
    assert_eq!(class.name, "MyClass");
    assert_eq!(class.kind, ObjcClassKind::Class);
    assert_eq!(class.selectors.len(), 1);

    let sel = &class.selectors[0];
    assert_eq!(sel.name.as_ref(), "doWork");
    assert_eq!(sel.implementation, Some(TEXT_ADDR + 0x200));
    assert_eq!(sel.type_encoding.as_deref(), Some("v16@0:8"));
    assert_eq!(sel.selref, Some(SELREFS_ADDR));

    assert_eq!(
        analyzer.get_imps_for_sel("doWork").unwrap(),
        vec![TEXT_ADDR + 0x200]
    );
    let via_selref = analyzer.selector_for_selref(SELREFS_ADDR).unwrap().unwrap();
    assert_eq!(via_selref.implementation, Some(TEXT_ADDR + 0x200));
}

#[test]
fn absolute_method_list_parses_identically() {
    let mut builder = TestBinary::new();
    build_objc_class(&mut builder, false);
    let data = builder.build();

    let archive = FatArchive::parse(&data).unwrap();
    let analyzer = MachAnalyzer::for_slice(archive.arm64_slice().unwrap());

    let classes = analyzer.objc_classes().unwrap();
    let sel = &classes[0].selectors[0];
    assert_eq!(sel.name.as_ref(), "doWork");
    assert_eq!(sel.implementation, Some(TEXT_ADDR + 0x200));
}

#[test]
fn layout_flag_wins_over_deployment_target() {
    // Absolute-layout method list in a binary whose deployment target
    // implies the relative layout: the flag bit decides, and the
    // disagreement is recorded.
    let mut builder = TestBinary::new();
    build_objc_class(&mut builder, false);
    builder.set_build_version(PLATFORM_IOS, Version::new(14, 0, 0));
    let data = builder.build();

    let archive = FatArchive::parse(&data).unwrap();
    let analyzer = MachAnalyzer::for_slice(archive.arm64_slice().unwrap());

    let classes = analyzer.objc_classes().unwrap();
    let sel = &classes[0].selectors[0];
    assert_eq!(sel.name.as_ref(), "doWork");
    assert_eq!(sel.implementation, Some(TEXT_ADDR + 0x200));

    let runtime = analyzer.objc_runtime().unwrap();
    assert!(runtime
        .warnings()
        .iter()
        .any(|w| matches!(w, Error::AmbiguousLayout { .. })));
}

#[test]
fn classref_wins_over_bound_class_pointer_of_the_same_name() {
    let mut builder = TestBinary::new();
    let class_addr = build_objc_class(&mut builder, false);
    builder
        .set_section_size("__objc_classrefs", 8)
        .set_section_size("__got", 8);
    builder.write_vm_u64(CLASSREFS_ADDR, class_addr);

    // A dyld-bound pointer with the same class symbol lives in __got.
    pad_symbols(&mut builder);
    builder.add_undefined("_OBJC_CLASS_$_MyClass");
    builder.got_reserved1 = 0;
    builder.set_indirect(&[3]);

    let data = builder.build();
    let archive = FatArchive::parse(&data).unwrap();
    let analyzer = MachAnalyzer::for_slice(archive.arm64_slice().unwrap());

    // The bound pointer exists...
    assert_eq!(
        analyzer
            .bound_pointers_to_symbol_names()
            .unwrap()
            .get(&GOT_ADDR)
            .map(|s| s.as_ref()),
        Some("_OBJC_CLASS_$_MyClass")
    );
    // ...but the classref query must return the classref-section entry.
    assert_eq!(
        analyzer.classref_for_class_name("MyClass").unwrap(),
        Some(CLASSREFS_ADDR)
    );
    assert_eq!(
        analyzer.class_name_for_class_pointer(class_addr).unwrap(),
        Some("MyClass".to_owned())
    );
}

// =============================================================================
// Objective-C Call Sites
// =============================================================================

#[test]
fn msgsend_call_site_recovers_class_and_selector() {
    let caller = TEXT_ADDR + 0x400;

    let mut builder = TestBinary::new();
    build_objc_class(&mut builder, false);
    builder
        .set_section_size("__objc_classrefs", 8)
        .set_section_size("__stubs", 0xC)
        .set_section_size("__la_symbol_ptr", 8);
    builder.write_vm_u64(CLASSREFS_ADDR, OBJC_DATA_ADDR);

    pad_symbols(&mut builder);
    builder.add_undefined("_objc_msgSend");
    builder.set_indirect(&[3]);

    // x0 = classref slot, x1 = selref slot, then the dispatch.
    builder.write_instrs(
        caller,
        &[
            arm64::encode_adrp(0, caller, CLASSREFS_ADDR),
            arm64::encode_ldr_imm(0, 0, 0x300),
            arm64::encode_adrp(1, caller + 8, SELREFS_ADDR),
            arm64::encode_ldr_imm(1, 1, 0x200),
            arm64::encode_bl(caller + 16, STUBS_ADDR),
            arm64::encode_ret(),
        ],
    );
    builder.add_export("_caller", caller);

    let data = builder.build();
    let archive = FatArchive::parse(&data).unwrap();
    let analyzer = MachAnalyzer::for_slice(archive.arm64_slice().unwrap());
    let xrefs = analyzer.compute_xrefs().unwrap();

    let sites = xrefs.objc_calls_to(&["MyClass"], &["doWork"], true);
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].address, caller + 16);
    assert_eq!(sites[0].function_entry, caller);
    assert_eq!(sites[0].target_symbol.as_ref(), "_objc_msgSend");

    // Direct-branch xrefs cover the call.
    assert_eq!(xrefs.xrefs_to(STUBS_ADDR), &[caller + 16]);

    // requires_both_found filters out partial matches.
    assert!(xrefs.objc_calls_to(&["OtherClass"], &["doWork"], true).is_empty());
    assert_eq!(
        xrefs.objc_calls_to(&["OtherClass"], &["doWork"], false).len(),
        1
    );
}

#[test]
fn fast_path_dispatch_carries_its_selector() {
    let caller = TEXT_ADDR + 0x500;

    let mut builder = TestBinary::new();
    build_objc_class(&mut builder, false);
    builder
        .set_section_size("__objc_classrefs", 8)
        .set_section_size("__stubs", 0xC)
        .set_section_size("__la_symbol_ptr", 8);
    builder.write_vm_u64(CLASSREFS_ADDR, OBJC_DATA_ADDR);

    pad_symbols(&mut builder);
    builder.add_undefined("_objc_opt_isKindOfClass");
    builder.set_indirect(&[3]);

    builder.write_instrs(
        caller,
        &[
            arm64::encode_adrp(0, caller, CLASSREFS_ADDR),
            arm64::encode_ldr_imm(0, 0, 0x300),
            arm64::encode_bl(caller + 8, STUBS_ADDR),
            arm64::encode_ret(),
        ],
    );
    builder.add_export("_checker", caller);

    let data = builder.build();
    let archive = FatArchive::parse(&data).unwrap();
    let analyzer = MachAnalyzer::for_slice(archive.arm64_slice().unwrap());
    let xrefs = analyzer.compute_xrefs().unwrap();

    let sites = xrefs.objc_calls_to(&["MyClass"], &["isKindOfClass:"], true);
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].selector_name.as_deref(), Some("isKindOfClass:"));
}

// =============================================================================
// Invalid Bytecode
// =============================================================================

#[test]
fn undecodable_function_is_dropped_but_others_survive() {
    let bad = TEXT_ADDR + 0x300;
    let good = TEXT_ADDR + 0x340;

    let mut builder = TestBinary::new();
    builder.set_section_size("__text", 0x800);
    // Two decodable words, then a reserved all-zero word.
    builder.write_instrs(bad, &[arm64::encode_nop(), arm64::encode_nop()]);
    builder.write_instrs(good, &[arm64::encode_movz(0, 1, 0), arm64::encode_ret()]);
    builder.add_export("_bad", bad);
    builder.add_export("_good", good);

    let data = builder.build();
    let archive = FatArchive::parse(&data).unwrap();
    let analyzer = MachAnalyzer::for_slice(archive.arm64_slice().unwrap());

    match analyzer.function_analyzer(bad) {
        Err(Error::InvalidBytecode { addr, .. }) => assert_eq!(addr, bad + 8),
        other => panic!("expected InvalidBytecode, got {:?}", other.map(|_| ())),
    }

    let xrefs = analyzer.compute_xrefs().unwrap();
    assert!(xrefs.analyzed_functions().contains(&good));
    assert!(!xrefs.analyzed_functions().contains(&bad));

    // The valid function still analyzes in the same binary.
    let function = analyzer.function_analyzer(good).unwrap();
    assert_eq!(function.end(), good + 8);
}

// =============================================================================
// Call Discovery
// =============================================================================

#[test]
fn bl_targets_become_analyzed_functions() {
    let outer = TEXT_ADDR;
    let helper = TEXT_ADDR + 0x100;

    let mut builder = TestBinary::new();
    builder.set_section_size("__text", 0x800);
    builder.write_instrs(
        outer,
        &[arm64::encode_bl(outer, helper), arm64::encode_ret()],
    );
    builder.write_instrs(helper, &[arm64::encode_movz(0, 7, 0), arm64::encode_ret()]);
    builder.add_export("_outer", outer);

    let data = builder.build();
    let archive = FatArchive::parse(&data).unwrap();
    let analyzer = MachAnalyzer::for_slice(archive.arm64_slice().unwrap());

    // Only the export is known before the XRef pass.
    assert_eq!(analyzer.functions().unwrap(), &[outer]);

    let xrefs = analyzer.compute_xrefs().unwrap();
    assert_eq!(xrefs.analyzed_functions(), &[outer, helper]);
    assert_eq!(xrefs.xrefs_to(helper), &[outer]);
}
