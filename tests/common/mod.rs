//! Synthetic Mach-O construction for integration tests.
//!
//! Builds a thin ARM64 binary with a fixed segment layout:
//!
//! | segment    | vm                    | file             |
//! |------------|-----------------------|------------------|
//! | __TEXT     | 0x100000000..+0x4000  | 0x0000..0x4000   |
//! | __DATA     | 0x100004000..+0x4000  | 0x4000..0x8000   |
//! | __LINKEDIT | 0x100008000..+0x8000  | 0x8000..0x10000  |
//!
//! Virtual addresses map to file offsets by subtracting `VM_BASE`, so
//! tests write content at VM addresses directly. Section sizes default
//! to zero; tests size the sections they populate.

#![allow(dead_code)] // each test binary uses a different subset

use std::collections::HashMap;

use armlens::macho::constants::*;
use armlens::macho::structs::*;
use zerocopy::IntoBytes;

/// Base virtual address of the synthetic binary.
pub const VM_BASE: u64 = 0x1_0000_0000;

/// Total file size of the synthetic binary.
pub const FILE_SIZE: usize = 0x10000;

/// VM address of the __text section.
pub const TEXT_ADDR: u64 = VM_BASE + 0x1000;
/// VM address of the __stubs section.
pub const STUBS_ADDR: u64 = VM_BASE + 0x2000;
/// VM address of the __cstring section.
pub const CSTRING_ADDR: u64 = VM_BASE + 0x3000;
/// VM address of the __objc_methname section.
pub const METHNAME_ADDR: u64 = VM_BASE + 0x3400;
/// VM address of the __objc_classname section.
pub const CLASSNAME_ADDR: u64 = VM_BASE + 0x3600;
/// VM address of the __la_symbol_ptr section.
pub const LA_SYMBOL_PTR_ADDR: u64 = VM_BASE + 0x4000;
/// VM address of the __got section.
pub const GOT_ADDR: u64 = VM_BASE + 0x4100;
/// VM address of the __objc_selrefs section.
pub const SELREFS_ADDR: u64 = VM_BASE + 0x4200;
/// VM address of the __objc_classrefs section.
pub const CLASSREFS_ADDR: u64 = VM_BASE + 0x4300;
/// VM address of the __objc_classlist section.
pub const CLASSLIST_ADDR: u64 = VM_BASE + 0x4400;
/// VM region used for raw Objective-C runtime structures.
pub const OBJC_DATA_ADDR: u64 = VM_BASE + 0x4800;

const SYMTAB_OFF: u32 = 0x8000;
const STRTAB_OFF: u32 = 0x9000;
const INDIRECT_OFF: u32 = 0xA000;
const CODESIG_OFF: u32 = 0xB000;

/// Builder for a synthetic thin ARM64 Mach-O.
pub struct TestBinary {
    data: Vec<u8>,
    sizes: HashMap<&'static str, u64>,
    pub stubs_reserved1: u32,
    pub la_reserved1: u32,
    pub got_reserved1: u32,
    symbols: Vec<Nlist64>,
    strtab: Vec<u8>,
    indirect: Vec<u32>,
    build_version: Option<(u32, u32)>,
    code_signature: Option<Vec<u8>>,
}

impl Default for TestBinary {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBinary {
    pub fn new() -> Self {
        Self {
            data: vec![0u8; FILE_SIZE],
            sizes: HashMap::new(),
            stubs_reserved1: 0,
            la_reserved1: 0,
            got_reserved1: 0,
            symbols: Vec::new(),
            strtab: vec![0],
            indirect: Vec::new(),
            build_version: None,
            code_signature: None,
        }
    }

    /// Sets a section's size (all sections default to empty).
    pub fn set_section_size(&mut self, name: &'static str, size: u64) -> &mut Self {
        self.sizes.insert(name, size);
        self
    }

    /// Writes raw bytes at a virtual address.
    pub fn write_vm(&mut self, addr: u64, bytes: &[u8]) -> &mut Self {
        let off = (addr - VM_BASE) as usize;
        self.data[off..off + bytes.len()].copy_from_slice(bytes);
        self
    }

    /// Writes one instruction word at a virtual address.
    pub fn write_instr(&mut self, addr: u64, word: u32) -> &mut Self {
        self.write_vm(addr, &word.to_le_bytes())
    }

    /// Writes a sequence of instruction words starting at a virtual
    /// address.
    pub fn write_instrs(&mut self, addr: u64, words: &[u32]) -> &mut Self {
        for (i, &word) in words.iter().enumerate() {
            self.write_instr(addr + i as u64 * 4, word);
        }
        self
    }

    /// Writes a u64 at a virtual address.
    pub fn write_vm_u64(&mut self, addr: u64, value: u64) -> &mut Self {
        self.write_vm(addr, &value.to_le_bytes())
    }

    /// Writes a NUL-terminated string at a virtual address.
    pub fn write_cstr(&mut self, addr: u64, s: &str) -> &mut Self {
        let mut bytes = s.as_bytes().to_vec();
        bytes.push(0);
        self.write_vm(addr, &bytes)
    }

    /// Appends a symbol, returning its symbol-table index.
    pub fn add_symbol(&mut self, name: &str, n_type: u8, n_sect: u8, n_value: u64) -> u32 {
        let n_strx = self.strtab.len() as u32;
        self.strtab.extend_from_slice(name.as_bytes());
        self.strtab.push(0);
        self.symbols.push(Nlist64 {
            n_strx,
            n_type,
            n_sect,
            n_desc: 0,
            n_value,
        });
        (self.symbols.len() - 1) as u32
    }

    /// Appends an undefined external (imported) symbol.
    pub fn add_undefined(&mut self, name: &str) -> u32 {
        self.add_symbol(name, N_UNDF | N_EXT, 0, 0)
    }

    /// Appends a defined external (exported) symbol.
    pub fn add_export(&mut self, name: &str, addr: u64) -> u32 {
        self.add_symbol(name, N_SECT | N_EXT, 1, addr)
    }

    /// Sets the indirect symbol table contents.
    pub fn set_indirect(&mut self, entries: &[u32]) -> &mut Self {
        self.indirect = entries.to_vec();
        self
    }

    /// Emits an LC_BUILD_VERSION command.
    pub fn set_build_version(&mut self, platform: u32, minos: Version) -> &mut Self {
        self.build_version = Some((platform, minos.0));
        self
    }

    /// Emits an LC_CODE_SIGNATURE command covering the given SuperBlob.
    pub fn set_code_signature(&mut self, blob: Vec<u8>) -> &mut Self {
        self.code_signature = Some(blob);
        self
    }

    fn size_of(&self, name: &str) -> u64 {
        self.sizes.get(name).copied().unwrap_or(0)
    }

    fn section(&self, segname: &str, sectname: &str, addr: u64, flags: u32, r1: u32, r2: u32) -> Section64 {
        let mut section = Section64 {
            sectname: [0; 16],
            segname: [0; 16],
            addr,
            size: self.size_of(sectname),
            offset: (addr - VM_BASE) as u32,
            align: 2,
            reloff: 0,
            nreloc: 0,
            flags,
            reserved1: r1,
            reserved2: r2,
            reserved3: 0,
        };
        section.sectname[..sectname.len()].copy_from_slice(sectname.as_bytes());
        section.segname[..segname.len()].copy_from_slice(segname.as_bytes());
        section
    }

    /// Serializes the binary.
    pub fn build(&self) -> Vec<u8> {
        let mut data = self.data.clone();

        let code_flags = S_REGULAR | S_ATTR_PURE_INSTRUCTIONS | S_ATTR_SOME_INSTRUCTIONS;
        let text_sections = vec![
            self.section("__TEXT", "__text", TEXT_ADDR, code_flags, 0, 0),
            self.section(
                "__TEXT",
                "__stubs",
                STUBS_ADDR,
                S_SYMBOL_STUBS | S_ATTR_PURE_INSTRUCTIONS | S_ATTR_SOME_INSTRUCTIONS,
                self.stubs_reserved1,
                0xC,
            ),
            self.section("__TEXT", "__cstring", CSTRING_ADDR, S_CSTRING_LITERALS, 0, 0),
            self.section("__TEXT", "__objc_methname", METHNAME_ADDR, S_CSTRING_LITERALS, 0, 0),
            self.section("__TEXT", "__objc_classname", CLASSNAME_ADDR, S_CSTRING_LITERALS, 0, 0),
        ];
        let data_sections = vec![
            self.section(
                "__DATA",
                "__la_symbol_ptr",
                LA_SYMBOL_PTR_ADDR,
                S_LAZY_SYMBOL_POINTERS,
                self.la_reserved1,
                0,
            ),
            self.section(
                "__DATA",
                "__got",
                GOT_ADDR,
                S_NON_LAZY_SYMBOL_POINTERS,
                self.got_reserved1,
                0,
            ),
            self.section("__DATA", "__objc_selrefs", SELREFS_ADDR, S_REGULAR, 0, 0),
            self.section("__DATA", "__objc_classrefs", CLASSREFS_ADDR, S_REGULAR, 0, 0),
            self.section("__DATA", "__objc_classlist", CLASSLIST_ADDR, S_REGULAR, 0, 0),
        ];

        let mut commands: Vec<u8> = Vec::new();

        // __TEXT
        push_segment(&mut commands, "__TEXT", VM_BASE, 0x4000, 0, 0x4000, 5, &text_sections);
        // __DATA
        push_segment(&mut commands, "__DATA", VM_BASE + 0x4000, 0x4000, 0x4000, 0x4000, 3, &data_sections);
        // __LINKEDIT
        push_segment(&mut commands, "__LINKEDIT", VM_BASE + 0x8000, 0x8000, 0x8000, 0x8000, 1, &[]);

        let mut ncmds = 3u32;

        let symtab = SymtabCommand {
            cmd: LC_SYMTAB,
            cmdsize: SymtabCommand::SIZE as u32,
            symoff: SYMTAB_OFF,
            nsyms: self.symbols.len() as u32,
            stroff: STRTAB_OFF,
            strsize: self.strtab.len() as u32,
        };
        commands.extend_from_slice(symtab.as_bytes());
        ncmds += 1;

        let dysymtab = DysymtabCommand {
            cmd: LC_DYSYMTAB,
            cmdsize: DysymtabCommand::SIZE as u32,
            indirectsymoff: INDIRECT_OFF,
            nindirectsyms: self.indirect.len() as u32,
            ..zeroed_dysymtab()
        };
        commands.extend_from_slice(dysymtab.as_bytes());
        ncmds += 1;

        if let Some((platform, minos)) = self.build_version {
            let bv = BuildVersionCommand {
                cmd: LC_BUILD_VERSION,
                cmdsize: BuildVersionCommand::SIZE as u32,
                platform,
                minos,
                sdk: minos,
                ntools: 0,
            };
            commands.extend_from_slice(bv.as_bytes());
            ncmds += 1;
        }

        if let Some(blob) = &self.code_signature {
            let lc = LinkeditDataCommand {
                cmd: LC_CODE_SIGNATURE,
                cmdsize: LinkeditDataCommand::SIZE as u32,
                dataoff: CODESIG_OFF,
                datasize: blob.len() as u32,
            };
            commands.extend_from_slice(lc.as_bytes());
            ncmds += 1;

            data[CODESIG_OFF as usize..CODESIG_OFF as usize + blob.len()].copy_from_slice(blob);
        }

        let header = MachHeader64 {
            magic: MH_MAGIC_64,
            cputype: CPU_TYPE_ARM64,
            cpusubtype: CPU_SUBTYPE_ARM64_ALL,
            filetype: MH_EXECUTE,
            ncmds,
            sizeofcmds: commands.len() as u32,
            flags: 0,
            reserved: 0,
        };

        data[..MachHeader64::SIZE].copy_from_slice(header.as_bytes());
        data[MachHeader64::SIZE..MachHeader64::SIZE + commands.len()].copy_from_slice(&commands);

        // LINKEDIT tables
        let mut off = SYMTAB_OFF as usize;
        for sym in &self.symbols {
            data[off..off + Nlist64::SIZE].copy_from_slice(sym.as_bytes());
            off += Nlist64::SIZE;
        }
        data[STRTAB_OFF as usize..STRTAB_OFF as usize + self.strtab.len()]
            .copy_from_slice(&self.strtab);
        let mut off = INDIRECT_OFF as usize;
        for &entry in &self.indirect {
            data[off..off + 4].copy_from_slice(&entry.to_le_bytes());
            off += 4;
        }

        data
    }
}

fn zeroed_dysymtab() -> DysymtabCommand {
    DysymtabCommand {
        cmd: LC_DYSYMTAB,
        cmdsize: DysymtabCommand::SIZE as u32,
        ilocalsym: 0,
        nlocalsym: 0,
        iextdefsym: 0,
        nextdefsym: 0,
        iundefsym: 0,
        nundefsym: 0,
        tocoff: 0,
        ntoc: 0,
        modtaboff: 0,
        nmodtab: 0,
        extrefsymoff: 0,
        nextrefsyms: 0,
        indirectsymoff: 0,
        nindirectsyms: 0,
        extreloff: 0,
        nextrel: 0,
        locreloff: 0,
        nlocrel: 0,
    }
}

fn push_segment(
    out: &mut Vec<u8>,
    name: &str,
    vmaddr: u64,
    vmsize: u64,
    fileoff: u64,
    filesize: u64,
    prot: u32,
    sections: &[Section64],
) {
    let mut seg = SegmentCommand64 {
        cmd: LC_SEGMENT_64,
        cmdsize: (SegmentCommand64::SIZE + sections.len() * Section64::SIZE) as u32,
        segname: [0; 16],
        vmaddr,
        vmsize,
        fileoff,
        filesize,
        maxprot: prot,
        initprot: prot,
        nsects: sections.len() as u32,
        flags: 0,
    };
    seg.segname[..name.len()].copy_from_slice(name.as_bytes());
    out.extend_from_slice(seg.as_bytes());
    for section in sections {
        out.extend_from_slice(section.as_bytes());
    }
}

/// Builds a code-signature SuperBlob containing one entitlements blob.
pub fn build_entitlements_blob(xml: &[u8]) -> Vec<u8> {
    const CSMAGIC_EMBEDDED_SIGNATURE: u32 = 0xFADE_0CC0;
    const CSMAGIC_EMBEDDED_ENTITLEMENTS: u32 = 0xFADE_7171;
    const CSSLOT_ENTITLEMENTS: u32 = 5;

    let ent_len = 8 + xml.len() as u32;
    let mut blob = Vec::new();
    blob.extend_from_slice(&CSMAGIC_EMBEDDED_SIGNATURE.to_be_bytes());
    blob.extend_from_slice(&(20 + ent_len).to_be_bytes());
    blob.extend_from_slice(&1u32.to_be_bytes());
    blob.extend_from_slice(&CSSLOT_ENTITLEMENTS.to_be_bytes());
    blob.extend_from_slice(&20u32.to_be_bytes());
    blob.extend_from_slice(&CSMAGIC_EMBEDDED_ENTITLEMENTS.to_be_bytes());
    blob.extend_from_slice(&ent_len.to_be_bytes());
    blob.extend_from_slice(xml);
    blob
}

/// Builds a minimal thin 32-bit ARMv7 Mach-O (header + one segment).
pub fn build_armv7_thin() -> Vec<u8> {
    let mut data = vec![0u8; 0x1000];

    let header = MachHeader32 {
        magic: MH_MAGIC,
        cputype: CPU_TYPE_ARM,
        cpusubtype: CPU_SUBTYPE_ARM_V7,
        filetype: MH_EXECUTE,
        ncmds: 1,
        sizeofcmds: SegmentCommand32::SIZE as u32,
        flags: 0,
    };
    data[..MachHeader32::SIZE].copy_from_slice(header.as_bytes());

    let mut seg = SegmentCommand32 {
        cmd: LC_SEGMENT,
        cmdsize: SegmentCommand32::SIZE as u32,
        segname: [0; 16],
        vmaddr: 0x4000,
        vmsize: 0x1000,
        fileoff: 0,
        filesize: 0x1000,
        maxprot: 5,
        initprot: 5,
        nsects: 0,
        flags: 0,
    };
    seg.segname[..6].copy_from_slice(b"__TEXT");
    data[MachHeader32::SIZE..MachHeader32::SIZE + SegmentCommand32::SIZE]
        .copy_from_slice(seg.as_bytes());

    data
}

/// Wraps thin slices into a 32-bit FAT archive, aligning each slice to
/// 0x4000.
pub fn build_fat(slices: &[&[u8]]) -> Vec<u8> {
    let mut offsets = Vec::new();
    let mut cursor = 0x4000u32;
    for slice in slices {
        offsets.push(cursor);
        cursor += ((slice.len() as u32 + 0x3FFF) / 0x4000) * 0x4000;
    }

    let mut data = vec![0u8; cursor as usize];
    data[0..4].copy_from_slice(&FAT_MAGIC.to_be_bytes());
    data[4..8].copy_from_slice(&(slices.len() as u32).to_be_bytes());

    let mut record_off = 8usize;
    for (slice, &offset) in slices.iter().zip(offsets.iter()) {
        let cputype = u32::from_le_bytes(slice[4..8].try_into().unwrap());
        let cpusubtype = u32::from_le_bytes(slice[8..12].try_into().unwrap());

        data[record_off..record_off + 4].copy_from_slice(&cputype.to_be_bytes());
        data[record_off + 4..record_off + 8].copy_from_slice(&cpusubtype.to_be_bytes());
        data[record_off + 8..record_off + 12].copy_from_slice(&offset.to_be_bytes());
        data[record_off + 12..record_off + 16].copy_from_slice(&(slice.len() as u32).to_be_bytes());
        data[record_off + 16..record_off + 20].copy_from_slice(&14u32.to_be_bytes());
        record_off += 20;

        data[offset as usize..offset as usize + slice.len()].copy_from_slice(slice);
    }

    data
}
