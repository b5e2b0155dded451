//! Mach-O binary structures.
//!
//! These structures match the on-disk format of Mach-O files. Each logical
//! structure that exists in both pointer widths has a 32-bit and a 64-bit
//! concrete layout; `MachBinary` selects one from the header magic and
//! widens fields to u64 at the access layer.
//!
//! Reversed-magic (big-endian) slices are handled by reading the native
//! layout and swapping every field via [`ByteSwap`]. Only the structures
//! that can appear in big-endian binaries implement it; the compressed
//! dyld-info and build-version commands postdate every big-endian
//! toolchain.

use std::fmt;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::constants::*;

/// Field-wise byte swapping for reversed-magic slices.
pub trait ByteSwap {
    /// Returns a copy of the structure with every field byte-swapped.
    fn byte_swapped(&self) -> Self;
}

// =============================================================================
// FAT Archive Structures (always big-endian on disk)
// =============================================================================

/// FAT archive header.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct FatHeader {
    /// FAT_MAGIC or FAT_MAGIC_64
    pub magic: u32,
    /// Number of fat_arch records that follow
    pub nfat_arch: u32,
}

impl FatHeader {
    /// Size of the FAT header in bytes.
    pub const SIZE: usize = 8;
}

/// FAT architecture record with 32-bit offsets.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct FatArch32 {
    /// CPU type
    pub cputype: u32,
    /// CPU subtype
    pub cpusubtype: u32,
    /// File offset of the slice
    pub offset: u32,
    /// Size of the slice in bytes
    pub size: u32,
    /// Alignment (power of 2)
    pub align: u32,
}

impl FatArch32 {
    /// Size of a fat_arch record.
    pub const SIZE: usize = 20;
}

/// FAT architecture record with 64-bit offsets.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct FatArch64 {
    /// CPU type
    pub cputype: u32,
    /// CPU subtype
    pub cpusubtype: u32,
    /// File offset of the slice
    pub offset: u64,
    /// Size of the slice in bytes
    pub size: u64,
    /// Alignment (power of 2)
    pub align: u32,
    /// Reserved
    pub reserved: u32,
}

impl FatArch64 {
    /// Size of a fat_arch_64 record.
    pub const SIZE: usize = 32;
}

// =============================================================================
// Header Structures
// =============================================================================

/// 64-bit Mach-O header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct MachHeader64 {
    /// Magic number (MH_MAGIC_64)
    pub magic: u32,
    /// CPU type
    pub cputype: u32,
    /// CPU subtype
    pub cpusubtype: u32,
    /// File type
    pub filetype: u32,
    /// Number of load commands
    pub ncmds: u32,
    /// Size of load commands
    pub sizeofcmds: u32,
    /// Flags
    pub flags: u32,
    /// Reserved
    pub reserved: u32,
}

impl MachHeader64 {
    /// Size of the header in bytes.
    pub const SIZE: usize = 32;
}

/// 32-bit Mach-O header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct MachHeader32 {
    /// Magic number (MH_MAGIC)
    pub magic: u32,
    /// CPU type
    pub cputype: u32,
    /// CPU subtype
    pub cpusubtype: u32,
    /// File type
    pub filetype: u32,
    /// Number of load commands
    pub ncmds: u32,
    /// Size of load commands
    pub sizeofcmds: u32,
    /// Flags
    pub flags: u32,
}

impl MachHeader32 {
    /// Size of the header in bytes.
    pub const SIZE: usize = 28;
}

impl ByteSwap for MachHeader64 {
    fn byte_swapped(&self) -> Self {
        Self {
            magic: self.magic.swap_bytes(),
            cputype: self.cputype.swap_bytes(),
            cpusubtype: self.cpusubtype.swap_bytes(),
            filetype: self.filetype.swap_bytes(),
            ncmds: self.ncmds.swap_bytes(),
            sizeofcmds: self.sizeofcmds.swap_bytes(),
            flags: self.flags.swap_bytes(),
            reserved: self.reserved.swap_bytes(),
        }
    }
}

impl ByteSwap for MachHeader32 {
    fn byte_swapped(&self) -> Self {
        Self {
            magic: self.magic.swap_bytes(),
            cputype: self.cputype.swap_bytes(),
            cpusubtype: self.cpusubtype.swap_bytes(),
            filetype: self.filetype.swap_bytes(),
            ncmds: self.ncmds.swap_bytes(),
            sizeofcmds: self.sizeofcmds.swap_bytes(),
            flags: self.flags.swap_bytes(),
        }
    }
}

// =============================================================================
// Load Command Header
// =============================================================================

/// Generic load command header.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct LoadCommand {
    /// Type of load command
    pub cmd: u32,
    /// Size of load command
    pub cmdsize: u32,
}

impl LoadCommand {
    /// Size of the load command header.
    pub const SIZE: usize = 8;
}

impl ByteSwap for LoadCommand {
    fn byte_swapped(&self) -> Self {
        Self {
            cmd: self.cmd.swap_bytes(),
            cmdsize: self.cmdsize.swap_bytes(),
        }
    }
}

// =============================================================================
// Segment Commands
// =============================================================================

/// 64-bit segment command.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct SegmentCommand64 {
    /// LC_SEGMENT_64
    pub cmd: u32,
    /// Size of this load command
    pub cmdsize: u32,
    /// Segment name (16 bytes, null-padded)
    pub segname: [u8; 16],
    /// Virtual memory address
    pub vmaddr: u64,
    /// Virtual memory size
    pub vmsize: u64,
    /// File offset
    pub fileoff: u64,
    /// Amount of file to map
    pub filesize: u64,
    /// Maximum VM protection
    pub maxprot: u32,
    /// Initial VM protection
    pub initprot: u32,
    /// Number of sections
    pub nsects: u32,
    /// Flags
    pub flags: u32,
}

impl SegmentCommand64 {
    /// Size of the segment command (without sections).
    pub const SIZE: usize = 72;
}

impl ByteSwap for SegmentCommand64 {
    fn byte_swapped(&self) -> Self {
        Self {
            cmd: self.cmd.swap_bytes(),
            cmdsize: self.cmdsize.swap_bytes(),
            segname: self.segname,
            vmaddr: self.vmaddr.swap_bytes(),
            vmsize: self.vmsize.swap_bytes(),
            fileoff: self.fileoff.swap_bytes(),
            filesize: self.filesize.swap_bytes(),
            maxprot: self.maxprot.swap_bytes(),
            initprot: self.initprot.swap_bytes(),
            nsects: self.nsects.swap_bytes(),
            flags: self.flags.swap_bytes(),
        }
    }
}

/// 32-bit segment command.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct SegmentCommand32 {
    /// LC_SEGMENT
    pub cmd: u32,
    /// Size of this load command
    pub cmdsize: u32,
    /// Segment name (16 bytes, null-padded)
    pub segname: [u8; 16],
    /// Virtual memory address
    pub vmaddr: u32,
    /// Virtual memory size
    pub vmsize: u32,
    /// File offset
    pub fileoff: u32,
    /// Amount of file to map
    pub filesize: u32,
    /// Maximum VM protection
    pub maxprot: u32,
    /// Initial VM protection
    pub initprot: u32,
    /// Number of sections
    pub nsects: u32,
    /// Flags
    pub flags: u32,
}

impl SegmentCommand32 {
    /// Size of the segment command (without sections).
    pub const SIZE: usize = 56;
}

impl ByteSwap for SegmentCommand32 {
    fn byte_swapped(&self) -> Self {
        Self {
            cmd: self.cmd.swap_bytes(),
            cmdsize: self.cmdsize.swap_bytes(),
            segname: self.segname,
            vmaddr: self.vmaddr.swap_bytes(),
            vmsize: self.vmsize.swap_bytes(),
            fileoff: self.fileoff.swap_bytes(),
            filesize: self.filesize.swap_bytes(),
            maxprot: self.maxprot.swap_bytes(),
            initprot: self.initprot.swap_bytes(),
            nsects: self.nsects.swap_bytes(),
            flags: self.flags.swap_bytes(),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// 64-bit section.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct Section64 {
    /// Section name (16 bytes, null-padded)
    pub sectname: [u8; 16],
    /// Segment name (16 bytes, null-padded)
    pub segname: [u8; 16],
    /// Virtual memory address
    pub addr: u64,
    /// Size in bytes
    pub size: u64,
    /// File offset
    pub offset: u32,
    /// Alignment (power of 2)
    pub align: u32,
    /// File offset of relocation entries
    pub reloff: u32,
    /// Number of relocation entries
    pub nreloc: u32,
    /// Flags (type and attributes)
    pub flags: u32,
    /// Indirect symbol table start index for pointer/stub sections
    pub reserved1: u32,
    /// Stub size in bytes for stub sections
    pub reserved2: u32,
    /// Reserved
    pub reserved3: u32,
}

impl Section64 {
    /// Size of a section entry.
    pub const SIZE: usize = 80;
}

impl ByteSwap for Section64 {
    fn byte_swapped(&self) -> Self {
        Self {
            sectname: self.sectname,
            segname: self.segname,
            addr: self.addr.swap_bytes(),
            size: self.size.swap_bytes(),
            offset: self.offset.swap_bytes(),
            align: self.align.swap_bytes(),
            reloff: self.reloff.swap_bytes(),
            nreloc: self.nreloc.swap_bytes(),
            flags: self.flags.swap_bytes(),
            reserved1: self.reserved1.swap_bytes(),
            reserved2: self.reserved2.swap_bytes(),
            reserved3: self.reserved3.swap_bytes(),
        }
    }
}

/// 32-bit section.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct Section32 {
    /// Section name (16 bytes, null-padded)
    pub sectname: [u8; 16],
    /// Segment name (16 bytes, null-padded)
    pub segname: [u8; 16],
    /// Virtual memory address
    pub addr: u32,
    /// Size in bytes
    pub size: u32,
    /// File offset
    pub offset: u32,
    /// Alignment (power of 2)
    pub align: u32,
    /// File offset of relocation entries
    pub reloff: u32,
    /// Number of relocation entries
    pub nreloc: u32,
    /// Flags (type and attributes)
    pub flags: u32,
    /// Indirect symbol table start index for pointer/stub sections
    pub reserved1: u32,
    /// Stub size in bytes for stub sections
    pub reserved2: u32,
}

impl Section32 {
    /// Size of a section entry.
    pub const SIZE: usize = 68;
}

impl ByteSwap for Section32 {
    fn byte_swapped(&self) -> Self {
        Self {
            sectname: self.sectname,
            segname: self.segname,
            addr: self.addr.swap_bytes(),
            size: self.size.swap_bytes(),
            offset: self.offset.swap_bytes(),
            align: self.align.swap_bytes(),
            reloff: self.reloff.swap_bytes(),
            nreloc: self.nreloc.swap_bytes(),
            flags: self.flags.swap_bytes(),
            reserved1: self.reserved1.swap_bytes(),
            reserved2: self.reserved2.swap_bytes(),
        }
    }
}

// =============================================================================
// Symbol Table Commands
// =============================================================================

/// Symbol table command.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct SymtabCommand {
    /// LC_SYMTAB
    pub cmd: u32,
    /// Size of this load command
    pub cmdsize: u32,
    /// Symbol table offset
    pub symoff: u32,
    /// Number of symbol table entries
    pub nsyms: u32,
    /// String table offset
    pub stroff: u32,
    /// String table size in bytes
    pub strsize: u32,
}

impl SymtabCommand {
    /// Size of this command.
    pub const SIZE: usize = 24;
}

impl ByteSwap for SymtabCommand {
    fn byte_swapped(&self) -> Self {
        Self {
            cmd: self.cmd.swap_bytes(),
            cmdsize: self.cmdsize.swap_bytes(),
            symoff: self.symoff.swap_bytes(),
            nsyms: self.nsyms.swap_bytes(),
            stroff: self.stroff.swap_bytes(),
            strsize: self.strsize.swap_bytes(),
        }
    }
}

/// Dynamic symbol table command.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct DysymtabCommand {
    /// LC_DYSYMTAB
    pub cmd: u32,
    /// Size of this load command
    pub cmdsize: u32,
    /// Index of local symbols
    pub ilocalsym: u32,
    /// Number of local symbols
    pub nlocalsym: u32,
    /// Index of externally defined symbols
    pub iextdefsym: u32,
    /// Number of externally defined symbols
    pub nextdefsym: u32,
    /// Index of undefined symbols
    pub iundefsym: u32,
    /// Number of undefined symbols
    pub nundefsym: u32,
    /// File offset to table of contents
    pub tocoff: u32,
    /// Number of entries in table of contents
    pub ntoc: u32,
    /// File offset to module table
    pub modtaboff: u32,
    /// Number of module table entries
    pub nmodtab: u32,
    /// Offset to referenced symbol table
    pub extrefsymoff: u32,
    /// Number of referenced symbol table entries
    pub nextrefsyms: u32,
    /// File offset to the indirect symbol table
    pub indirectsymoff: u32,
    /// Number of indirect symbol table entries
    pub nindirectsyms: u32,
    /// Offset to external relocation entries
    pub extreloff: u32,
    /// Number of external relocation entries
    pub nextrel: u32,
    /// Offset to local relocation entries
    pub locreloff: u32,
    /// Number of local relocation entries
    pub nlocrel: u32,
}

impl DysymtabCommand {
    /// Size of this command.
    pub const SIZE: usize = 80;
}

impl ByteSwap for DysymtabCommand {
    fn byte_swapped(&self) -> Self {
        Self {
            cmd: self.cmd.swap_bytes(),
            cmdsize: self.cmdsize.swap_bytes(),
            ilocalsym: self.ilocalsym.swap_bytes(),
            nlocalsym: self.nlocalsym.swap_bytes(),
            iextdefsym: self.iextdefsym.swap_bytes(),
            nextdefsym: self.nextdefsym.swap_bytes(),
            iundefsym: self.iundefsym.swap_bytes(),
            nundefsym: self.nundefsym.swap_bytes(),
            tocoff: self.tocoff.swap_bytes(),
            ntoc: self.ntoc.swap_bytes(),
            modtaboff: self.modtaboff.swap_bytes(),
            nmodtab: self.nmodtab.swap_bytes(),
            extrefsymoff: self.extrefsymoff.swap_bytes(),
            nextrefsyms: self.nextrefsyms.swap_bytes(),
            indirectsymoff: self.indirectsymoff.swap_bytes(),
            nindirectsyms: self.nindirectsyms.swap_bytes(),
            extreloff: self.extreloff.swap_bytes(),
            nextrel: self.nextrel.swap_bytes(),
            locreloff: self.locreloff.swap_bytes(),
            nlocrel: self.nlocrel.swap_bytes(),
        }
    }
}

/// 64-bit symbol table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct Nlist64 {
    /// Index into string table
    pub n_strx: u32,
    /// Type flag
    pub n_type: u8,
    /// Section number or NO_SECT
    pub n_sect: u8,
    /// Flags (library ordinal for two-level imports)
    pub n_desc: u16,
    /// Value
    pub n_value: u64,
}

impl Nlist64 {
    /// Size of an nlist_64 entry.
    pub const SIZE: usize = 16;
}

impl ByteSwap for Nlist64 {
    fn byte_swapped(&self) -> Self {
        Self {
            n_strx: self.n_strx.swap_bytes(),
            n_type: self.n_type,
            n_sect: self.n_sect,
            n_desc: self.n_desc.swap_bytes(),
            n_value: self.n_value.swap_bytes(),
        }
    }
}

/// 32-bit symbol table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct Nlist32 {
    /// Index into string table
    pub n_strx: u32,
    /// Type flag
    pub n_type: u8,
    /// Section number or NO_SECT
    pub n_sect: u8,
    /// Flags
    pub n_desc: u16,
    /// Value
    pub n_value: u32,
}

impl Nlist32 {
    /// Size of an nlist entry.
    pub const SIZE: usize = 12;
}

impl ByteSwap for Nlist32 {
    fn byte_swapped(&self) -> Self {
        Self {
            n_strx: self.n_strx.swap_bytes(),
            n_type: self.n_type,
            n_sect: self.n_sect,
            n_desc: self.n_desc.swap_bytes(),
            n_value: self.n_value.swap_bytes(),
        }
    }
}

// =============================================================================
// Dyld Info Command
// =============================================================================

/// Dyld info command (compressed LINKEDIT information).
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct DyldInfoCommand {
    /// LC_DYLD_INFO or LC_DYLD_INFO_ONLY
    pub cmd: u32,
    /// Size of this load command
    pub cmdsize: u32,
    /// File offset to rebase info
    pub rebase_off: u32,
    /// Size of rebase info
    pub rebase_size: u32,
    /// File offset to binding info
    pub bind_off: u32,
    /// Size of binding info
    pub bind_size: u32,
    /// File offset to weak binding info
    pub weak_bind_off: u32,
    /// Size of weak binding info
    pub weak_bind_size: u32,
    /// File offset to lazy binding info
    pub lazy_bind_off: u32,
    /// Size of lazy binding info
    pub lazy_bind_size: u32,
    /// File offset to export info
    pub export_off: u32,
    /// Size of export info
    pub export_size: u32,
}

impl DyldInfoCommand {
    /// Size of this command.
    pub const SIZE: usize = 48;
}

// =============================================================================
// Linkedit Data Command
// =============================================================================

/// Generic linkedit data command (code signature, function starts, ...).
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct LinkeditDataCommand {
    /// Command type (LC_CODE_SIGNATURE, LC_FUNCTION_STARTS, etc.)
    pub cmd: u32,
    /// Size of this load command
    pub cmdsize: u32,
    /// File offset
    pub dataoff: u32,
    /// Size
    pub datasize: u32,
}

impl LinkeditDataCommand {
    /// Size of this command.
    pub const SIZE: usize = 16;
}

// =============================================================================
// Dylib Command
// =============================================================================

/// Dylib reference (shared by several load commands).
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct Dylib {
    /// Library's path name offset within the command
    pub name_offset: u32,
    /// Library's build timestamp
    pub timestamp: u32,
    /// Library's current version number
    pub current_version: u32,
    /// Library's compatibility version number
    pub compatibility_version: u32,
}

/// Dylib load command.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct DylibCommand {
    /// LC_LOAD_DYLIB, LC_ID_DYLIB, etc.
    pub cmd: u32,
    /// Total size (includes path string)
    pub cmdsize: u32,
    /// Library identification
    pub dylib: Dylib,
}

impl DylibCommand {
    /// Minimum size of this command (without path string).
    pub const SIZE: usize = 24;
}

// =============================================================================
// Version Commands
// =============================================================================

/// Build version command.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct BuildVersionCommand {
    /// LC_BUILD_VERSION
    pub cmd: u32,
    /// Size of this load command
    pub cmdsize: u32,
    /// Platform
    pub platform: u32,
    /// Minimum OS version (X.Y.Z packed into 32 bits)
    pub minos: u32,
    /// SDK version (X.Y.Z packed into 32 bits)
    pub sdk: u32,
    /// Number of tool entries following
    pub ntools: u32,
}

impl BuildVersionCommand {
    /// Size of this command (without tool entries).
    pub const SIZE: usize = 24;
}

/// Build tool version entry following a build version command.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct BuildToolVersion {
    /// Tool identifier (TOOL_CLANG, TOOL_LD, ...)
    pub tool: u32,
    /// Tool version (X.Y.Z packed into 32 bits)
    pub version: u32,
}

impl BuildToolVersion {
    /// Size of a tool entry.
    pub const SIZE: usize = 8;
}

/// Legacy version-min command (LC_VERSION_MIN_*).
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct VersionMinCommand {
    /// LC_VERSION_MIN_MACOSX, LC_VERSION_MIN_IPHONEOS, ...
    pub cmd: u32,
    /// Size of this load command
    pub cmdsize: u32,
    /// Minimum OS version (X.Y.Z packed into 32 bits)
    pub version: u32,
    /// SDK version (X.Y.Z packed into 32 bits)
    pub sdk: u32,
}

impl VersionMinCommand {
    /// Size of this command.
    pub const SIZE: usize = 16;
}

// =============================================================================
// UUID Command
// =============================================================================

/// UUID command.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct UuidCommand {
    /// LC_UUID
    pub cmd: u32,
    /// Size of this load command
    pub cmdsize: u32,
    /// UUID
    pub uuid: [u8; 16],
}

impl UuidCommand {
    /// Size of this command.
    pub const SIZE: usize = 24;
}

// =============================================================================
// Encryption Info Command
// =============================================================================

/// 64-bit encryption info command.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct EncryptionInfoCommand64 {
    /// LC_ENCRYPTION_INFO_64
    pub cmd: u32,
    /// Size of this load command
    pub cmdsize: u32,
    /// File offset of encrypted range
    pub cryptoff: u32,
    /// Size of encrypted range
    pub cryptsize: u32,
    /// Encryption system ID (0 = not encrypted yet)
    pub cryptid: u32,
    /// Padding
    pub pad: u32,
}

impl EncryptionInfoCommand64 {
    /// Size of this command.
    pub const SIZE: usize = 24;
}

// =============================================================================
// Entry Point Command
// =============================================================================

/// Main entry point command (LC_MAIN).
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct EntryPointCommand {
    /// LC_MAIN
    pub cmd: u32,
    /// Size of this load command
    pub cmdsize: u32,
    /// File offset of main() relative to __TEXT
    pub entryoff: u64,
    /// Initial stack size, if non-zero
    pub stacksize: u64,
}

impl EntryPointCommand {
    /// Size of this command.
    pub const SIZE: usize = 24;
}

// =============================================================================
// Objective-C Runtime Structures (64-bit)
// =============================================================================

/// objc_class as laid out in __objc_data.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct ObjcClassRaw64 {
    /// Metaclass pointer
    pub isa: u64,
    /// Superclass pointer
    pub superclass: u64,
    /// Method cache (runtime-owned)
    pub cache: u64,
    /// Vtable (runtime-owned)
    pub vtable: u64,
    /// class_ro_t pointer, low bits carry Swift/flag bits
    pub data: u64,
}

impl ObjcClassRaw64 {
    /// Size of an objc_class entry.
    pub const SIZE: usize = 40;
}

/// class_ro_t as referenced by an objc_class `data` pointer.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct ObjcDataRaw64 {
    /// Class flags
    pub flags: u32,
    /// Offset of the first ivar
    pub instance_start: u32,
    /// Instance size in bytes
    pub instance_size: u32,
    /// Reserved (64-bit only)
    pub reserved: u32,
    /// Ivar GC layout
    pub ivar_layout: u64,
    /// Class name pointer
    pub name: u64,
    /// method_list_t pointer
    pub base_methods: u64,
    /// protocol_list_t pointer
    pub base_protocols: u64,
    /// ivar_list_t pointer
    pub ivars: u64,
    /// Weak ivar GC layout
    pub weak_ivar_layout: u64,
    /// property_list_t pointer
    pub base_properties: u64,
}

impl ObjcDataRaw64 {
    /// Size of a class_ro_t entry.
    pub const SIZE: usize = 72;
}

/// category_t as referenced from __objc_catlist.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct ObjcCategoryRaw64 {
    /// Category name pointer
    pub name: u64,
    /// Base class pointer (or bound external)
    pub cls: u64,
    /// Instance method_list_t pointer
    pub instance_methods: u64,
    /// Class method_list_t pointer
    pub class_methods: u64,
    /// protocol_list_t pointer
    pub protocols: u64,
    /// property_list_t pointer
    pub instance_properties: u64,
}

impl ObjcCategoryRaw64 {
    /// Size of a category_t entry.
    pub const SIZE: usize = 48;
}

/// protocol_t as referenced from __objc_protolist.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct ObjcProtocolRaw64 {
    /// isa pointer (unused for protocols)
    pub isa: u64,
    /// Protocol name pointer
    pub name: u64,
    /// protocol_list_t of conformed protocols
    pub protocols: u64,
    /// Required instance method_list_t
    pub required_instance_methods: u64,
    /// Required class method_list_t
    pub required_class_methods: u64,
    /// Optional instance method_list_t
    pub optional_instance_methods: u64,
    /// Optional class method_list_t
    pub optional_class_methods: u64,
    /// property_list_t pointer
    pub instance_properties: u64,
}

impl ObjcProtocolRaw64 {
    /// Size of the protocol_t prefix read by the parser.
    pub const SIZE: usize = 64;
}

/// method_list_t header; method entries follow directly.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct ObjcMethodList {
    /// Entry size in the low bits, layout flags in the high bits
    pub entsize_and_flags: u32,
    /// Number of method entries
    pub methcount: u32,
}

impl ObjcMethodList {
    /// Size of the method list header.
    pub const SIZE: usize = 8;
}

/// Absolute-layout method entry (three pointers).
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct ObjcMethod64 {
    /// Selector name pointer
    pub name: u64,
    /// Type encoding pointer
    pub signature: u64,
    /// Implementation address
    pub implementation: u64,
}

impl ObjcMethod64 {
    /// Size of an absolute method entry.
    pub const SIZE: usize = 24;
}

/// Relative-layout method entry (three self-relative 32-bit offsets).
///
/// Each field is a signed offset from that field's own address. The name
/// field points at a selref, not at the selector literal itself.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct ObjcMethodRelative {
    /// Offset from this field to the selref
    pub name_offset: i32,
    /// Offset from this field to the type encoding
    pub signature_offset: i32,
    /// Offset from this field to the implementation
    pub implementation_offset: i32,
}

impl ObjcMethodRelative {
    /// Size of a relative method entry.
    pub const SIZE: usize = 12;
}

/// ivar_list_t header; ivar entries follow directly.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct ObjcIvarList {
    /// Entry size
    pub entsize: u32,
    /// Number of ivar entries
    pub ivarcount: u32,
}

impl ObjcIvarList {
    /// Size of the ivar list header.
    pub const SIZE: usize = 8;
}

/// ivar_t entry.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct ObjcIvar64 {
    /// Pointer to the 32-bit ivar offset slot
    pub offset_ptr: u64,
    /// Ivar name pointer
    pub name: u64,
    /// Type encoding pointer
    pub type_encoding: u64,
    /// Alignment (power of 2)
    pub alignment: u32,
    /// Size in bytes
    pub size: u32,
}

impl ObjcIvar64 {
    /// Size of an ivar entry.
    pub const SIZE: usize = 32;
}

/// CFString constant as laid out in __cfstring.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct CFString64 {
    /// Class pointer (___CFConstantStringClassReference)
    pub isa: u64,
    /// String flags
    pub flags: u64,
    /// Pointer to the backing literal
    pub literal: u64,
    /// Literal length in bytes
    pub length: u64,
}

impl CFString64 {
    /// Size of a CFString constant.
    pub const SIZE: usize = 32;
}

// =============================================================================
// Version / Platform
// =============================================================================

/// An OS or tool version packed X.Y.Z into 32 bits (16.8.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(pub u32);

impl Version {
    /// Creates a version from major/minor/patch components.
    pub const fn new(major: u16, minor: u8, patch: u8) -> Self {
        Self(((major as u32) << 16) | ((minor as u32) << 8) | patch as u32)
    }

    /// Major component.
    #[inline]
    pub const fn major(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// Minor component.
    #[inline]
    pub const fn minor(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    /// Patch component.
    #[inline]
    pub const fn patch(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}

/// Build platform from LC_BUILD_VERSION or a legacy LC_VERSION_MIN_* command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)] // Variants are self-documenting via names
pub enum Platform {
    MacOs,
    Ios,
    TvOs,
    WatchOs,
    BridgeOs,
    MacCatalyst,
    IosSimulator,
    Unknown(u32),
}

impl Platform {
    /// Maps an LC_BUILD_VERSION platform value.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            PLATFORM_MACOS => Platform::MacOs,
            PLATFORM_IOS => Platform::Ios,
            PLATFORM_TVOS => Platform::TvOs,
            PLATFORM_WATCHOS => Platform::WatchOs,
            PLATFORM_BRIDGEOS => Platform::BridgeOs,
            PLATFORM_MACCATALYST => Platform::MacCatalyst,
            PLATFORM_IOSSIMULATOR => Platform::IosSimulator,
            other => Platform::Unknown(other),
        }
    }
}

// =============================================================================
// Display Implementations
// =============================================================================

impl fmt::Display for MachHeader64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MachO {{ cputype: {:#x}, type: {:#x}, cmds: {}, flags: {:#x} }}",
            self.cputype, self.filetype, self.ncmds, self.flags
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_sizes() {
        assert_eq!(std::mem::size_of::<MachHeader64>(), MachHeader64::SIZE);
        assert_eq!(std::mem::size_of::<MachHeader32>(), MachHeader32::SIZE);
        assert_eq!(std::mem::size_of::<SegmentCommand64>(), SegmentCommand64::SIZE);
        assert_eq!(std::mem::size_of::<SegmentCommand32>(), SegmentCommand32::SIZE);
        assert_eq!(std::mem::size_of::<Section64>(), Section64::SIZE);
        assert_eq!(std::mem::size_of::<Section32>(), Section32::SIZE);
        assert_eq!(std::mem::size_of::<Nlist64>(), Nlist64::SIZE);
        assert_eq!(std::mem::size_of::<Nlist32>(), Nlist32::SIZE);
        assert_eq!(std::mem::size_of::<FatArch32>(), FatArch32::SIZE);
        assert_eq!(std::mem::size_of::<FatArch64>(), FatArch64::SIZE);
        assert_eq!(std::mem::size_of::<ObjcMethod64>(), ObjcMethod64::SIZE);
        assert_eq!(std::mem::size_of::<ObjcMethodRelative>(), ObjcMethodRelative::SIZE);
        assert_eq!(std::mem::size_of::<ObjcDataRaw64>(), ObjcDataRaw64::SIZE);
        assert_eq!(std::mem::size_of::<CFString64>(), CFString64::SIZE);
    }

    #[test]
    fn test_byte_swap_roundtrip() {
        let header = MachHeader64 {
            magic: MH_MAGIC_64,
            cputype: CPU_TYPE_ARM64,
            cpusubtype: 0,
            filetype: MH_EXECUTE,
            ncmds: 3,
            sizeofcmds: 0x200,
            flags: 0x0020_0085,
            reserved: 0,
        };
        assert_eq!(header.byte_swapped().byte_swapped(), header);
        assert_eq!(header.byte_swapped().magic, MH_CIGAM_64);
    }

    #[test]
    fn test_version_packing() {
        let v = Version::new(14, 2, 1);
        assert_eq!(v.major(), 14);
        assert_eq!(v.minor(), 2);
        assert_eq!(v.patch(), 1);
        assert_eq!(v.to_string(), "14.2.1");
        assert!(Version::new(14, 0, 0) > Version::new(13, 7, 9));
    }

    #[test]
    fn test_platform_mapping() {
        assert_eq!(Platform::from_raw(PLATFORM_IOS), Platform::Ios);
        assert_eq!(Platform::from_raw(99), Platform::Unknown(99));
    }
}
