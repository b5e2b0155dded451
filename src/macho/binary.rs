//! One-slice Mach-O parser.
//!
//! `MachBinary` parses the header and load commands of a single Mach-O
//! slice and exposes segments, sections, symbol tables, version metadata,
//! and bounds-checked reads by file offset or virtual address. The value
//! is immutable after construction; analyzers are layered on top of it
//! and never write back.

use std::collections::HashMap;

use tracing::{debug, warn};
use zerocopy::FromBytes;

use super::codesign;
use super::constants::*;
use super::structs::*;
use super::symbols::SymbolTable;
use crate::error::{Error, Result};
use crate::util;

// =============================================================================
// Segment Info
// =============================================================================

/// Parsed segment information, widened to 64-bit fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentInfo {
    /// Segment name
    pub name: String,
    /// Virtual memory address
    pub vmaddr: u64,
    /// Virtual memory size
    pub vmsize: u64,
    /// File offset
    pub fileoff: u64,
    /// Amount of file mapped
    pub filesize: u64,
    /// Maximum VM protection
    pub maxprot: u32,
    /// Initial VM protection
    pub initprot: u32,
    /// Segment flags
    pub flags: u32,
    /// Offset of the segment command in the slice
    pub command_offset: usize,
    /// Sections in this segment
    pub sections: Vec<SectionInfo>,
}

impl SegmentInfo {
    /// Returns a section by name.
    pub fn section(&self, name: &str) -> Option<&SectionInfo> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Returns true if this segment's VM range contains the address.
    #[inline]
    pub fn contains_addr(&self, addr: u64) -> bool {
        addr >= self.vmaddr && addr < self.vmaddr + self.vmsize
    }
}

/// Parsed section information, widened to 64-bit fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionInfo {
    /// Owning segment name
    pub segment_name: String,
    /// Section name
    pub name: String,
    /// Virtual memory address
    pub addr: u64,
    /// Size in bytes
    pub size: u64,
    /// File offset
    pub offset: u32,
    /// Alignment (power of 2)
    pub align: u32,
    /// Flags (type and attributes)
    pub flags: u32,
    /// Indirect symbol table start index for pointer/stub sections
    pub reserved1: u32,
    /// Stub size in bytes for stub sections
    pub reserved2: u32,
    /// Offset of the section structure in the slice
    pub struct_offset: usize,
}

impl SectionInfo {
    /// Returns the full name (segment,section).
    pub fn full_name(&self) -> String {
        format!("{},{}", self.segment_name, self.name)
    }

    /// First address past the section.
    #[inline]
    pub fn end_address(&self) -> u64 {
        self.addr + self.size
    }

    /// Returns the section type.
    #[inline]
    pub fn section_type(&self) -> u32 {
        self.flags & SECTION_TYPE
    }

    /// Returns true if the section occupies no file bytes.
    #[inline]
    pub fn is_zerofill(&self) -> bool {
        self.section_type() == S_ZEROFILL
    }

    /// Returns true if this section holds machine instructions.
    #[inline]
    pub fn is_executable(&self) -> bool {
        (self.flags & (S_ATTR_PURE_INSTRUCTIONS | S_ATTR_SOME_INSTRUCTIONS)) != 0
    }

    /// Returns true if this section is joined to the indirect symbol table.
    #[inline]
    pub fn has_indirect_symbols(&self) -> bool {
        matches!(
            self.section_type(),
            S_NON_LAZY_SYMBOL_POINTERS
                | S_LAZY_SYMBOL_POINTERS
                | S_SYMBOL_STUBS
                | S_LAZY_DYLIB_SYMBOL_POINTERS
        )
    }

    /// Returns true if this section's VM range contains the address.
    #[inline]
    pub fn contains_addr(&self, addr: u64) -> bool {
        addr >= self.addr && addr < self.end_address()
    }
}

// =============================================================================
// Load Command Info
// =============================================================================

/// Parsed load command information.
///
/// The variant names correspond to the load command types. Unrecognized
/// commands are recorded as `Unknown` and are never fatal.
#[derive(Debug, Clone)]
#[allow(missing_docs)] // Variants are self-documenting via names
pub enum LoadCommandInfo {
    Segment(SegmentInfo),
    Symtab {
        command: SymtabCommand,
        offset: usize,
    },
    Dysymtab {
        command: DysymtabCommand,
        offset: usize,
    },
    DyldInfo {
        command: DyldInfoCommand,
        offset: usize,
    },
    LinkeditData {
        command: LinkeditDataCommand,
        offset: usize,
    },
    Dylib {
        command: DylibCommand,
        name: String,
        offset: usize,
    },
    Uuid {
        command: UuidCommand,
        offset: usize,
    },
    BuildVersion {
        command: BuildVersionCommand,
        tools: Vec<BuildToolVersion>,
        offset: usize,
    },
    VersionMin {
        command: VersionMinCommand,
        platform: Platform,
        offset: usize,
    },
    EncryptionInfo {
        cryptoff: u32,
        cryptsize: u32,
        cryptid: u32,
        offset: usize,
    },
    EntryPoint {
        command: EntryPointCommand,
        offset: usize,
    },
    Unknown {
        cmd: u32,
        cmdsize: u32,
        offset: usize,
    },
}

// =============================================================================
// Mach Binary
// =============================================================================

/// A parsed Mach-O slice.
///
/// Construction walks the header and every load command once; all derived
/// tables hold offsets into the slice bytes owned by this value.
#[derive(Debug)]
pub struct MachBinary {
    /// Magic value the slice was recognized by
    pub magic: u32,
    /// CPU type from the header
    pub cputype: u32,
    /// CPU subtype from the header
    pub cpusubtype: u32,
    /// File type from the header
    pub filetype: u32,
    /// Header flags
    pub flags: MachOFlags,
    /// True for 64-bit slices
    pub is_64: bool,
    /// True when the slice is stored in reversed byte order
    pub is_swap: bool,
    file_offset_within_fat: u64,
    data: Vec<u8>,
    load_commands: Vec<LoadCommandInfo>,
    segment_indices: HashMap<String, usize>,
    symbol_table: Option<SymbolTable>,
    warnings: Vec<Error>,
}

impl MachBinary {
    /// Parses a Mach-O slice from raw bytes.
    ///
    /// `file_offset_within_fat` records where the slice sits in its
    /// containing file (0 for thin binaries).
    pub fn parse(data: &[u8], file_offset_within_fat: u64) -> Result<Self> {
        if data.len() < 4 {
            return Err(Error::truncated(0, 4, data.len() as u64));
        }

        let magic = util::read_u32_le(data);
        let (is_64, is_swap) = match magic {
            MH_MAGIC_64 => (true, false),
            MH_CIGAM_64 => (true, true),
            MH_MAGIC => (false, false),
            MH_CIGAM => (false, true),
            other => return Err(Error::NotAMachO(other)),
        };

        let header_size = if is_64 {
            MachHeader64::SIZE
        } else {
            MachHeader32::SIZE
        };
        if data.len() < header_size {
            return Err(Error::truncated(0, header_size, data.len() as u64));
        }

        // Normalize both widths into the 64-bit header fields.
        let (cputype, cpusubtype, filetype, ncmds, sizeofcmds, raw_flags) = if is_64 {
            let mut header = MachHeader64::read_from_prefix(data)
                .map_err(|_| Error::parse(0, "failed to parse Mach-O header"))?
                .0;
            if is_swap {
                header = header.byte_swapped();
            }
            (
                header.cputype,
                header.cpusubtype,
                header.filetype,
                header.ncmds,
                header.sizeofcmds,
                header.flags,
            )
        } else {
            let mut header = MachHeader32::read_from_prefix(data)
                .map_err(|_| Error::parse(0, "failed to parse Mach-O header"))?
                .0;
            if is_swap {
                header = header.byte_swapped();
            }
            (
                header.cputype,
                header.cpusubtype,
                header.filetype,
                header.ncmds,
                header.sizeofcmds,
                header.flags,
            )
        };

        let mut binary = Self {
            magic,
            cputype,
            cpusubtype,
            filetype,
            flags: MachOFlags::from_bits_retain(raw_flags),
            is_64,
            is_swap,
            file_offset_within_fat,
            data: data.to_vec(),
            load_commands: Vec::new(),
            segment_indices: HashMap::new(),
            symbol_table: None,
            warnings: Vec::new(),
        };

        binary.parse_load_commands(header_size, ncmds, sizeofcmds)?;
        binary.symbol_table = SymbolTable::parse(&binary)?;

        debug!(
            cputype = format_args!("{:#x}", cputype),
            ncmds,
            segments = binary.segment_indices.len(),
            "parsed Mach-O slice"
        );

        Ok(binary)
    }

    /// Parses all load commands.
    fn parse_load_commands(&mut self, start: usize, ncmds: u32, sizeofcmds: u32) -> Result<()> {
        let mut offset = start;
        let end_offset = start + sizeofcmds as usize;

        for _ in 0..ncmds {
            if offset + LoadCommand::SIZE > end_offset
                || offset + LoadCommand::SIZE > self.data.len()
            {
                return Err(Error::LoadCommandOverflow { offset });
            }

            let mut lc = LoadCommand::read_from_prefix(&self.data[offset..])
                .map_err(|_| Error::parse(offset, "failed to parse load command"))?
                .0;
            if self.is_swap {
                lc = lc.byte_swapped();
            }

            if (lc.cmdsize as usize) < LoadCommand::SIZE
                || offset + lc.cmdsize as usize > self.data.len()
            {
                return Err(Error::LoadCommandOverflow { offset });
            }

            let cmd_info = self.parse_load_command(lc.cmd, lc.cmdsize, offset)?;

            if let LoadCommandInfo::Segment(ref seg) = cmd_info {
                self.segment_indices
                    .insert(seg.name.clone(), self.load_commands.len());
            }
            if let LoadCommandInfo::Unknown { cmd, .. } = cmd_info {
                self.warnings.push(Error::UnknownLoadCommand(cmd));
            }

            self.load_commands.push(cmd_info);
            offset += lc.cmdsize as usize;
        }

        Ok(())
    }

    /// Parses a single load command at `offset`.
    fn parse_load_command(&self, cmd: u32, cmdsize: u32, offset: usize) -> Result<LoadCommandInfo> {
        let data = &self.data[offset..offset + cmdsize as usize];

        match cmd {
            LC_SEGMENT_64 if self.is_64 => self.parse_segment64(data, offset),
            LC_SEGMENT if !self.is_64 => self.parse_segment32(data, offset),

            LC_SYMTAB => {
                let mut command = SymtabCommand::read_from_prefix(data)
                    .map_err(|_| Error::parse(offset, "failed to parse symtab command"))?
                    .0;
                if self.is_swap {
                    command = command.byte_swapped();
                }
                Ok(LoadCommandInfo::Symtab { command, offset })
            }

            LC_DYSYMTAB => {
                let mut command = DysymtabCommand::read_from_prefix(data)
                    .map_err(|_| Error::parse(offset, "failed to parse dysymtab command"))?
                    .0;
                if self.is_swap {
                    command = command.byte_swapped();
                }
                Ok(LoadCommandInfo::Dysymtab { command, offset })
            }

            // The remaining typed commands postdate big-endian toolchains;
            // in a reversed-order slice they are recorded but not decoded.
            _ if self.is_swap => Ok(LoadCommandInfo::Unknown {
                cmd,
                cmdsize,
                offset,
            }),

            LC_DYLD_INFO | LC_DYLD_INFO_ONLY => {
                let command = DyldInfoCommand::read_from_prefix(data)
                    .map_err(|_| Error::parse(offset, "failed to parse dyld info command"))?
                    .0;
                Ok(LoadCommandInfo::DyldInfo { command, offset })
            }

            LC_CODE_SIGNATURE | LC_FUNCTION_STARTS | LC_DATA_IN_CODE | LC_DYLD_EXPORTS_TRIE
            | LC_DYLD_CHAINED_FIXUPS => {
                let command = LinkeditDataCommand::read_from_prefix(data)
                    .map_err(|_| Error::parse(offset, "failed to parse linkedit data command"))?
                    .0;
                Ok(LoadCommandInfo::LinkeditData { command, offset })
            }

            LC_LOAD_DYLIB | LC_LOAD_WEAK_DYLIB | LC_REEXPORT_DYLIB | LC_LAZY_LOAD_DYLIB
            | LC_LOAD_UPWARD_DYLIB | LC_ID_DYLIB => {
                let command = DylibCommand::read_from_prefix(data)
                    .map_err(|_| Error::parse(offset, "failed to parse dylib command"))?
                    .0;

                let name_offset = command.dylib.name_offset as usize;
                let name = if name_offset < data.len() {
                    util::read_cstr_lossy(&data[name_offset..])
                } else {
                    String::new()
                };

                Ok(LoadCommandInfo::Dylib {
                    command,
                    name,
                    offset,
                })
            }

            LC_UUID => {
                let command = UuidCommand::read_from_prefix(data)
                    .map_err(|_| Error::parse(offset, "failed to parse uuid command"))?
                    .0;
                Ok(LoadCommandInfo::Uuid { command, offset })
            }

            LC_BUILD_VERSION => {
                let command = BuildVersionCommand::read_from_prefix(data)
                    .map_err(|_| Error::parse(offset, "failed to parse build version command"))?
                    .0;

                let mut tools = Vec::with_capacity(command.ntools as usize);
                let mut tool_offset = BuildVersionCommand::SIZE;
                for _ in 0..command.ntools {
                    if tool_offset + BuildToolVersion::SIZE > data.len() {
                        break;
                    }
                    let tool = BuildToolVersion::read_from_prefix(&data[tool_offset..])
                        .map_err(|_| Error::parse(offset + tool_offset, "failed to parse tool version"))?
                        .0;
                    tools.push(tool);
                    tool_offset += BuildToolVersion::SIZE;
                }

                Ok(LoadCommandInfo::BuildVersion {
                    command,
                    tools,
                    offset,
                })
            }

            LC_VERSION_MIN_MACOSX | LC_VERSION_MIN_IPHONEOS | LC_VERSION_MIN_TVOS
            | LC_VERSION_MIN_WATCHOS => {
                let command = VersionMinCommand::read_from_prefix(data)
                    .map_err(|_| Error::parse(offset, "failed to parse version min command"))?
                    .0;
                let platform = match cmd {
                    LC_VERSION_MIN_MACOSX => Platform::MacOs,
                    LC_VERSION_MIN_IPHONEOS => Platform::Ios,
                    LC_VERSION_MIN_TVOS => Platform::TvOs,
                    _ => Platform::WatchOs,
                };
                Ok(LoadCommandInfo::VersionMin {
                    command,
                    platform,
                    offset,
                })
            }

            LC_ENCRYPTION_INFO | LC_ENCRYPTION_INFO_64 => {
                // Both widths share the leading cryptoff/cryptsize/cryptid fields.
                if data.len() < 20 {
                    return Err(Error::parse(offset, "failed to parse encryption info"));
                }
                Ok(LoadCommandInfo::EncryptionInfo {
                    cryptoff: util::read_u32_le(&data[8..]),
                    cryptsize: util::read_u32_le(&data[12..]),
                    cryptid: util::read_u32_le(&data[16..]),
                    offset,
                })
            }

            LC_MAIN => {
                let command = EntryPointCommand::read_from_prefix(data)
                    .map_err(|_| Error::parse(offset, "failed to parse entry point command"))?
                    .0;
                Ok(LoadCommandInfo::EntryPoint { command, offset })
            }

            _ => {
                debug!(cmd = format_args!("{:#x}", cmd), offset, "skipping unknown load command");
                Ok(LoadCommandInfo::Unknown {
                    cmd,
                    cmdsize,
                    offset,
                })
            }
        }
    }

    fn parse_segment64(&self, data: &[u8], offset: usize) -> Result<LoadCommandInfo> {
        let mut seg = SegmentCommand64::read_from_prefix(data)
            .map_err(|_| Error::parse(offset, "failed to parse segment command"))?
            .0;
        if self.is_swap {
            seg = seg.byte_swapped();
        }

        let name = util::read_cstr_lossy(&seg.segname);
        let mut sections = Vec::new();
        let mut sect_offset = SegmentCommand64::SIZE;

        for _ in 0..seg.nsects {
            if sect_offset + Section64::SIZE > data.len() {
                return Err(Error::parse(offset + sect_offset, "section table overruns segment command"));
            }
            let mut sect = Section64::read_from_prefix(&data[sect_offset..])
                .map_err(|_| Error::parse(offset + sect_offset, "failed to parse section"))?
                .0;
            if self.is_swap {
                sect = sect.byte_swapped();
            }

            sections.push(SectionInfo {
                segment_name: util::read_cstr_lossy(&sect.segname),
                name: util::read_cstr_lossy(&sect.sectname),
                addr: sect.addr,
                size: sect.size,
                offset: sect.offset,
                align: sect.align,
                flags: sect.flags,
                reserved1: sect.reserved1,
                reserved2: sect.reserved2,
                struct_offset: offset + sect_offset,
            });

            sect_offset += Section64::SIZE;
        }

        Ok(LoadCommandInfo::Segment(SegmentInfo {
            name,
            vmaddr: seg.vmaddr,
            vmsize: seg.vmsize,
            fileoff: seg.fileoff,
            filesize: seg.filesize,
            maxprot: seg.maxprot,
            initprot: seg.initprot,
            flags: seg.flags,
            command_offset: offset,
            sections,
        }))
    }

    fn parse_segment32(&self, data: &[u8], offset: usize) -> Result<LoadCommandInfo> {
        let mut seg = SegmentCommand32::read_from_prefix(data)
            .map_err(|_| Error::parse(offset, "failed to parse segment command"))?
            .0;
        if self.is_swap {
            seg = seg.byte_swapped();
        }

        let name = util::read_cstr_lossy(&seg.segname);
        let mut sections = Vec::new();
        let mut sect_offset = SegmentCommand32::SIZE;

        for _ in 0..seg.nsects {
            if sect_offset + Section32::SIZE > data.len() {
                return Err(Error::parse(offset + sect_offset, "section table overruns segment command"));
            }
            let mut sect = Section32::read_from_prefix(&data[sect_offset..])
                .map_err(|_| Error::parse(offset + sect_offset, "failed to parse section"))?
                .0;
            if self.is_swap {
                sect = sect.byte_swapped();
            }

            sections.push(SectionInfo {
                segment_name: util::read_cstr_lossy(&sect.segname),
                name: util::read_cstr_lossy(&sect.sectname),
                addr: sect.addr as u64,
                size: sect.size as u64,
                offset: sect.offset,
                align: sect.align,
                flags: sect.flags,
                reserved1: sect.reserved1,
                reserved2: sect.reserved2,
                struct_offset: offset + sect_offset,
            });

            sect_offset += Section32::SIZE;
        }

        Ok(LoadCommandInfo::Segment(SegmentInfo {
            name,
            vmaddr: seg.vmaddr as u64,
            vmsize: seg.vmsize as u64,
            fileoff: seg.fileoff as u64,
            filesize: seg.filesize as u64,
            maxprot: seg.maxprot,
            initprot: seg.initprot,
            flags: seg.flags,
            command_offset: offset,
            sections,
        }))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the slice size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the slice is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the raw slice bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns where this slice sits within its containing FAT file.
    #[inline]
    pub fn file_offset_within_fat(&self) -> u64 {
        self.file_offset_within_fat
    }

    /// Returns true if this is an ARM64 slice.
    #[inline]
    pub fn is_arm64(&self) -> bool {
        self.cputype == CPU_TYPE_ARM64
    }

    /// Returns true if this is a 32-bit ARM slice.
    #[inline]
    pub fn is_armv7(&self) -> bool {
        self.cputype == CPU_TYPE_ARM
    }

    /// Returns the architecture as a string.
    pub fn arch_name(&self) -> &'static str {
        match self.cputype {
            CPU_TYPE_ARM64 => {
                if (self.cpusubtype & 0xFF) == CPU_SUBTYPE_ARM64E {
                    "arm64e"
                } else {
                    "arm64"
                }
            }
            CPU_TYPE_ARM => "armv7",
            CPU_TYPE_X86_64 => "x86_64",
            CPU_TYPE_X86 => "i386",
            _ => "unknown",
        }
    }

    /// Returns all parsed load commands.
    #[inline]
    pub fn load_commands(&self) -> &[LoadCommandInfo] {
        &self.load_commands
    }

    /// Returns the non-fatal diagnostics recorded during parsing, one
    /// [`Error::UnknownLoadCommand`] per command that was skipped.
    #[inline]
    pub fn warnings(&self) -> &[Error] {
        &self.warnings
    }

    /// Returns an iterator over all segments.
    pub fn segments(&self) -> impl Iterator<Item = &SegmentInfo> {
        self.load_commands.iter().filter_map(|lc| {
            if let LoadCommandInfo::Segment(seg) = lc {
                Some(seg)
            } else {
                None
            }
        })
    }

    /// Returns a segment by name.
    pub fn segment(&self, name: &str) -> Option<&SegmentInfo> {
        self.segment_indices.get(name).and_then(|&idx| {
            if let LoadCommandInfo::Segment(ref seg) = self.load_commands[idx] {
                Some(seg)
            } else {
                None
            }
        })
    }

    /// Returns an iterator over all sections of all segments.
    pub fn sections(&self) -> impl Iterator<Item = &SectionInfo> {
        self.segments().flat_map(|seg| seg.sections.iter())
    }

    /// Returns a section by segment and section name.
    pub fn section(&self, segment: &str, section: &str) -> Option<&SectionInfo> {
        self.segment(segment)?.section(section)
    }

    /// Returns the first section with the given name in any segment.
    ///
    /// Objective-C metadata moved from __DATA to __DATA_CONST/__DATA_DIRTY
    /// across toolchains, so runtime parsers look sections up by name alone.
    pub fn section_named(&self, name: &str) -> Option<&SectionInfo> {
        self.sections().find(|s| s.name == name)
    }

    /// Returns the section whose VM range contains `addr`.
    pub fn section_for_address(&self, addr: u64) -> Option<&SectionInfo> {
        self.sections().find(|s| s.contains_addr(addr))
    }

    /// Returns the symbol table command.
    pub fn symtab(&self) -> Option<&SymtabCommand> {
        self.load_commands.iter().find_map(|lc| {
            if let LoadCommandInfo::Symtab { command, .. } = lc {
                Some(command)
            } else {
                None
            }
        })
    }

    /// Returns the dynamic symbol table command.
    pub fn dysymtab(&self) -> Option<&DysymtabCommand> {
        self.load_commands.iter().find_map(|lc| {
            if let LoadCommandInfo::Dysymtab { command, .. } = lc {
                Some(command)
            } else {
                None
            }
        })
    }

    /// Returns the dyld info command.
    pub fn dyld_info(&self) -> Option<&DyldInfoCommand> {
        self.load_commands.iter().find_map(|lc| {
            if let LoadCommandInfo::DyldInfo { command, .. } = lc {
                Some(command)
            } else {
                None
            }
        })
    }

    /// Returns the code signature extent, if present.
    pub fn code_signature(&self) -> Option<&LinkeditDataCommand> {
        self.load_commands.iter().find_map(|lc| match lc {
            LoadCommandInfo::LinkeditData { command, .. } if command.cmd == LC_CODE_SIGNATURE => {
                Some(command)
            }
            _ => None,
        })
    }

    /// Returns the encrypted range as (cryptoff, cryptsize, cryptid).
    pub fn encryption_info(&self) -> Option<(u32, u32, u32)> {
        self.load_commands.iter().find_map(|lc| match lc {
            LoadCommandInfo::EncryptionInfo {
                cryptoff,
                cryptsize,
                cryptid,
                ..
            } => Some((*cryptoff, *cryptsize, *cryptid)),
            _ => None,
        })
    }

    /// Returns the ordered list of linked dylib install names.
    ///
    /// The order matters: dyld bind entries reference libraries by ordinal,
    /// which indexes this list starting at 1.
    pub fn linked_dylibs(&self) -> Vec<&str> {
        self.load_commands
            .iter()
            .filter_map(|lc| match lc {
                LoadCommandInfo::Dylib { command, name, .. }
                    if command.cmd != LC_ID_DYLIB =>
                {
                    Some(name.as_str())
                }
                _ => None,
            })
            .collect()
    }

    /// Resolves a dyld library ordinal to an install name.
    pub fn dylib_name_for_library_ordinal(&self, ordinal: u32) -> Option<&str> {
        if ordinal == 0 {
            return None;
        }
        self.linked_dylibs().get(ordinal as usize - 1).copied()
    }

    /// Returns the minimum deployment target from LC_BUILD_VERSION or a
    /// legacy LC_VERSION_MIN_* command.
    pub fn minimum_deployment_target(&self) -> Option<Version> {
        self.load_commands.iter().find_map(|lc| match lc {
            LoadCommandInfo::BuildVersion { command, .. } => Some(Version(command.minos)),
            LoadCommandInfo::VersionMin { command, .. } => Some(Version(command.version)),
            _ => None,
        })
    }

    /// Returns the build platform.
    pub fn build_platform(&self) -> Option<Platform> {
        self.load_commands.iter().find_map(|lc| match lc {
            LoadCommandInfo::BuildVersion { command, .. } => {
                Some(Platform::from_raw(command.platform))
            }
            LoadCommandInfo::VersionMin { platform, .. } => Some(*platform),
            _ => None,
        })
    }

    /// Returns the build tool versions recorded by LC_BUILD_VERSION.
    pub fn build_tool_versions(&self) -> Vec<(u32, Version)> {
        self.load_commands
            .iter()
            .find_map(|lc| match lc {
                LoadCommandInfo::BuildVersion { tools, .. } => Some(
                    tools
                        .iter()
                        .map(|t| (t.tool, Version(t.version)))
                        .collect(),
                ),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Returns the entitlements XML embedded in the code signature.
    pub fn entitlements_xml(&self) -> Option<Vec<u8>> {
        let sig = self.code_signature()?;
        match codesign::entitlements_from_superblob(self, sig.dataoff, sig.datasize) {
            Ok(xml) => xml,
            Err(e) => {
                warn!(error = %e, "failed to walk code signature superblob");
                None
            }
        }
    }

    /// Returns the parsed symbol table.
    #[inline]
    pub fn symbol_table(&self) -> Option<&SymbolTable> {
        self.symbol_table.as_ref()
    }

    /// Returns every decoded symbol table record.
    pub fn symbols(&self) -> &[crate::macho::symbols::Nlist] {
        self.symbol_table
            .as_ref()
            .map(|t| t.symbols())
            .unwrap_or(&[])
    }

    /// Returns imported (undefined external) symbol names.
    pub fn imported_symbols(&self) -> Vec<&str> {
        self.symbol_table
            .as_ref()
            .map(|t| t.imported_symbols())
            .unwrap_or_default()
    }

    /// Returns exported (defined external) symbol names.
    pub fn exported_symbols(&self) -> Vec<&str> {
        self.symbol_table
            .as_ref()
            .map(|t| t.exported_symbols())
            .unwrap_or_default()
    }

    /// Reads the indirect symbol table: an array of u32 indices into the
    /// external symbol table, located by the dysymtab command.
    pub fn indirect_symbol_table(&self) -> Result<Vec<u32>> {
        let dysymtab = match self.dysymtab() {
            Some(d) => *d,
            None => return Ok(Vec::new()),
        };

        let count = dysymtab.nindirectsyms as usize;
        let data = self.read_at(dysymtab.indirectsymoff as u64, count * 4)?;

        Ok(data
            .chunks_exact(4)
            .map(|c| {
                let v = util::read_u32_le(c);
                if self.is_swap { v.swap_bytes() } else { v }
            })
            .collect())
    }

    // =========================================================================
    // Raw Reads
    // =========================================================================

    /// Returns true if the binary has an encrypted segment.
    pub fn is_encrypted(&self) -> bool {
        matches!(self.encryption_info(), Some((_, _, cryptid)) if cryptid != 0)
    }

    /// Returns whether the byte range overlaps the encrypted region.
    pub fn is_range_encrypted(&self, offset: u64, size: usize) -> bool {
        match self.encryption_info() {
            Some((cryptoff, cryptsize, cryptid)) if cryptid != 0 => {
                let start = cryptoff as u64;
                let end = start + cryptsize as u64;
                offset < end && offset + size as u64 > start
            }
            _ => false,
        }
    }

    /// Reads `len` bytes at a file offset within the slice.
    pub fn read_at(&self, offset: u64, len: usize) -> Result<&[u8]> {
        let end = offset
            .checked_add(len as u64)
            .ok_or_else(|| Error::truncated(offset, len, self.data.len() as u64))?;
        if end > self.data.len() as u64 {
            return Err(Error::truncated(offset, len, self.data.len() as u64));
        }
        if self.is_range_encrypted(offset, len) {
            let (cryptoff, cryptsize, _) = self.encryption_info().unwrap_or((0, 0, 0));
            return Err(Error::EncryptedRange {
                offset: cryptoff as u64,
                size: cryptsize as u64,
            });
        }
        Ok(&self.data[offset as usize..end as usize])
    }

    /// Reads a u8 at a file offset.
    pub fn read_u8(&self, offset: u64) -> Result<u8> {
        Ok(self.read_at(offset, 1)?[0])
    }

    /// Reads a u16 at a file offset, honoring the slice byte order.
    pub fn read_u16(&self, offset: u64) -> Result<u16> {
        let v = util::read_u16_le(self.read_at(offset, 2)?);
        Ok(if self.is_swap { v.swap_bytes() } else { v })
    }

    /// Reads a u32 at a file offset, honoring the slice byte order.
    pub fn read_u32(&self, offset: u64) -> Result<u32> {
        let v = util::read_u32_le(self.read_at(offset, 4)?);
        Ok(if self.is_swap { v.swap_bytes() } else { v })
    }

    /// Reads a u64 at a file offset, honoring the slice byte order.
    pub fn read_u64(&self, offset: u64) -> Result<u64> {
        let v = util::read_u64_le(self.read_at(offset, 8)?);
        Ok(if self.is_swap { v.swap_bytes() } else { v })
    }

    /// Reads a pointer-width word at a file offset.
    pub fn read_word(&self, offset: u64) -> Result<u64> {
        if self.is_64 {
            self.read_u64(offset)
        } else {
            Ok(self.read_u32(offset)? as u64)
        }
    }

    /// Pointer width in bytes for this slice.
    #[inline]
    pub fn word_size(&self) -> u64 {
        if self.is_64 { 8 } else { 4 }
    }

    // =========================================================================
    // Virtual Address Translation
    // =========================================================================

    /// Returns the first virtual address of the slice (the __TEXT base).
    pub fn virtual_base(&self) -> u64 {
        self.segment("__TEXT").map(|s| s.vmaddr).unwrap_or(0)
    }

    /// Converts a virtual address to a file offset within this slice.
    pub fn addr_to_offset(&self, addr: u64) -> Option<u64> {
        for seg in self.segments() {
            if seg.contains_addr(addr) {
                return Some(seg.fileoff + (addr - seg.vmaddr));
            }
        }
        None
    }

    /// Converts a file offset to a virtual address.
    pub fn offset_to_addr(&self, offset: u64) -> Option<u64> {
        for seg in self.segments() {
            if offset >= seg.fileoff && offset < seg.fileoff + seg.filesize {
                return Some(seg.vmaddr + (offset - seg.fileoff));
            }
        }
        None
    }

    /// Returns true if the address is mapped by any segment.
    pub fn contains_addr(&self, addr: u64) -> bool {
        self.segments().any(|seg| seg.contains_addr(addr))
    }

    /// Reads `len` bytes at a virtual address.
    pub fn read_at_addr(&self, addr: u64, len: usize) -> Result<&[u8]> {
        let offset = self
            .addr_to_offset(addr)
            .ok_or(Error::UnmappedAddress { addr })?;
        self.read_at(offset, len)
    }

    /// Reads a u32 at a virtual address.
    pub fn read_u32_at_addr(&self, addr: u64) -> Result<u32> {
        let offset = self
            .addr_to_offset(addr)
            .ok_or(Error::UnmappedAddress { addr })?;
        self.read_u32(offset)
    }

    /// Reads a u64 at a virtual address.
    pub fn read_u64_at_addr(&self, addr: u64) -> Result<u64> {
        let offset = self
            .addr_to_offset(addr)
            .ok_or(Error::UnmappedAddress { addr })?;
        self.read_u64(offset)
    }

    /// Reads a pointer-width word at a virtual address.
    pub fn read_word_at_addr(&self, addr: u64) -> Result<u64> {
        let offset = self
            .addr_to_offset(addr)
            .ok_or(Error::UnmappedAddress { addr })?;
        self.read_word(offset)
    }

    /// Reads the pointers stored in a section (for __objc_selrefs and
    /// friends). Returns parallel lists of slot addresses and the pointers
    /// stored in them.
    pub fn read_pointer_section(&self, name: &str) -> Result<(Vec<u64>, Vec<u64>)> {
        let section = match self.section_named(name) {
            Some(s) => s.clone(),
            None => return Ok((Vec::new(), Vec::new())),
        };

        if section.offset as u64 + section.size > self.data.len() as u64 {
            return Err(Error::truncated(
                section.offset as u64,
                section.size as usize,
                self.data.len() as u64,
            ));
        }

        let count = (section.size / self.word_size()) as usize;
        let mut slots = Vec::with_capacity(count);
        let mut pointers = Vec::with_capacity(count);

        for i in 0..count {
            let slot = section.addr + i as u64 * self.word_size();
            let value = self.read_word(section.offset as u64 + i as u64 * self.word_size())?;
            slots.push(slot);
            pointers.push(value & OBJC_PTR_MASK);
        }

        Ok((slots, pointers))
    }

    /// Reads a NUL-terminated string at a virtual address, replacing
    /// invalid UTF-8.
    pub fn string_at_addr(&self, addr: u64) -> Result<String> {
        let offset = self
            .addr_to_offset(addr)
            .ok_or(Error::UnmappedAddress { addr })?;

        // Bound the scan by the end of the mapped file range.
        let available = (self.data.len() as u64).saturating_sub(offset);
        if available == 0 {
            return Err(Error::truncated(offset, 1, self.data.len() as u64));
        }
        let data = self.read_at(offset, available as usize)?;
        Ok(util::read_cstr_lossy(data))
    }

    /// Reads a string literal at a virtual address, following a __cfstring
    /// constant through to its backing literal when the address points at
    /// one.
    pub fn read_string_at_address(&self, addr: u64) -> Result<String> {
        let mut target = addr;
        if let Some(section) = self.section_for_address(addr) {
            if section.name == "__cfstring" {
                let cf = CFString64::read_from_prefix(self.read_at_addr(addr, CFString64::SIZE)?)
                    .map_err(|_| Error::parse(addr as usize, "failed to parse CFString"))?
                    .0;
                target = cf.literal & OBJC_PTR_MASK;
            }
        }
        self.string_at_addr(target)
    }
}
