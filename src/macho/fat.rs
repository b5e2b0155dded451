//! FAT archive dispatch.
//!
//! A FAT file is a big-endian header plus an array of per-architecture
//! slice records. A thin Mach-O is modeled as a one-slice archive at
//! offset 0, so callers walk both shapes the same way.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use tracing::{debug, warn};

use super::binary::MachBinary;
use super::constants::*;
use super::structs::{FatArch32, FatArch64, FatHeader};
use crate::error::{Error, Result};
use crate::util;

/// Descriptor of one slice within a FAT archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceDescriptor {
    /// CPU type
    pub cputype: u32,
    /// CPU subtype
    pub cpusubtype: u32,
    /// File offset of the slice
    pub offset: u64,
    /// Size of the slice in bytes
    pub size: u64,
    /// Alignment as a power of 2
    pub align: u32,
}

/// A parsed Mach-O file: one or more architecture slices.
#[derive(Debug)]
pub struct FatArchive {
    is_fat: bool,
    descriptors: Vec<SliceDescriptor>,
    slices: Vec<MachBinary>,
}

impl FatArchive {
    /// Opens and parses a Mach-O or FAT file from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::FileOpen {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MemoryMap {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&mmap)
    }

    /// Parses a Mach-O or FAT file from memory.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(Error::truncated(0, 4, data.len() as u64));
        }

        let magic_be = util::read_u32_be(data);
        let magic_le = util::read_u32_le(data);

        match magic_be {
            FAT_MAGIC => Self::parse_fat(data, false),
            FAT_MAGIC_64 => Self::parse_fat(data, true),
            _ => match magic_le {
                MH_MAGIC | MH_CIGAM | MH_MAGIC_64 | MH_CIGAM_64 => Self::parse_thin(data),
                other => Err(Error::NotAMachO(other)),
            },
        }
    }

    /// Wraps a thin Mach-O as a single-slice archive at offset 0.
    fn parse_thin(data: &[u8]) -> Result<Self> {
        let binary = MachBinary::parse(data, 0)?;
        let descriptor = SliceDescriptor {
            cputype: binary.cputype,
            cpusubtype: binary.cpusubtype,
            offset: 0,
            size: data.len() as u64,
            align: 0,
        };
        Ok(Self {
            is_fat: false,
            descriptors: vec![descriptor],
            slices: vec![binary],
        })
    }

    /// Parses the FAT header and every slice it describes.
    fn parse_fat(data: &[u8], wide: bool) -> Result<Self> {
        if data.len() < FatHeader::SIZE {
            return Err(Error::truncated(0, FatHeader::SIZE, data.len() as u64));
        }

        // All FAT header fields are stored big-endian.
        let nfat_arch = util::read_u32_be(&data[4..]);
        let record_size = if wide { FatArch64::SIZE } else { FatArch32::SIZE };

        let table_len = nfat_arch as usize * record_size;
        if FatHeader::SIZE + table_len > data.len() {
            return Err(Error::truncated(
                FatHeader::SIZE as u64,
                table_len,
                data.len() as u64,
            ));
        }

        let mut descriptors = Vec::with_capacity(nfat_arch as usize);
        let mut read_off = FatHeader::SIZE;
        for _ in 0..nfat_arch {
            let record = &data[read_off..read_off + record_size];
            let descriptor = if wide {
                SliceDescriptor {
                    cputype: util::read_u32_be(record),
                    cpusubtype: util::read_u32_be(&record[4..]),
                    offset: util::read_u64_be(&record[8..]),
                    size: util::read_u64_be(&record[16..]),
                    align: util::read_u32_be(&record[24..]),
                }
            } else {
                SliceDescriptor {
                    cputype: util::read_u32_be(record),
                    cpusubtype: util::read_u32_be(&record[4..]),
                    offset: util::read_u32_be(&record[8..]) as u64,
                    size: util::read_u32_be(&record[12..]) as u64,
                    align: util::read_u32_be(&record[16..]),
                }
            };

            let end = descriptor
                .offset
                .checked_add(descriptor.size)
                .ok_or_else(|| {
                    Error::truncated(descriptor.offset, descriptor.size as usize, data.len() as u64)
                })?;
            if end > data.len() as u64 {
                return Err(Error::truncated(
                    descriptor.offset,
                    descriptor.size as usize,
                    data.len() as u64,
                ));
            }

            descriptors.push(descriptor);
            read_off += record_size;
        }

        // Slices must not overlap one another.
        for (i, a) in descriptors.iter().enumerate() {
            for b in descriptors.iter().skip(i + 1) {
                if a.offset < b.offset + b.size && b.offset < a.offset + a.size {
                    warn!(
                        first = format_args!("{:#x}", a.offset),
                        second = format_args!("{:#x}", b.offset),
                        "overlapping FAT slices"
                    );
                }
            }
        }

        let mut slices = Vec::with_capacity(descriptors.len());
        for descriptor in &descriptors {
            let slice_data =
                &data[descriptor.offset as usize..(descriptor.offset + descriptor.size) as usize];
            slices.push(MachBinary::parse(slice_data, descriptor.offset)?);
        }

        debug!(slices = slices.len(), "parsed FAT archive");

        Ok(Self {
            is_fat: true,
            descriptors,
            slices,
        })
    }

    /// Returns true if the file was a FAT archive (not a thin Mach-O).
    #[inline]
    pub fn is_fat(&self) -> bool {
        self.is_fat
    }

    /// Returns the parsed slices in archive order.
    #[inline]
    pub fn slices(&self) -> &[MachBinary] {
        &self.slices
    }

    /// Returns the slice descriptors in archive order.
    #[inline]
    pub fn slice_descriptors(&self) -> &[SliceDescriptor] {
        &self.descriptors
    }

    /// Returns the ARM64 slice, if the archive contains one.
    pub fn arm64_slice(&self) -> Option<&MachBinary> {
        self.slices.iter().find(|s| s.is_arm64())
    }

    /// Returns the 32-bit ARM slice, if the archive contains one.
    pub fn armv7_slice(&self) -> Option<&MachBinary> {
        self.slices.iter().find(|s| s.is_armv7())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_rejected() {
        let data = [0x12u8, 0x34, 0x56, 0x78, 0, 0, 0, 0];
        match FatArchive::parse(&data) {
            Err(Error::NotAMachO(_)) => {}
            other => panic!("expected NotAMachO, got {:?}", other),
        }
    }

    #[test]
    fn test_fat_with_overlong_slice_rejected() {
        let mut data = Vec::new();
        data.extend_from_slice(&FAT_MAGIC.to_be_bytes());
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(&CPU_TYPE_ARM64.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&0x1000u32.to_be_bytes()); // offset past EOF
        data.extend_from_slice(&0x1000u32.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        assert!(matches!(
            FatArchive::parse(&data),
            Err(Error::TruncatedBinary { .. })
        ));
    }
}
