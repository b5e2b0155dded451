//! Mach-O file format handling.

pub mod binary;
pub mod codesign;
pub mod constants;
pub mod dyld_info;
pub mod fat;
pub mod structs;
pub mod symbols;

pub use binary::{LoadCommandInfo, MachBinary, SectionInfo, SegmentInfo};
pub use fat::{FatArchive, SliceDescriptor};
pub use structs::{Platform, Version};
pub use symbols::{Nlist, SymbolTable};
