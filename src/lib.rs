//! armlens - static analysis of Mach-O binaries targeting ARM64.
//!
//! This library ingests a Mach-O file (a thin slice or a FAT archive),
//! exposes its structural metadata, and performs symbolic and dataflow
//! analysis over its ARM64 code.
//!
//! # Features
//!
//! - FAT dispatch and per-slice structural parsing (segments, sections,
//!   symbol tables, versions, entitlements)
//! - Imported-symbol resolution through the stub/indirect-table join and
//!   the dyld bind streams
//! - Objective-C runtime inspection (classes, categories, protocols,
//!   selrefs/classrefs, absolute and relative method lists)
//! - Function boundary detection, basic-block partitioning, and
//!   per-instruction register constant propagation
//! - A whole-binary cross-reference index: callers, Objective-C message
//!   sends, and string-literal loads
//!
//! # Example
//!
//! ```no_run
//! use armlens::{FatArchive, MachAnalyzer};
//!
//! fn main() -> armlens::Result<()> {
//!     let archive = FatArchive::open("/path/to/binary")?;
//!     let slice = archive.arm64_slice().expect("no ARM64 slice");
//!
//!     let analyzer = MachAnalyzer::for_slice(slice);
//!     for class in analyzer.objc_classes()? {
//!         println!("{} ({} selectors)", class.name, class.selectors.len());
//!     }
//!
//!     let xrefs = analyzer.compute_xrefs()?;
//!     for (site, literal) in xrefs.string_xrefs_to("session") {
//!         println!("loaded at {site:#x} from {literal:#x}");
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod arm64;
pub mod error;
pub mod macho;
pub mod util;

// Re-export main types
pub use analysis::{
    CallSite, FunctionAnalyzer, MachAnalyzer, ObjcClass, ObjcSelector, RegisterContents,
    StringXref, XrefAnalyzer,
};
pub use error::{Error, Result};
pub use macho::{FatArchive, MachBinary, Platform, SliceDescriptor, Version};

use std::path::Path;

/// Parses a Mach-O or FAT file from disk.
///
/// Convenience wrapper around [`FatArchive::open`].
pub fn parse<P: AsRef<Path>>(path: P) -> Result<FatArchive> {
    FatArchive::open(path)
}
