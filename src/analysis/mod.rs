//! Symbolic and dataflow analysis over parsed ARM64 slices.
//!
//! The layer splits into two phases. [`MachAnalyzer`] answers symbol,
//! Objective-C, and per-function queries with lazily built caches.
//! [`XrefAnalyzer`], obtained through [`MachAnalyzer::compute_xrefs`],
//! additionally answers cross-reference queries; its existence proves the
//! whole-binary XRef pass has run.

pub mod analyzer;
pub mod dataflow;
pub mod function;
pub mod objc;
pub mod stubs;
pub mod xref;

pub use analyzer::MachAnalyzer;
pub use dataflow::{RegisterContents, RegisterFile};
pub use function::{FunctionAnalyzer, FunctionInfo};
pub use objc::{ObjcClass, ObjcClassKind, ObjcIvar, ObjcRuntime, ObjcSelector};
pub use stubs::{StubEntry, StubResolver};
pub use xref::{CallSite, StringXref, XrefAnalyzer};
