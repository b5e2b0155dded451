//! Error types for Mach-O parsing and ARM64 analysis.
//!
//! Parsing errors (`NotAMachO`, `TruncatedBinary`) are fatal to the parse
//! call that raised them. Analysis errors are localized: a bad stub entry
//! only loses that stub, and undecodable bytes only lose the containing
//! function.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for Mach-O parsing and analysis operations.
#[derive(Error, Debug)]
pub enum Error {
    // ==================== I/O Errors ====================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to open file '{path}': {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to memory map file '{path}': {source}")]
    MemoryMap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ==================== Format Errors ====================
    #[error("not a Mach-O or FAT archive: magic {0:#010x}")]
    NotAMachO(u32),

    #[error(
        "truncated binary: read of {needed} bytes at offset {offset:#x} exceeds size {available:#x}"
    )]
    TruncatedBinary {
        offset: u64,
        needed: usize,
        available: u64,
    },

    #[error("unknown load command type: {0:#x}")]
    UnknownLoadCommand(u32),

    #[error("load command at offset {offset:#x} extends beyond header")]
    LoadCommandOverflow { offset: usize },

    #[error("Mach-O segment '{name}' not found")]
    SegmentNotFound { name: String },

    #[error("Mach-O section '{segment},{section}' not found")]
    SectionNotFound { segment: String, section: String },

    #[error("virtual address {addr:#x} not mapped by any segment")]
    UnmappedAddress { addr: u64 },

    #[error("cannot read encrypted range [{offset:#x}, {offset:#x}+{size:#x})")]
    EncryptedRange { offset: u64, size: u64 },

    // ==================== Symbol Errors ====================
    #[error("symbol table not found in Mach-O")]
    SymbolTableNotFound,

    #[error("string table offset {offset:#x} out of bounds (size: {size:#x})")]
    StringTableOverflow { offset: u32, size: u32 },

    #[error("inconsistent symbol table: {reason}")]
    InconsistentSymbolTable { reason: String },

    #[error("invalid ULEB128 at offset {offset:#x}")]
    InvalidUleb128 { offset: usize },

    // ==================== Analysis Errors ====================
    #[error("invalid ARM64 instruction at {addr:#x}: {word:#010x}")]
    InvalidBytecode { addr: u64, word: u32 },

    #[error("could not locate function boundary within {limit:#x} bytes of {addr:#x}")]
    FunctionBoundaryNotFound { addr: u64, limit: u64 },

    #[error("address {addr:#x} is not within the analyzed function")]
    AddressOutsideFunction { addr: u64 },

    // ==================== Objective-C Errors ====================
    #[error("invalid ObjC class at {addr:#x}")]
    InvalidObjcClass { addr: u64 },

    #[error("invalid ObjC method list at {addr:#x}")]
    InvalidObjcMethodList { addr: u64 },

    #[error("method list at {addr:#x} has ambiguous layout: {reason}")]
    AmbiguousLayout { addr: u64, reason: String },

    // ==================== Parse Errors ====================
    #[error("parse error at offset {offset:#x}: {reason}")]
    Parse { offset: usize, reason: String },
}

/// A specialized Result type for Mach-O parsing and analysis.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns true if this error indicates a recoverable condition.
    ///
    /// Recoverable errors are localized to one stub, method list, or
    /// function; callers log them and continue with the rest of the binary.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::UnknownLoadCommand(_)
                | Error::InconsistentSymbolTable { .. }
                | Error::InvalidBytecode { .. }
                | Error::InvalidObjcClass { .. }
                | Error::InvalidObjcMethodList { .. }
                | Error::AmbiguousLayout { .. }
                | Error::FunctionBoundaryNotFound { .. }
        )
    }

    /// Creates a parse error with a formatted message.
    #[inline]
    pub fn parse(offset: usize, reason: impl Into<String>) -> Self {
        Error::Parse {
            offset,
            reason: reason.into(),
        }
    }

    /// Creates a truncated-binary error.
    #[inline]
    pub fn truncated(offset: u64, needed: usize, available: u64) -> Self {
        Error::TruncatedBinary {
            offset,
            needed,
            available,
        }
    }
}
