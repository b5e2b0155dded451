//! Function boundary detection and basic-block partitioning.
//!
//! From an entry-point candidate the code is decoded linearly. The
//! function ends at the first `ret` (or unconditional branch) that leaves
//! no pending forward branch into not-yet-seen addresses; a conditional
//! branch over a `ret` keeps the scan alive until its destination has
//! been covered. A forward in-range `b` counts as a local goto, not an
//! exit, until an `ldp` restores the link register; after that epilogue
//! any unconditional branch leaves the function.

use std::rc::Rc;

use tracing::debug;

use crate::arm64::{self, Instr, INSTRUCTION_SIZE, REG_LR};
use crate::error::{Error, Result};
use crate::macho::binary::MachBinary;

use super::dataflow::{RegisterContents, RegisterFile};

/// Upper bound on the linear search for a function end.
pub const MAX_FUNCTION_SIZE: u64 = 0x10000;

/// A decoded function: its extent, instructions, and block partition.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    /// Entry point address
    pub entry: u64,
    /// First address past the function
    pub end: u64,
    /// Decoded instructions in address order
    pub instructions: Vec<(u64, Instr)>,
    /// Basic blocks as (start, end) pairs; sorted, disjoint, covering
    pub basic_blocks: Vec<(u64, u64)>,
}

/// Decodes the function starting at `entry` and partitions it into basic
/// blocks.
pub fn analyze_function(binary: &MachBinary, entry: u64) -> Result<FunctionInfo> {
    let section = binary
        .section_for_address(entry)
        .ok_or(Error::UnmappedAddress { addr: entry })?;

    // Never scan past the executable section holding the entry.
    let scan_limit = section.end_address().min(entry + MAX_FUNCTION_SIZE);

    let mut instructions = Vec::new();
    // Highest destination of a branch seen so far; while it lies ahead,
    // a ret cannot be the end of the function.
    let mut max_forward: u64 = 0;
    // Set once an ldp restores the link register; the epilogue has run,
    // so the next unconditional branch leaves the function.
    let mut lr_restored = false;
    let mut addr = entry;
    let mut end = None;

    while addr < scan_limit {
        let word = binary.read_u32_at_addr(addr)?;
        let instr = arm64::decode(word, addr)?;
        instructions.push((addr, instr));

        match instr {
            Instr::BCond { target }
            | Instr::Cbz { target, .. }
            | Instr::Cbnz { target, .. }
            | Instr::Tbz { target, .. }
            | Instr::Tbnz { target, .. } => {
                if target > addr && target < scan_limit {
                    max_forward = max_forward.max(target);
                }
            }
            Instr::Ldp { rt, rt2, .. } => {
                if rt == REG_LR || rt2 == REG_LR {
                    lr_restored = true;
                }
            }
            // A forward in-range b is an intra-function goto; it extends
            // the body rather than ending it. Once the link register has
            // been restored it is an epilogue tail jump instead.
            Instr::B { target } if !lr_restored && target > addr && target < scan_limit => {
                max_forward = max_forward.max(target);
            }
            Instr::Ret | Instr::B { .. } | Instr::Br { .. } => {
                if max_forward <= addr {
                    end = Some(addr + INSTRUCTION_SIZE);
                    break;
                }
            }
            _ => {}
        }

        addr += INSTRUCTION_SIZE;
    }

    let end = end.ok_or(Error::FunctionBoundaryNotFound {
        addr: entry,
        limit: MAX_FUNCTION_SIZE,
    })?;

    let basic_blocks = partition_blocks(entry, end, &instructions);

    debug!(
        entry = format_args!("{:#x}", entry),
        end = format_args!("{:#x}", end),
        blocks = basic_blocks.len(),
        "analyzed function"
    );

    Ok(FunctionInfo {
        entry,
        end,
        instructions,
        basic_blocks,
    })
}

/// Computes the basic-block partition of a decoded function.
///
/// Boundaries are the entry point, the instruction following any branch,
/// and the in-function destination of every direct branch (calls do not
/// split blocks).
fn partition_blocks(entry: u64, end: u64, instructions: &[(u64, Instr)]) -> Vec<(u64, u64)> {
    let mut starts = vec![entry];

    for &(addr, ref instr) in instructions {
        if addr >= end {
            break;
        }
        if instr.is_branch() {
            let follow = addr + INSTRUCTION_SIZE;
            if follow < end {
                starts.push(follow);
            }
        }
        if let Some(target) = instr.block_split_target() {
            if target >= entry && target < end {
                starts.push(target);
            }
        }
    }

    starts.sort_unstable();
    starts.dedup();

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let block_end = starts.get(i + 1).copied().unwrap_or(end);
            (start, block_end)
        })
        .collect()
}

/// Analyzer for one decoded function.
///
/// Wraps the cached [`FunctionInfo`] and answers per-instruction register
/// queries by forward constant propagation from the containing block's
/// entry.
#[derive(Debug, Clone)]
pub struct FunctionAnalyzer<'a> {
    binary: &'a MachBinary,
    info: Rc<FunctionInfo>,
}

impl<'a> FunctionAnalyzer<'a> {
    /// Wraps a decoded function.
    pub fn new(binary: &'a MachBinary, info: Rc<FunctionInfo>) -> Self {
        Self { binary, info }
    }

    /// Returns the binary this function belongs to.
    #[inline]
    pub fn binary(&self) -> &'a MachBinary {
        self.binary
    }

    /// Entry point address.
    #[inline]
    pub fn entry(&self) -> u64 {
        self.info.entry
    }

    /// First address past the function.
    #[inline]
    pub fn end(&self) -> u64 {
        self.info.end
    }

    /// Decoded instructions in address order.
    #[inline]
    pub fn instructions(&self) -> &[(u64, Instr)] {
        &self.info.instructions
    }

    /// Basic blocks as (start, end) pairs.
    #[inline]
    pub fn basic_blocks(&self) -> &[(u64, u64)] {
        &self.info.basic_blocks
    }

    /// Returns the basic block containing an address.
    pub fn block_containing(&self, addr: u64) -> Option<(u64, u64)> {
        self.info
            .basic_blocks
            .iter()
            .find(|&&(start, end)| addr >= start && addr < end)
            .copied()
    }

    /// Reconstructs the register file as it stands when control reaches
    /// `addr`, before that instruction executes.
    pub fn register_file_at(&self, addr: u64) -> Result<RegisterFile> {
        let (block_start, _) = self
            .block_containing(addr)
            .ok_or(Error::AddressOutsideFunction { addr })?;

        // Entry block inherits the calling convention; every other block
        // starts unknown, which keeps the analysis fixpoint-free.
        let mut file = if block_start == self.info.entry {
            RegisterFile::function_entry()
        } else {
            RegisterFile::unknown()
        };

        for &(insn_addr, ref instr) in &self.info.instructions {
            if insn_addr < block_start {
                continue;
            }
            if insn_addr >= addr {
                break;
            }
            file.apply(instr);
        }

        Ok(file)
    }

    /// Returns what is known about `register` when control reaches the
    /// instruction at `addr`.
    pub fn get_register_contents_at_instruction(
        &self,
        register: u8,
        addr: u64,
    ) -> Result<RegisterContents> {
        Ok(self.register_file_at(addr)?.get(register))
    }
}
