//! The simulator's typed error taxonomy.
//!
//! Kind 1 (load-time) and kind 3 (fatal runtime) errors from the
//! spec's error-handling design both live here: both stop the
//! simulation, and both are rendered to text only by the driver.
//! Kind 2 (runtime diagnostics) are not represented as `SimError`
//! variants at all -- they never stop anything, so they are emitted
//! through `log::warn!` at the point they are detected instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to read program image {path}: {source}")]
    ProgramRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("program image is {size} bytes, which exceeds memory size {limit}")]
    ProgramTooLarge { size: usize, limit: usize },

    #[error("failed to read expected-results file {path}: {source}")]
    ResultsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "expected-results file {path} is {size} bytes, but must be exactly 128 (32 little-endian words)"
    )]
    ResultsSize { path: PathBuf, size: usize },

    #[error("bus error: {width}-byte access at address 0x{addr:08x} is out of range (memory size is {memory_size} bytes)")]
    BusError {
        addr: u32,
        width: u8,
        memory_size: usize,
    },

    #[error("program counter 0x{0:08x} is not a multiple of 4")]
    MisalignedFetch(u32),

    #[error("unknown opcode 0x{opcode:02x} at pc 0x{pc:08x} (strict mode halts on unrecognised instructions)")]
    UnknownOpcode { opcode: u8, pc: u32 },

    #[error("failed to write simulated program output: {0}")]
    Output(#[from] std::io::Error),
}
