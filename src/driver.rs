//! Loads a program image, drives the fetch-decode-execute loop to
//! completion, and (optionally) diffs the final register file against
//! a golden `.res` file. This is the layer a CLI binary wraps; see
//! `main.rs`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cpu::Cpu;
use crate::error::SimError;
use crate::memory::DEFAULT_MEMORY_SIZE;

/// Exactly 32 little-endian u32 words: register 0 first, register 31
/// last (§6).
const RESULTS_FILE_SIZE: usize = 32 * 4;

pub struct RunConfig {
    pub memory_size: usize,
    pub strict: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            strict: false,
        }
    }
}

pub struct RunOutcome {
    pub cpu: Cpu,
    pub error: Option<SimError>,
}

/// Load the flat binary image at `path` into a fresh `Cpu` and run it
/// to completion (§4.4, §4.5). A fatal error (bus-error, misaligned
/// fetch, strict-mode unknown opcode) stops the loop but still
/// returns the machine state reached so far, matching the spec's
/// "current register state is still dumped" requirement.
pub fn load_and_run(
    program_path: &Path,
    config: &RunConfig,
    out: &mut impl Write,
) -> Result<RunOutcome, SimError> {
    let bytes = fs::read(program_path).map_err(|source| SimError::ProgramRead {
        path: program_path.to_path_buf(),
        source,
    })?;

    let mut cpu = Cpu::new(config.memory_size);
    cpu.load_program(&bytes)?;

    let error = run_to_completion(&mut cpu, config.strict, out);
    Ok(RunOutcome { cpu, error })
}

fn run_to_completion(cpu: &mut Cpu, strict: bool, out: &mut impl Write) -> Option<SimError> {
    while !cpu.halted {
        if let Err(e) = cpu.step(out, strict) {
            return Some(e);
        }
    }
    None
}

/// Replace a trailing `.bin` extension with `.res`. If `program_path`
/// does not end in `.bin`, `.res` is appended instead.
pub fn derive_results_path(program_path: &Path) -> PathBuf {
    match program_path.to_str().and_then(|s| s.strip_suffix(".bin")) {
        Some(stem) => PathBuf::from(format!("{stem}.res")),
        None => {
            let mut p = program_path.to_path_buf();
            p.set_extension("res");
            p
        }
    }
}

/// Load a golden 32-register `.res` file (§6): 128 bytes, little-endian,
/// register 0 first.
pub fn load_expected_results(path: &Path) -> Result<[u32; 32], SimError> {
    let bytes = fs::read(path).map_err(|source| SimError::ResultsRead {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.len() != RESULTS_FILE_SIZE {
        return Err(SimError::ResultsSize {
            path: path.to_path_buf(),
            size: bytes.len(),
        });
    }
    let mut expected = [0u32; 32];
    for (i, chunk) in bytes.chunks_exact(4).enumerate() {
        expected[i] = u32::from_le_bytes(chunk.try_into().unwrap());
    }
    Ok(expected)
}

pub struct ComparisonReport {
    pub mismatches: Vec<(u8, u32, u32)>,
}

impl ComparisonReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Compare all 32 architectural registers against `expected`.
pub fn compare(cpu: &Cpu, expected: &[u32; 32]) -> ComparisonReport {
    let actual = cpu.registers.all();
    let mismatches = actual
        .iter()
        .zip(expected.iter())
        .enumerate()
        .filter(|(_, (a, e))| a != e)
        .map(|(i, (&a, &e))| (i as u8, a, e))
        .collect();
    ComparisonReport { mismatches }
}

/// Render the spec's end-of-run report: a header, the non-zero
/// registers, and -- when a comparison was performed -- a pass/fail
/// summary.
pub fn report(
    cpu: &Cpu,
    comparison: Option<&ComparisonReport>,
    out: &mut impl Write,
) -> std::io::Result<()> {
    writeln!(out, "=== simulation finished ===")?;
    writeln!(out, "final pc: 0x{:08x}", cpu.pc)?;
    write!(out, "{}", cpu.registers)?;

    if let Some(comparison) = comparison {
        if comparison.passed() {
            writeln!(out, "TEST PASSED")?;
        } else {
            for (i, actual, expected) in &comparison.mismatches {
                writeln!(
                    out,
                    "mismatch x{i}: got {actual} (0x{actual:08x}), expected {expected} (0x{expected:08x})"
                )?;
            }
            writeln!(out, "TEST FAILED")?;
        }
    }
    Ok(())
}
