//! The machine state: `(pc, registers, memory, halted, exit_code)`,
//! plus the `program_size` bookkeeping the driver loop needs for the
//! PC-out-of-bounds halt condition.

use std::io::Write;

use crate::decode::decode;
use crate::error::SimError;
use crate::exec::{self, Control};
use crate::memory::Memory;
use crate::register_file::RegisterFile;

#[derive(Debug)]
pub struct Cpu {
    pub registers: RegisterFile,
    pub memory: Memory,
    pub pc: u32,
    pub halted: bool,
    pub exit_code: i32,
    program_size: usize,
}

impl Cpu {
    /// A fresh machine with a zero-initialised memory of `memory_size`
    /// bytes, PC at 0, and every register at 0 (including x2 -- see
    /// DESIGN.md for why this implementation does not special-case
    /// the stack pointer).
    pub fn new(memory_size: usize) -> Self {
        Self {
            registers: RegisterFile::new(),
            memory: Memory::new(memory_size),
            pc: 0,
            halted: false,
            exit_code: 0,
            program_size: 0,
        }
    }

    /// Copy the program image into memory starting at address 0 and
    /// record its length for the PC-out-of-bounds halt check.
    pub fn load_program(&mut self, bytes: &[u8]) -> Result<(), SimError> {
        self.memory.load_image(bytes)?;
        self.program_size = bytes.len();
        Ok(())
    }

    /// Fetch, decode and execute exactly one instruction. `strict`
    /// selects whether a wholly unrecognised opcode is fatal or a
    /// diagnostic (§7, §9). On success, also applies the PC-out-of-bounds
    /// halt rule so callers get a single predicate (`cpu.halted`) to
    /// check the loop against.
    pub fn step(&mut self, out: &mut impl Write, strict: bool) -> Result<(), SimError> {
        if self.pc % 4 != 0 {
            return Err(SimError::MisalignedFetch(self.pc));
        }
        let word = self.memory.read_word(self.pc)?;
        let decoded = decode(word);
        let control = exec::execute(self, &decoded, out, strict)?;

        if control == Control::Halt {
            self.halted = true;
        } else if self.pc as usize >= self.program_size {
            self.halted = true;
        }
        Ok(())
    }
}
