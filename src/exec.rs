//! Execution semantics for every supported RV32I opcode.
//!
//! `execute` dispatches a decoded instruction against a `Cpu`,
//! mutating its register file and memory, and returns the next
//! program counter. Unrecognised funct3/funct7/a7 combinations are
//! runtime diagnostics (§7 kind 2): they are logged with `log::warn!`
//! and treated as a no-op that still advances the PC by 4, rather
//! than propagated as an error. Only a genuine bus-error, a
//! misaligned fetch, or (in strict mode) a wholly unrecognised opcode
//! are fatal and bubble up as `SimError`.

use std::io::Write;

use crate::cpu::Cpu;
use crate::decode::{Btype, DecodedInstr, Format, Itype, Jtype, Rtype, Stype, Utype};
use crate::error::SimError;
use crate::utils::{extract_field, interpret_i32_as_unsigned, interpret_u32_as_signed};

/// What the executed instruction asks the driver to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Keep running; the driver still checks PC against program_size.
    Continue,
    /// The program asked to halt (ECALL service 10 or 93).
    Halt,
}

fn sign_extend_byte(value: u8) -> u32 {
    value as i8 as i32 as u32
}

fn sign_extend_half(value: u16) -> u32 {
    value as i16 as i32 as u32
}

/// Execute one already-decoded instruction. `out` is the byte sink for
/// ECALL's print services (real stdout in the CLI binary, an in-memory
/// buffer in tests). `strict` selects the unknown-opcode policy.
pub fn execute(
    cpu: &mut Cpu,
    decoded: &DecodedInstr,
    out: &mut impl Write,
    strict: bool,
) -> Result<Control, SimError> {
    let pc = cpu.pc;
    match decoded.format {
        Format::R(r) => exec_rtype(cpu, r),
        Format::I(i) => return exec_itype(cpu, decoded, i, out),
        Format::S(s) => exec_stype(cpu, s)?,
        Format::B(b) => exec_btype(cpu, b)?,
        Format::U(u) => exec_utype(cpu, decoded.opcode, u, pc),
        Format::J(j) => exec_jtype(cpu, j)?,
        Format::Unknown => {
            if strict {
                return Err(SimError::UnknownOpcode {
                    opcode: decoded.opcode,
                    pc,
                });
            }
            log::warn!(
                "unknown opcode 0x{:02x} at pc 0x{:08x} (instruction 0x{:08x}); treating as no-op",
                decoded.opcode,
                pc,
                decoded.raw
            );
            cpu.pc = pc.wrapping_add(4);
        }
    }
    Ok(Control::Continue)
}

fn exec_rtype(cpu: &mut Cpu, r: Rtype) {
    let src1 = cpu.registers.read(r.rs1);
    let src2 = cpu.registers.read(r.rs2);
    let value = match (r.funct3, r.funct7) {
        (0x0, 0x00) => src1.wrapping_add(src2),
        (0x0, 0x20) => src1.wrapping_sub(src2),
        (0x1, 0x00) => src1 << (src2 & 0x1f),
        (0x2, 0x00) => {
            (interpret_u32_as_signed(src1) < interpret_u32_as_signed(src2)) as u32
        }
        (0x3, 0x00) => (src1 < src2) as u32,
        (0x4, 0x00) => src1 ^ src2,
        (0x5, 0x00) => src1 >> (src2 & 0x1f),
        (0x5, 0x20) => {
            interpret_i32_as_unsigned(interpret_u32_as_signed(src1) >> (src2 & 0x1f))
        }
        (0x6, 0x00) => src1 | src2,
        (0x7, 0x00) => src1 & src2,
        (funct3, funct7) => {
            log::warn!(
                "unknown R-type funct3=0x{funct3:x} funct7=0x{funct7:02x} at pc 0x{:08x}; treating as no-op",
                cpu.pc
            );
            cpu.registers.read(r.rd)
        }
    };
    cpu.registers.write(r.rd, value);
    cpu.pc = cpu.pc.wrapping_add(4);
}

fn exec_itype(
    cpu: &mut Cpu,
    decoded: &DecodedInstr,
    i: Itype,
    out: &mut impl Write,
) -> Result<Control, SimError> {
    use crate::decode::{OP_I_ARITH, OP_I_ECALL, OP_I_JALR, OP_I_LOAD};

    match decoded.opcode {
        OP_I_ARITH => {
            exec_itype_arith(cpu, decoded.raw, i);
            Ok(Control::Continue)
        }
        OP_I_LOAD => {
            exec_itype_load(cpu, i)?;
            Ok(Control::Continue)
        }
        OP_I_JALR => {
            exec_jalr(cpu, i);
            Ok(Control::Continue)
        }
        OP_I_ECALL => exec_ecall(cpu, out),
        _ => unreachable!("decoder only produces Format::I for the four I-type opcodes"),
    }
}

fn exec_itype_arith(cpu: &mut Cpu, raw: u32, i: Itype) {
    let src = cpu.registers.read(i.rs1);
    let imm = i.imm as u32;
    let shamt = imm & 0x1f;
    // SLLI/SRLI/SRAI carry a full 7-bit funct7 discriminator in
    // bits[31:25], exactly like the R-type register-register shifts;
    // every other funct7 value at those two funct3s is illegal.
    let funct7 = extract_field(raw, 31, 25) as u8;
    let value = match (i.funct3, funct7) {
        (0x0, _) => src.wrapping_add(imm),
        (0x1, 0x00) => src << shamt,
        (0x2, _) => (interpret_u32_as_signed(src) < i.imm) as u32,
        (0x3, _) => (src < imm) as u32,
        (0x4, _) => src ^ imm,
        (0x5, 0x00) => src >> shamt,
        (0x5, 0x20) => interpret_i32_as_unsigned(interpret_u32_as_signed(src) >> shamt),
        (0x6, _) => src | imm,
        (0x7, _) => src & imm,
        (funct3, funct7) => {
            log::warn!(
                "unknown I-type-arith funct3=0x{funct3:x} funct7=0x{funct7:02x} at pc 0x{:08x}; treating as no-op",
                cpu.pc
            );
            cpu.registers.read(i.rd)
        }
    };
    cpu.registers.write(i.rd, value);
    cpu.pc = cpu.pc.wrapping_add(4);
}

fn exec_itype_load(cpu: &mut Cpu, i: Itype) -> Result<(), SimError> {
    let base = cpu.registers.read(i.rs1);
    let addr = base.wrapping_add(i.imm as u32);
    let value = match i.funct3 {
        0x0 => sign_extend_byte(cpu.memory.read_byte(addr)?),
        0x1 => sign_extend_half(cpu.memory.read_half(addr)?),
        0x2 => cpu.memory.read_word(addr)?,
        0x4 => cpu.memory.read_byte(addr)? as u32,
        0x5 => cpu.memory.read_half(addr)? as u32,
        funct3 => {
            log::warn!(
                "unknown load funct3=0x{funct3:x} at pc 0x{:08x}; treating as no-op",
                cpu.pc
            );
            cpu.registers.read(i.rd)
        }
    };
    cpu.registers.write(i.rd, value);
    cpu.pc = cpu.pc.wrapping_add(4);
    Ok(())
}

fn exec_jalr(cpu: &mut Cpu, i: Itype) {
    let return_address = cpu.pc.wrapping_add(4);
    let base = cpu.registers.read(i.rs1);
    let target = base.wrapping_add(i.imm as u32) & !1u32;
    cpu.registers.write(i.rd, return_address);
    cpu.pc = target;
}

/// Environment-call ABI (§6): the service selector is a7 (x17).
fn exec_ecall(cpu: &mut Cpu, out: &mut impl Write) -> Result<Control, SimError> {
    const A0: u8 = 10;
    const A7: u8 = 17;

    let service = cpu.registers.read(A7);
    let control = match service {
        1 => {
            let value = interpret_u32_as_signed(cpu.registers.read(A0));
            write!(out, "{value}")?;
            Control::Continue
        }
        4 => {
            let mut addr = cpu.registers.read(A0);
            loop {
                let byte = cpu.memory.read_byte(addr)?;
                if byte == 0 {
                    break;
                }
                out.write_all(&[byte])?;
                addr = addr.wrapping_add(1);
            }
            Control::Continue
        }
        10 => {
            cpu.exit_code = 0;
            Control::Halt
        }
        93 => {
            cpu.exit_code = interpret_u32_as_signed(cpu.registers.read(A0));
            Control::Halt
        }
        other => {
            log::warn!(
                "unknown ecall service a7=0x{other:x} at pc 0x{:08x}; treating as no-op",
                cpu.pc
            );
            Control::Continue
        }
    };
    cpu.pc = cpu.pc.wrapping_add(4);
    Ok(control)
}

fn exec_stype(cpu: &mut Cpu, s: Stype) -> Result<(), SimError> {
    let base = cpu.registers.read(s.rs1);
    let addr = base.wrapping_add(s.imm as u32);
    let value = cpu.registers.read(s.rs2);
    match s.funct3 {
        0x0 => cpu.memory.write_byte(addr, value as u8)?,
        0x1 => cpu.memory.write_half(addr, value as u16)?,
        0x2 => cpu.memory.write_word(addr, value)?,
        funct3 => log::warn!(
            "unknown store funct3=0x{funct3:x} at pc 0x{:08x}; treating as no-op",
            cpu.pc
        ),
    }
    cpu.pc = cpu.pc.wrapping_add(4);
    Ok(())
}

fn exec_btype(cpu: &mut Cpu, b: Btype) -> Result<(), SimError> {
    let src1 = cpu.registers.read(b.rs1);
    let src2 = cpu.registers.read(b.rs2);
    let taken = match b.funct3 {
        0x0 => src1 == src2,
        0x1 => src1 != src2,
        0x4 => interpret_u32_as_signed(src1) < interpret_u32_as_signed(src2),
        0x5 => interpret_u32_as_signed(src1) >= interpret_u32_as_signed(src2),
        0x6 => src1 < src2,
        0x7 => src1 >= src2,
        funct3 => {
            log::warn!(
                "unknown branch funct3=0x{funct3:x} at pc 0x{:08x}; treating as no-op",
                cpu.pc
            );
            false
        }
    };
    cpu.pc = if taken {
        cpu.pc.wrapping_add(b.offset as u32)
    } else {
        cpu.pc.wrapping_add(4)
    };
    Ok(())
}

fn exec_utype(cpu: &mut Cpu, opcode: u8, u: Utype, pc: u32) {
    use crate::decode::{OP_U_AUIPC, OP_U_LUI};

    let value = match opcode {
        OP_U_LUI => u.imm,
        OP_U_AUIPC => pc.wrapping_add(u.imm),
        _ => unreachable!("decoder only produces Format::U for lui/auipc"),
    };
    cpu.registers.write(u.rd, value);
    cpu.pc = pc.wrapping_add(4);
}

fn exec_jtype(cpu: &mut Cpu, j: Jtype) -> Result<(), SimError> {
    let return_address = cpu.pc.wrapping_add(4);
    cpu.pc = cpu.pc.wrapping_add(j.offset as u32);
    cpu.registers.write(j.rd, return_address);
    Ok(())
}
