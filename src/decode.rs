//! The RV32I instruction decoder.
//!
//! `decode` is a pure, total function: every 32-bit word decodes to
//! something, even if that something is `Format::Unknown`. Field
//! extraction follows the bit layout in the ISA manual exactly; see
//! the table in the spec's Decoder section for the authoritative
//! bit ranges.

use crate::utils::{extract_field, sign_extend};

pub const OP_R: u8 = 0x33;
pub const OP_I_ARITH: u8 = 0x13;
pub const OP_I_LOAD: u8 = 0x03;
pub const OP_I_JALR: u8 = 0x67;
pub const OP_I_ECALL: u8 = 0x73;
pub const OP_S: u8 = 0x23;
pub const OP_B: u8 = 0x63;
pub const OP_U_LUI: u8 = 0x37;
pub const OP_U_AUIPC: u8 = 0x17;
pub const OP_J: u8 = 0x6f;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rtype {
    pub funct7: u8,
    pub rs2: u8,
    pub rs1: u8,
    pub funct3: u8,
    pub rd: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Itype {
    pub rd: u8,
    pub funct3: u8,
    pub rs1: u8,
    pub imm: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stype {
    pub funct3: u8,
    pub rs1: u8,
    pub rs2: u8,
    pub imm: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Btype {
    pub funct3: u8,
    pub rs1: u8,
    pub rs2: u8,
    pub offset: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utype {
    pub rd: u8,
    pub imm: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jtype {
    pub rd: u8,
    pub offset: i32,
}

/// The tagged variant carrying exactly the fields of the format that
/// the opcode decoded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    R(Rtype),
    I(Itype),
    S(Stype),
    B(Btype),
    U(Utype),
    J(Jtype),
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstr {
    pub raw: u32,
    pub opcode: u8,
    pub format: Format,
}

fn rd(instr: u32) -> u8 {
    extract_field(instr, 11, 7) as u8
}

fn rs1(instr: u32) -> u8 {
    extract_field(instr, 19, 15) as u8
}

fn rs2(instr: u32) -> u8 {
    extract_field(instr, 24, 20) as u8
}

fn funct3(instr: u32) -> u8 {
    extract_field(instr, 14, 12) as u8
}

fn funct7(instr: u32) -> u8 {
    extract_field(instr, 31, 25) as u8
}

fn opcode(instr: u32) -> u8 {
    extract_field(instr, 6, 0) as u8
}

fn decode_rtype(instr: u32) -> Rtype {
    Rtype {
        funct7: funct7(instr),
        rs2: rs2(instr),
        rs1: rs1(instr),
        funct3: funct3(instr),
        rd: rd(instr),
    }
}

fn decode_itype(instr: u32) -> Itype {
    let imm = sign_extend(extract_field(instr, 31, 20), 12);
    Itype {
        rd: rd(instr),
        funct3: funct3(instr),
        rs1: rs1(instr),
        imm: imm as i32,
    }
}

fn decode_stype(instr: u32) -> Stype {
    let imm11_5 = extract_field(instr, 31, 25);
    let imm4_0 = extract_field(instr, 11, 7);
    let imm = sign_extend((imm11_5 << 5) | imm4_0, 12);
    Stype {
        funct3: funct3(instr),
        rs1: rs1(instr),
        rs2: rs2(instr),
        imm: imm as i32,
    }
}

fn decode_btype(instr: u32) -> Btype {
    let bit12 = extract_field(instr, 31, 31);
    let bit11 = extract_field(instr, 7, 7);
    let bits10_5 = extract_field(instr, 30, 25);
    let bits4_1 = extract_field(instr, 11, 8);
    let offset = sign_extend(
        (bit12 << 12) | (bit11 << 11) | (bits10_5 << 5) | (bits4_1 << 1),
        13,
    );
    Btype {
        funct3: funct3(instr),
        rs1: rs1(instr),
        rs2: rs2(instr),
        offset: offset as i32,
    }
}

fn decode_utype(instr: u32) -> Utype {
    Utype {
        rd: rd(instr),
        imm: extract_field(instr, 31, 12) << 12,
    }
}

fn decode_jtype(instr: u32) -> Jtype {
    let bit20 = extract_field(instr, 31, 31);
    let bits19_12 = extract_field(instr, 19, 12);
    let bit11 = extract_field(instr, 20, 20);
    let bits10_1 = extract_field(instr, 30, 21);
    let offset = sign_extend(
        (bit20 << 20) | (bits19_12 << 12) | (bit11 << 11) | (bits10_1 << 1),
        21,
    );
    Jtype {
        rd: rd(instr),
        offset: offset as i32,
    }
}

/// Decode a 32-bit instruction word. Total: unrecognised opcodes
/// produce `Format::Unknown` rather than an error.
pub fn decode(instr: u32) -> DecodedInstr {
    let op = opcode(instr);
    let format = match op {
        OP_R => Format::R(decode_rtype(instr)),
        OP_I_ARITH | OP_I_LOAD | OP_I_JALR | OP_I_ECALL => Format::I(decode_itype(instr)),
        OP_S => Format::S(decode_stype(instr)),
        OP_B => Format::B(decode_btype(instr)),
        OP_U_LUI | OP_U_AUIPC => Format::U(decode_utype(instr)),
        OP_J => Format::J(decode_jtype(instr)),
        _ => Format::Unknown,
    };
    DecodedInstr {
        raw: instr,
        opcode: op,
        format,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addi_x1_x0_2_decodes_to_itype() {
        // addi x1, x0, 2
        let instr = 0x00200093;
        let decoded = decode(instr);
        assert_eq!(decoded.opcode, OP_I_ARITH);
        match decoded.format {
            Format::I(Itype { rd, funct3, rs1, imm }) => {
                assert_eq!(rd, 1);
                assert_eq!(funct3, 0);
                assert_eq!(rs1, 0);
                assert_eq!(imm, 2);
            }
            other => panic!("expected I-type, got {other:?}"),
        }
    }

    #[test]
    fn add_x3_x1_x2_decodes_to_rtype() {
        // add x3, x1, x2
        let instr = 0x002081b3;
        let decoded = decode(instr);
        match decoded.format {
            Format::R(Rtype {
                funct7,
                rs2,
                rs1,
                funct3,
                rd,
            }) => {
                assert_eq!(funct7, 0);
                assert_eq!(rs2, 2);
                assert_eq!(rs1, 1);
                assert_eq!(funct3, 0);
                assert_eq!(rd, 3);
            }
            other => panic!("expected R-type, got {other:?}"),
        }
    }

    #[test]
    fn itype_immediate_is_sign_extended() {
        // addi x1, x0, -1 -> imm field is all ones
        let instr = 0xfff0_0093;
        let decoded = decode(instr);
        match decoded.format {
            Format::I(Itype { imm, .. }) => assert_eq!(imm, -1),
            other => panic!("expected I-type, got {other:?}"),
        }
    }

    #[test]
    fn utype_immediate_is_pre_shifted_and_not_sign_extended_again() {
        // lui x1, 0xfffff (all-ones in the upper 20 bits)
        let instr = 0xffff_f0b7;
        let decoded = decode(instr);
        match decoded.format {
            Format::U(Utype { rd, imm }) => {
                assert_eq!(rd, 1);
                assert_eq!(imm, 0xffff_f000);
            }
            other => panic!("expected U-type, got {other:?}"),
        }
    }

    #[test]
    fn btype_offset_low_bit_is_always_zero() {
        // beq x0, x0, -4 (backward branch by 4 bytes)
        let instr = 0xfe00_0ee3;
        let decoded = decode(instr);
        match decoded.format {
            Format::B(Btype { offset, .. }) => assert_eq!(offset, -4),
            other => panic!("expected B-type, got {other:?}"),
        }
    }

    #[test]
    fn jtype_offset_decodes_scattered_bits() {
        // jal x1, 8
        let instr = 0x008000ef;
        let decoded = decode(instr);
        match decoded.format {
            Format::J(Jtype { rd, offset }) => {
                assert_eq!(rd, 1);
                assert_eq!(offset, 8);
            }
            other => panic!("expected J-type, got {other:?}"),
        }
    }

    #[test]
    fn unrecognised_opcode_is_unknown_not_an_error() {
        // opcode bits all set to an unallocated value (0x7f)
        let instr = 0x0000_007f;
        let decoded = decode(instr);
        assert_eq!(decoded.format, Format::Unknown);
    }
}
