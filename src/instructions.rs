//! The 8086 encoding table.
//!
//! Every entry lists the bit fields of one encoding in the order they appear
//! in the instruction stream, most significant bit first. Fields with a bit
//! count of zero read nothing and instead supply an implied value. Entries
//! for the same mnemonic are tried in order and the first match wins.

use crate::decoder::Op;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    Literal,
    Mod,
    Reg,
    Rm,
    Sr,
    Data,
    HasDisp,
    DispAlwaysW,
    HasData,
    WMakesDataW,
    RmRegAlwaysW,
    RelJmpDisp,
    D,
    S,
    W,
    V,
    Z,
    Far,
}

pub const USAGE_COUNT: usize = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub usage: Usage,
    pub bit_count: u8,
    pub shift: u8,
    pub value: u8,
}

const fn bits(usage: Usage, bit_count: u8) -> Field {
    Field { usage, bit_count, shift: 0, value: 0 }
}

const fn implied(usage: Usage, value: u8) -> Field {
    Field { usage, bit_count: 0, shift: 0, value }
}

/// A literal run of `count` bits that must equal `value`.
const fn lit(value: u8, count: u8) -> Field {
    Field { usage: Usage::Literal, bit_count: count, shift: 0, value }
}

const D: Field = bits(Usage::D, 1);
const W: Field = bits(Usage::W, 1);
const S: Field = bits(Usage::S, 1);
const V: Field = bits(Usage::V, 1);
const Z: Field = bits(Usage::Z, 1);
const MOD: Field = bits(Usage::Mod, 2);
const REG: Field = bits(Usage::Reg, 3);
const RM: Field = bits(Usage::Rm, 3);
const SR: Field = bits(Usage::Sr, 2);

// esc packs its six-bit opcode into the data slot
const XXX: Field = Field { usage: Usage::Data, bit_count: 3, shift: 3, value: 0 };
const YYY: Field = Field { usage: Usage::Data, bit_count: 3, shift: 0, value: 0 };

const DISP: Field = implied(Usage::HasDisp, 1);
const ADDR: Field = implied(Usage::HasDisp, 1);
const ADDR_W: Field = implied(Usage::DispAlwaysW, 1);
const DATA: Field = implied(Usage::HasData, 1);
const DATA_IF_W: Field = implied(Usage::WMakesDataW, 1);
const REL: Field = implied(Usage::RelJmpDisp, 1);
const FAR: Field = implied(Usage::Far, 1);
const RM_ALWAYS_W: Field = implied(Usage::RmRegAlwaysW, 1);

const fn imp_w(v: u8) -> Field {
    implied(Usage::W, v)
}
const fn imp_d(v: u8) -> Field {
    implied(Usage::D, v)
}
const fn imp_s(v: u8) -> Field {
    implied(Usage::S, v)
}
const fn imp_reg(v: u8) -> Field {
    implied(Usage::Reg, v)
}
const fn imp_mod(v: u8) -> Field {
    implied(Usage::Mod, v)
}
const fn imp_rm(v: u8) -> Field {
    implied(Usage::Rm, v)
}

#[derive(Debug, Clone, Copy)]
pub struct Encoding {
    pub op: Op,
    pub fields: &'static [Field],
}

#[derive(Debug, Clone, Copy)]
pub struct InstructionTable {
    pub encodings: &'static [Encoding],
    pub max_instruction_len: u32,
}

impl InstructionTable {
    pub const fn i8086() -> Self {
        Self {
            encodings: TABLE,
            max_instruction_len: crate::decoder::MAX_INSTRUCTION_LEN,
        }
    }
}

impl Default for InstructionTable {
    fn default() -> Self {
        Self::i8086()
    }
}

macro_rules! enc {
    ($op:ident, [$($f:expr),* $(,)?]) => {
        Encoding { op: Op::$op, fields: &[$($f),*] }
    };
}

pub const TABLE: &[Encoding] = &[
    enc!(Mov, [lit(0b100010, 6), D, W, MOD, REG, RM]),
    enc!(Mov, [lit(0b1100011, 7), W, MOD, lit(0b000, 3), RM, DATA, DATA_IF_W, imp_d(0)]),
    enc!(Mov, [lit(0b1011, 4), W, REG, DATA, DATA_IF_W, imp_d(1)]),
    enc!(Mov, [lit(0b1010000, 7), W, ADDR, ADDR_W, imp_reg(0), imp_mod(0), imp_rm(0b110), imp_d(1)]),
    enc!(Mov, [lit(0b1010001, 7), W, ADDR, ADDR_W, imp_reg(0), imp_mod(0), imp_rm(0b110), imp_d(0)]),
    // 8E and 8C collapse into one entry through the D bit
    enc!(Mov, [lit(0b100011, 6), D, lit(0b0, 1), MOD, lit(0b0, 1), SR, RM, imp_w(1)]),

    // lone register operands are pinned to the destination slot with an implied D
    enc!(Push, [lit(0b11111111, 8), MOD, lit(0b110, 3), RM, imp_w(1)]),
    enc!(Push, [lit(0b01010, 5), REG, imp_w(1), imp_d(1)]),
    enc!(Push, [lit(0b000, 3), SR, lit(0b110, 3), imp_w(1), imp_d(1)]),

    enc!(Pop, [lit(0b10001111, 8), MOD, lit(0b000, 3), RM, imp_w(1)]),
    enc!(Pop, [lit(0b01011, 5), REG, imp_w(1), imp_d(1)]),
    enc!(Pop, [lit(0b000, 3), SR, lit(0b111, 3), imp_w(1), imp_d(1)]),

    enc!(Xchg, [lit(0b1000011, 7), W, MOD, REG, RM, imp_d(1)]),
    enc!(Xchg, [lit(0b10010, 5), REG, imp_mod(0b11), imp_w(1), imp_rm(0)]),

    enc!(In, [lit(0b1110010, 7), W, DATA, imp_reg(0), imp_d(1)]),
    enc!(In, [lit(0b1110110, 7), W, imp_reg(0), imp_d(1), imp_mod(0b11), imp_rm(2), RM_ALWAYS_W]),
    enc!(Out, [lit(0b1110011, 7), W, DATA, imp_reg(0), imp_d(0)]),
    enc!(Out, [lit(0b1110111, 7), W, imp_reg(0), imp_d(0), imp_mod(0b11), imp_rm(2), RM_ALWAYS_W]),

    enc!(Xlat, [lit(0b11010111, 8)]),
    enc!(Lea, [lit(0b10001101, 8), MOD, REG, RM, imp_d(1), imp_w(1)]),
    enc!(Lds, [lit(0b11000101, 8), MOD, REG, RM, imp_d(1), imp_w(1)]),
    enc!(Les, [lit(0b11000100, 8), MOD, REG, RM, imp_d(1), imp_w(1)]),
    enc!(Lahf, [lit(0b10011111, 8)]),
    enc!(Sahf, [lit(0b10011110, 8)]),
    enc!(Pushf, [lit(0b10011100, 8)]),
    enc!(Popf, [lit(0b10011101, 8)]),

    enc!(Add, [lit(0b000000, 6), D, W, MOD, REG, RM]),
    enc!(Add, [lit(0b100000, 6), S, W, MOD, lit(0b000, 3), RM, DATA, DATA_IF_W]),
    enc!(Add, [lit(0b0000010, 7), W, DATA, DATA_IF_W, imp_reg(0), imp_d(1)]),

    enc!(Adc, [lit(0b000100, 6), D, W, MOD, REG, RM]),
    enc!(Adc, [lit(0b100000, 6), S, W, MOD, lit(0b010, 3), RM, DATA, DATA_IF_W]),
    enc!(Adc, [lit(0b0001010, 7), W, DATA, DATA_IF_W, imp_reg(0), imp_d(1)]),

    enc!(Inc, [lit(0b1111111, 7), W, MOD, lit(0b000, 3), RM]),
    enc!(Inc, [lit(0b01000, 5), REG, imp_w(1), imp_d(1)]),

    enc!(Aaa, [lit(0b00110111, 8)]),
    enc!(Daa, [lit(0b00100111, 8)]),

    enc!(Sub, [lit(0b001010, 6), D, W, MOD, REG, RM]),
    enc!(Sub, [lit(0b100000, 6), S, W, MOD, lit(0b101, 3), RM, DATA, DATA_IF_W]),
    enc!(Sub, [lit(0b0010110, 7), W, DATA, DATA_IF_W, imp_reg(0), imp_d(1)]),

    enc!(Sbb, [lit(0b000110, 6), D, W, MOD, REG, RM]),
    enc!(Sbb, [lit(0b100000, 6), S, W, MOD, lit(0b011, 3), RM, DATA, DATA_IF_W]),
    enc!(Sbb, [lit(0b0001110, 7), W, DATA, DATA_IF_W, imp_reg(0), imp_d(1)]),

    enc!(Dec, [lit(0b1111111, 7), W, MOD, lit(0b001, 3), RM]),
    enc!(Dec, [lit(0b01001, 5), REG, imp_w(1), imp_d(1)]),

    enc!(Neg, [lit(0b1111011, 7), W, MOD, lit(0b011, 3), RM]),

    enc!(Cmp, [lit(0b001110, 6), D, W, MOD, REG, RM]),
    enc!(Cmp, [lit(0b100000, 6), S, W, MOD, lit(0b111, 3), RM, DATA, DATA_IF_W]),
    enc!(Cmp, [lit(0b0011110, 7), W, DATA, DATA_IF_W, imp_reg(0), imp_d(1)]),

    enc!(Aas, [lit(0b00111111, 8)]),
    enc!(Das, [lit(0b00101111, 8)]),
    enc!(Mul, [lit(0b1111011, 7), W, MOD, lit(0b100, 3), RM, imp_s(0)]),
    enc!(Imul, [lit(0b1111011, 7), W, MOD, lit(0b101, 3), RM, imp_s(1)]),
    enc!(Aam, [lit(0b11010100, 8), lit(0b00001010, 8)]),
    enc!(Div, [lit(0b1111011, 7), W, MOD, lit(0b110, 3), RM, imp_s(0)]),
    enc!(Idiv, [lit(0b1111011, 7), W, MOD, lit(0b111, 3), RM, imp_s(1)]),
    enc!(Aad, [lit(0b11010101, 8), lit(0b00001010, 8)]),
    enc!(Cbw, [lit(0b10011000, 8)]),
    enc!(Cwd, [lit(0b10011001, 8)]),

    enc!(Not, [lit(0b1111011, 7), W, MOD, lit(0b010, 3), RM]),
    enc!(Shl, [lit(0b110100, 6), V, W, MOD, lit(0b100, 3), RM]),
    enc!(Shr, [lit(0b110100, 6), V, W, MOD, lit(0b101, 3), RM]),
    enc!(Sar, [lit(0b110100, 6), V, W, MOD, lit(0b111, 3), RM]),
    enc!(Rol, [lit(0b110100, 6), V, W, MOD, lit(0b000, 3), RM]),
    enc!(Ror, [lit(0b110100, 6), V, W, MOD, lit(0b001, 3), RM]),
    enc!(Rcl, [lit(0b110100, 6), V, W, MOD, lit(0b010, 3), RM]),
    enc!(Rcr, [lit(0b110100, 6), V, W, MOD, lit(0b011, 3), RM]),

    enc!(And, [lit(0b001000, 6), D, W, MOD, REG, RM]),
    enc!(And, [lit(0b1000000, 7), W, MOD, lit(0b100, 3), RM, DATA, DATA_IF_W]),
    enc!(And, [lit(0b0010010, 7), W, DATA, DATA_IF_W, imp_reg(0), imp_d(1)]),

    // no D bit here: 0x86/0x87 belong to xchg
    enc!(Test, [lit(0b1000010, 7), W, MOD, REG, RM]),
    enc!(Test, [lit(0b1111011, 7), W, MOD, lit(0b000, 3), RM, DATA, DATA_IF_W]),
    enc!(Test, [lit(0b1010100, 7), W, DATA, DATA_IF_W, imp_reg(0), imp_d(1)]),

    enc!(Or, [lit(0b000010, 6), D, W, MOD, REG, RM]),
    enc!(Or, [lit(0b1000000, 7), W, MOD, lit(0b001, 3), RM, DATA, DATA_IF_W]),
    enc!(Or, [lit(0b0000110, 7), W, DATA, DATA_IF_W, imp_reg(0), imp_d(1)]),

    enc!(Xor, [lit(0b001100, 6), D, W, MOD, REG, RM]),
    enc!(Xor, [lit(0b1000000, 7), W, MOD, lit(0b110, 3), RM, DATA, DATA_IF_W]),
    enc!(Xor, [lit(0b0011010, 7), W, DATA, DATA_IF_W, imp_reg(0), imp_d(1)]),

    enc!(Rep, [lit(0b1111001, 7), Z]),
    enc!(Movs, [lit(0b1010010, 7), W]),
    enc!(Cmps, [lit(0b1010011, 7), W]),
    enc!(Scas, [lit(0b1010111, 7), W]),
    enc!(Lods, [lit(0b1010110, 7), W]),
    enc!(Stos, [lit(0b1010101, 7), W]),

    enc!(Call, [lit(0b11101000, 8), ADDR, ADDR_W, REL]),
    enc!(Call, [lit(0b11111111, 8), MOD, lit(0b010, 3), RM, imp_w(1)]),
    enc!(Call, [lit(0b10011010, 8), ADDR, ADDR_W, DATA, DATA_IF_W, imp_w(1)]),
    enc!(Call, [lit(0b11111111, 8), MOD, lit(0b011, 3), RM, imp_w(1), FAR]),

    enc!(Jmp, [lit(0b11101001, 8), ADDR, ADDR_W, REL]),
    enc!(Jmp, [lit(0b11101011, 8), DISP, REL]),
    enc!(Jmp, [lit(0b11111111, 8), MOD, lit(0b100, 3), RM, imp_w(1)]),
    enc!(Jmp, [lit(0b11101010, 8), ADDR, ADDR_W, DATA, DATA_IF_W, imp_w(1)]),
    enc!(Jmp, [lit(0b11111111, 8), MOD, lit(0b101, 3), RM, imp_w(1), FAR]),

    enc!(Ret, [lit(0b11000011, 8)]),
    enc!(Ret, [lit(0b11000010, 8), DATA, DATA_IF_W, imp_w(1)]),
    enc!(Retf, [lit(0b11001011, 8)]),
    enc!(Retf, [lit(0b11001010, 8), DATA, DATA_IF_W, imp_w(1)]),

    enc!(Je, [lit(0b01110100, 8), DISP, REL]),
    enc!(Jl, [lit(0b01111100, 8), DISP, REL]),
    enc!(Jle, [lit(0b01111110, 8), DISP, REL]),
    enc!(Jb, [lit(0b01110010, 8), DISP, REL]),
    enc!(Jbe, [lit(0b01110110, 8), DISP, REL]),
    enc!(Jp, [lit(0b01111010, 8), DISP, REL]),
    enc!(Jo, [lit(0b01110000, 8), DISP, REL]),
    enc!(Js, [lit(0b01111000, 8), DISP, REL]),
    enc!(Jne, [lit(0b01110101, 8), DISP, REL]),
    enc!(Jnl, [lit(0b01111101, 8), DISP, REL]),
    enc!(Jg, [lit(0b01111111, 8), DISP, REL]),
    enc!(Jnb, [lit(0b01110011, 8), DISP, REL]),
    enc!(Ja, [lit(0b01110111, 8), DISP, REL]),
    enc!(Jnp, [lit(0b01111011, 8), DISP, REL]),
    enc!(Jno, [lit(0b01110001, 8), DISP, REL]),
    enc!(Jns, [lit(0b01111001, 8), DISP, REL]),
    enc!(Loop, [lit(0b11100010, 8), DISP, REL]),
    enc!(Loopz, [lit(0b11100001, 8), DISP, REL]),
    enc!(Loopnz, [lit(0b11100000, 8), DISP, REL]),
    enc!(Jcxz, [lit(0b11100011, 8), DISP, REL]),

    enc!(Int, [lit(0b11001101, 8), DATA]),
    enc!(Int3, [lit(0b11001100, 8)]),

    enc!(Into, [lit(0b11001110, 8)]),
    enc!(Iret, [lit(0b11001111, 8)]),

    enc!(Clc, [lit(0b11111000, 8)]),
    enc!(Cmc, [lit(0b11110101, 8)]),
    enc!(Stc, [lit(0b11111001, 8)]),
    enc!(Cld, [lit(0b11111100, 8)]),
    enc!(Std, [lit(0b11111101, 8)]),
    enc!(Cli, [lit(0b11111010, 8)]),
    enc!(Sti, [lit(0b11111011, 8)]),
    enc!(Hlt, [lit(0b11110100, 8)]),
    enc!(Wait, [lit(0b10011011, 8)]),
    enc!(Esc, [lit(0b11011, 5), XXX, MOD, YYY, RM]),
    enc!(Lock, [lit(0b11110000, 8)]),
    enc!(Segment, [lit(0b001, 3), SR, lit(0b110, 3)]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_encoding_reads_whole_bytes() {
        for enc in TABLE {
            let total: u32 = enc.fields.iter().map(|f| u32::from(f.bit_count)).sum();
            assert_eq!(total % 8, 0, "{:?} reads {total} bits", enc.op);
            assert!(enc.fields[0].usage == Usage::Literal, "{:?} must open with a literal", enc.op);
        }
    }

    #[test]
    fn every_usage_is_built_by_the_table() {
        let mut seen = [false; USAGE_COUNT];
        for f in TABLE.iter().flat_map(|enc| enc.fields) {
            seen[f.usage as usize] = true;
        }
        assert_eq!(Usage::Far as usize + 1, USAGE_COUNT);
        assert_eq!(seen, [true; USAGE_COUNT]);
    }
}
