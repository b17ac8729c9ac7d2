use crate::cpu::{Reg, RegisterAccess};
use crate::memory::{Bus, Segment};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Longest legal 8086 instruction, prefixes included.
pub const MAX_INSTRUCTION_LEN: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Op {
    /// Decode failed.
    #[default]
    None,

    Mov,
    Push,
    Pop,
    Xchg,
    In,
    Out,
    Xlat,
    Lea,
    Lds,
    Les,
    Lahf,
    Sahf,
    Pushf,
    Popf,

    Add,
    Adc,
    Inc,
    Aaa,
    Daa,
    Sub,
    Sbb,
    Dec,
    Neg,
    Cmp,
    Aas,
    Das,
    Mul,
    Imul,
    Aam,
    Div,
    Idiv,
    Aad,
    Cbw,
    Cwd,

    Not,
    Shl,
    Shr,
    Sar,
    Rol,
    Ror,
    Rcl,
    Rcr,
    And,
    Test,
    Or,
    Xor,

    Rep,
    Movs,
    Cmps,
    Scas,
    Lods,
    Stos,

    Call,
    Jmp,
    Ret,
    Retf,
    Je,
    Jl,
    Jle,
    Jb,
    Jbe,
    Jp,
    Jo,
    Js,
    Jne,
    Jnl,
    Jg,
    Jnb,
    Ja,
    Jnp,
    Jno,
    Jns,
    Loop,
    Loopz,
    Loopnz,
    Jcxz,

    Int,
    Int3,
    Into,
    Iret,

    Clc,
    Cmc,
    Stc,
    Cld,
    Std,
    Cli,
    Sti,
    Hlt,
    Wait,
    Esc,
    Lock,
    Segment,
}

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct InstFlags: u8 {
const WIDE = 1 << 0;
const LOCK = 1 << 1;
const REP = 1 << 2;
const SEGMENT = 1 << 3; // explicit segment override prefix
const FAR = 1 << 4;
}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EaTerm {
    pub reg: RegisterAccess,
    pub scale: i32,
}

impl EaTerm {
    pub const fn of(reg: Reg) -> Self {
        Self {
            reg: RegisterAccess::word(reg),
            scale: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EffectiveAddress {
    pub terms: [Option<EaTerm>; 2],
    pub displacement: i32,
    /// Literal segment of a far `seg:offset` address.
    pub explicit_segment: Option<u16>,
}

impl EffectiveAddress {
    pub fn direct(displacement: i32) -> Self {
        Self {
            displacement,
            ..Self::default()
        }
    }

    pub fn term_count(&self) -> usize {
        self.terms.iter().flatten().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Immediate {
    pub value: i32,
    /// Displacement relative to the end of the instruction.
    pub relative: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Operand {
    #[default]
    None,
    Register(RegisterAccess),
    Memory(EffectiveAddress),
    Immediate(Immediate),
}

impl Operand {
    pub fn is_none(&self) -> bool {
        matches!(self, Operand::None)
    }

    pub fn imm(value: i32) -> Self {
        Operand::Immediate(Immediate {
            value,
            relative: false,
        })
    }

    pub fn rel(value: i32) -> Self {
        Operand::Immediate(Immediate {
            value,
            relative: true,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Instruction {
    pub op: Op,
    /// Bytes consumed, prefixes included. 0 when `op` is `Op::None`.
    pub size: u32,
    pub flags: InstFlags,
    /// Override register when `flags` has `SEGMENT`.
    pub segment_override: Option<Reg>,
    pub operands: [Operand; 2],
}

impl Instruction {
    pub const NONE: Instruction = Instruction {
        op: Op::None,
        size: 0,
        flags: InstFlags::empty(),
        segment_override: None,
        operands: [Operand::None, Operand::None],
    };

    pub fn is_none(&self) -> bool {
        self.op == Op::None
    }

    pub fn is_wide(&self) -> bool {
        self.flags.contains(InstFlags::WIDE)
    }

    pub fn dest(&self) -> &Operand {
        &self.operands[0]
    }

    pub fn src(&self) -> &Operand {
        &self.operands[1]
    }
}

pub trait Decoder {
    /// Decodes the instruction at offset 0 of `at`. Never fails: an
    /// unrecognized byte pattern comes back as [`Instruction::NONE`].
    fn decode<B: Bus + ?Sized>(&self, bus: &B, at: Segment) -> Instruction;
}
