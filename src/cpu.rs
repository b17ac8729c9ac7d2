use crate::arith::{parity_even, ArithResult};
use crate::decoder::{Decoder, Instruction, Op};
use crate::exec::Executor;
use crate::memory::{Bus, Segment};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Register slots, in register-bank order. Slot 0 is the "no register" slot
/// that unused effective-address terms point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Reg {
    None = 0,
    A,
    B,
    C,
    D,
    Sp,
    Bp,
    Si,
    Di,
    Es,
    Cs,
    Ss,
    Ds,
    Ip,
    Flags,
}

pub const REGISTER_COUNT: usize = 15;

impl Reg {
    const ALL: [Reg; REGISTER_COUNT] = [
        Reg::None,
        Reg::A,
        Reg::B,
        Reg::C,
        Reg::D,
        Reg::Sp,
        Reg::Bp,
        Reg::Si,
        Reg::Di,
        Reg::Es,
        Reg::Cs,
        Reg::Ss,
        Reg::Ds,
        Reg::Ip,
        Reg::Flags,
    ];

    pub fn from_index(index: u8) -> Reg {
        Self::ALL[index as usize % REGISTER_COUNT]
    }
}

/// A view of one register slot: the whole word, or its low or high byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegisterAccess {
    pub index: u8,
    /// 0 = low byte, 1 = high byte. Only meaningful when `width == 1`.
    pub offset: u8,
    pub width: u8,
}

impl RegisterAccess {
    pub const fn word(reg: Reg) -> Self {
        Self { index: reg as u8, offset: 0, width: 2 }
    }

    pub const fn low(reg: Reg) -> Self {
        Self { index: reg as u8, offset: 0, width: 1 }
    }

    pub const fn high(reg: Reg) -> Self {
        Self { index: reg as u8, offset: 1, width: 1 }
    }

    pub fn reg(self) -> Reg {
        Reg::from_index(self.index)
    }

    pub fn is_wide(self) -> bool {
        self.width == 2
    }
}

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flags: u16 {
const CF = 1 << 0; // Carry
const PF = 1 << 2; // Parity (even)
const AF = 1 << 4; // Auxiliary carry
const ZF = 1 << 6; // Zero
const SF = 1 << 7; // Sign
const TF = 1 << 8; // Trap
const IF = 1 << 9; // Interrupt enable
const DF = 1 << 10; // Direction
const OF = 1 << 11; // Overflow
}
}

impl Flags {
    /// Reserved bits are dropped.
    pub fn from_register(v: u16) -> Self {
        Flags::from_bits_truncate(v)
    }

    pub fn to_register(self) -> u16 {
        self.bits()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegisterBank {
    pub current_byte: u32,
    pub current_instruction: u32,
    pub regs: [u16; REGISTER_COUNT],
}

impl RegisterBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, r: RegisterAccess) -> u16 {
        let slot = self.regs[r.index as usize % REGISTER_COUNT];
        match (r.width, r.offset & 1) {
            (2, _) => slot,
            (_, 0) => slot & 0x00FF,
            _ => slot >> 8,
        }
    }

    pub fn set(&mut self, r: RegisterAccess, v: u16) {
        let slot = &mut self.regs[r.index as usize % REGISTER_COUNT];
        match (r.width, r.offset & 1) {
            (2, _) => *slot = v,
            (_, 0) => *slot = (*slot & 0xFF00) | (v & 0x00FF),
            _ => *slot = (*slot & 0x00FF) | ((v & 0x00FF) << 8),
        }
    }

    pub fn reg(&self, reg: Reg) -> u16 {
        self.regs[reg as usize]
    }

    pub fn set_reg(&mut self, reg: Reg, v: u16) {
        self.regs[reg as usize] = v;
    }

    pub fn ip(&self) -> u16 {
        self.reg(Reg::Ip)
    }

    pub fn flags(&self) -> Flags {
        Flags::from_register(self.reg(Reg::Flags))
    }

    pub fn set_flags(&mut self, flags: Flags) {
        self.set_reg(Reg::Flags, flags.to_register());
    }

    /// Writes OF, SF, ZF, CF, PF and AF from an arithmetic result. The
    /// control flags are left alone.
    pub fn apply_flags(&mut self, r: ArithResult) {
        let mut f = self.flags();
        f.set(Flags::OF, r.overflow);
        f.set(Flags::SF, r.value & 0x8000 != 0);
        f.set(Flags::ZF, r.value == 0);
        f.set(Flags::CF, r.carry);
        f.set(Flags::PF, parity_even(r.value));
        f.set(Flags::AF, r.aux_carry);
        self.set_flags(f);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Code, data and stack are separate views into one arena.
    #[default]
    Segmented,
    /// One view serves code, data and stack; the bookkeeping counters wrap
    /// when the program bytes are exhausted.
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    pub layout: Layout,
    pub memory_pow2: u8,
    /// Size of the data and stack views in the segmented layout. Rounded down
    /// to a power of two.
    pub segment_stride: u32,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            layout: Layout::Segmented,
            memory_pow2: 20,
            segment_stride: 1 << 16,
        }
    }
}

impl CpuConfig {
    fn stride_view(&self) -> Segment {
        Segment::fixed_pow2(self.segment_stride.max(1).ilog2() as u8, 0)
    }

    /// Carves the code, data and stack views. In the segmented layout they sit
    /// back to back, so none of them can reach into another.
    pub fn segments(&self) -> Segments {
        let code = Segment::fixed_pow2(self.memory_pow2, 0);
        match self.layout {
            Layout::Segmented => {
                let data = self.stride_view().move_base(code.size() as u32);
                let stack = data.move_base(data.size() as u32);
                Segments { code, data, stack }
            }
            Layout::Flat => Segments { code, data: code, stack: code },
        }
    }

    /// Arena size that holds every carved view end to end.
    pub fn arena_size(&self) -> usize {
        let view = 1usize << self.memory_pow2.min(31);
        match self.layout {
            Layout::Segmented => view + 2 * self.stride_view().size() as usize,
            Layout::Flat => view,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segments {
    pub code: Segment,
    pub data: Segment,
    pub stack: Segment,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Trap {
    #[error("Unrecognized instruction at ip {ip:#06x}")]
    InvalidInstruction { ip: u16 },
    #[error("Operation `{}` at ip {ip:#06x} is not supported", .op.mnemonic())]
    UnsupportedOperation { ip: u16, op: Op },
    #[error("Operand combination for `{}` at ip {ip:#06x} is not supported", .instruction.op.mnemonic())]
    UnsupportedOperands { ip: u16, instruction: Instruction },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cpu {
    pub regs: RegisterBank,
    pub cfg: CpuConfig,
    pub segments: Segments,
    /// Number of valid program bytes at the start of the code segment.
    pub program_len: u32,
}

impl Cpu {
    pub fn new(cfg: CpuConfig) -> Self {
        Self {
            regs: RegisterBank::new(),
            segments: cfg.segments(),
            cfg,
            program_len: 0,
        }
    }

    pub fn reset(&mut self, reset_ip: u16) {
        self.regs = RegisterBank::new();
        self.regs.set_reg(Reg::Ip, reset_ip);
    }

    /// True once IP has run off the end of the loaded program.
    pub fn halted(&self) -> bool {
        u32::from(self.regs.ip()) >= self.program_len
    }

    pub fn step<B: Bus, D: Decoder, X: Executor>(
        &mut self,
        bus: &mut B,
        dec: &D,
        exec: &X,
    ) -> Result<&RegisterBank, Trap> {
        let ip = self.regs.ip();
        let at = self.segments.code.move_base(u32::from(ip));
        let inst = dec.decode(&*bus, at);
        if inst.is_none() {
            tracing::debug!(ip, "unrecognized instruction bytes");
            return Err(Trap::InvalidInstruction { ip });
        }
        tracing::trace!(ip, op = inst.op.mnemonic(), size = inst.size, "step");

        self.regs.set_reg(Reg::Ip, ip.wrapping_add(inst.size as u16));
        self.regs.current_instruction = self.regs.current_instruction.wrapping_add(1);
        self.regs.current_byte = self.regs.current_byte.wrapping_add(inst.size);
        if self.cfg.layout == Layout::Flat && self.regs.current_byte >= self.program_len {
            self.regs.current_byte = 0;
            self.regs.current_instruction = 0;
        }

        exec.exec(&mut self.regs, bus, &self.segments, &inst)
            .inspect_err(|trap| tracing::debug!(%trap, "execution trap"))?;
        Ok(&self.regs)
    }
}
