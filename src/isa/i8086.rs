use bitvec::prelude::*;

use crate::cpu::{Reg, RegisterAccess};
use crate::decoder::{
    Decoder, EaTerm, EffectiveAddress, InstFlags, Instruction, Op, Operand, MAX_INSTRUCTION_LEN,
};
use crate::instructions::{Encoding, InstructionTable, Usage, USAGE_COUNT};
use crate::memory::{Bus, Memory, Segment};

/// Table-driven 8086 decoder.
///
/// Prefix bytes (`lock`, `rep`, segment overrides) decode as ordinary table
/// entries; they are folded into the flags of the instruction that follows.
#[derive(Debug, Clone, Copy, Default)]
pub struct I8086Decoder {
    pub table: InstructionTable,
}

impl I8086Decoder {
    pub const fn new() -> Self {
        Self {
            table: InstructionTable::i8086(),
        }
    }
}

impl Decoder for I8086Decoder {
    fn decode<B: Bus + ?Sized>(&self, bus: &B, at: Segment) -> Instruction {
        decode_instruction(&self.table, bus, at)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Context {
    flags: InstFlags,
    segment_override: Option<Reg>,
}

pub fn decode_instruction<B: Bus + ?Sized>(
    table: &InstructionTable,
    bus: &B,
    at: Segment,
) -> Instruction {
    let mut ctx = Context::default();
    let mut total = 0u32;

    while total < table.max_instruction_len {
        let here = at.move_base(total);
        let Some(inst) = table
            .encodings
            .iter()
            .find_map(|enc| try_decode(&ctx, enc, bus, here))
        else {
            break;
        };
        // prefixes count against the length limit too
        if total + inst.size > table.max_instruction_len {
            break;
        }
        total += inst.size;

        match inst.op {
            Op::Lock => ctx.flags |= InstFlags::LOCK,
            Op::Rep => ctx.flags |= InstFlags::REP,
            Op::Segment => {
                ctx.flags |= InstFlags::SEGMENT;
                if let Operand::Register(r) = inst.operands[1] {
                    ctx.segment_override = Some(r.reg());
                }
            }
            _ => {
                return Instruction {
                    size: total,
                    ..inst
                };
            }
        }
    }

    Instruction::NONE
}

/// Decodes one instruction from a byte slice.
///
/// The decoder may look at up to [`MAX_INSTRUCTION_LEN`] bytes, so short
/// inputs are copied into a zeroed scratch buffer first.
pub fn decode_bytes(bytes: &[u8]) -> Instruction {
    let mut scratch = [0u8; MAX_INSTRUCTION_LEN as usize + 1];
    let n = bytes.len().min(scratch.len());
    scratch[..n].copy_from_slice(&bytes[..n]);
    let mem = Memory::from_bytes(&scratch);
    decode_instruction(&InstructionTable::i8086(), &mem, Segment::fixed_pow2(4, 0))
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unrecognized binary in instruction stream at offset {offset:#x}")]
    Unrecognized { offset: usize },
    #[error("Instruction at offset {offset:#x} needs {size} bytes but only {remaining} remain")]
    Truncated {
        offset: usize,
        size: u32,
        remaining: usize,
    },
}

/// Decodes a whole buffer back to back.
pub fn decode_region(bytes: &[u8]) -> Result<Vec<Instruction>, DecodeError> {
    let table = InstructionTable::i8086();
    let mut padded = bytes.to_vec();
    padded.resize(bytes.len() + 16, 0);
    let mem = Memory::from_bytes(&padded);
    let view = Segment::fixed_pow2(32, 0);

    let mut out = Vec::new();
    let mut offset = 0usize;
    while offset < bytes.len() {
        let inst = decode_instruction(&table, &mem, view.move_base(offset as u32));
        if inst.is_none() {
            return Err(DecodeError::Unrecognized { offset });
        }
        let remaining = bytes.len() - offset;
        if inst.size as usize > remaining {
            return Err(DecodeError::Truncated {
                offset,
                size: inst.size,
                remaining,
            });
        }
        offset += inst.size as usize;
        out.push(inst);
    }
    Ok(out)
}

const fn bit(u: Usage) -> u32 {
    1 << u as u32
}

fn try_decode<B: Bus + ?Sized>(
    ctx: &Context,
    enc: &Encoding,
    bus: &B,
    at: Segment,
) -> Option<Instruction> {
    let mut fields = [0u32; USAGE_COUNT];
    let mut has = 0u32;
    let mut cursor = 0u32;
    let mut pending = 0u8;
    let mut pending_count = 0u8;

    for f in enc.fields {
        let mut read = u32::from(f.value);
        if f.bit_count != 0 {
            if pending_count == 0 {
                pending = bus.read_u8(at, cursor);
                pending_count = 8;
                cursor += 1;
            }
            if f.bit_count > pending_count {
                return None;
            }
            let start = usize::from(8 - pending_count);
            let end = start + usize::from(f.bit_count);
            read = u32::from(pending.view_bits::<Msb0>()[start..end].load_be::<u8>());
            pending_count -= f.bit_count;
        }

        if f.usage == Usage::Literal {
            if read != u32::from(f.value) {
                return None;
            }
        } else {
            fields[f.usage as usize] |= read << f.shift;
            has |= bit(f.usage);
        }
    }

    let get = |u: Usage| fields[u as usize];
    let present = |u: Usage| has & bit(u) != 0;

    let m = get(Usage::Mod);
    let rm = get(Usage::Rm);
    let w = get(Usage::W) != 0;
    let s = get(Usage::S) != 0;
    let d = get(Usage::D) != 0;

    let direct = present(Usage::Mod) && m == 0b00 && rm == 0b110;
    let has_disp =
        get(Usage::HasDisp) != 0 || (present(Usage::Mod) && (m == 0b01 || m == 0b10)) || direct;
    let disp_w = get(Usage::DispAlwaysW) != 0 || m == 0b10 || direct;
    let data_w = get(Usage::WMakesDataW) != 0 && !s && w;
    let has_data = get(Usage::HasData) != 0;

    let disp = read_value(bus, at, &mut cursor, has_disp, disp_w, !disp_w);
    let data = get(Usage::Data) | read_value(bus, at, &mut cursor, has_data, data_w, s);
    let displacement = i32::from(disp as u16 as i16);

    let mut flags = ctx.flags;
    flags.set(InstFlags::WIDE, w);
    flags.set(InstFlags::FAR, get(Usage::Far) != 0);

    let mut operands = [Operand::None; 2];
    let (reg_slot, mod_slot) = if d { (0, 1) } else { (1, 0) };

    if present(Usage::Sr) {
        let seg = Reg::from_index(Reg::Es as u8 + (get(Usage::Sr) & 0b11) as u8);
        operands[reg_slot] = Operand::Register(RegisterAccess::word(seg));
    }
    if present(Usage::Reg) {
        operands[reg_slot] = Operand::Register(reg_operand(get(Usage::Reg), w));
    }
    if present(Usage::Mod) {
        operands[mod_slot] = if m == 0b11 {
            let wide = w || get(Usage::RmRegAlwaysW) != 0;
            Operand::Register(reg_operand(rm, wide))
        } else {
            Operand::Memory(effective_address(rm, direct, displacement))
        };
    }

    // Immediates and the other extra operands fill whichever slot is left.
    let last = usize::from(!operands[0].is_none());
    let far_direct = has_disp && has_data && !present(Usage::Mod);
    if get(Usage::RelJmpDisp) != 0 {
        operands[last] = Operand::rel(displacement);
    }
    if far_direct {
        operands[last] = Operand::Memory(EffectiveAddress {
            explicit_segment: Some(data as u16),
            ..EffectiveAddress::direct(i32::from(disp as u16))
        });
    } else if has_data || present(Usage::Data) {
        operands[last] = Operand::imm(data as i32);
    }
    if present(Usage::V) {
        operands[last] = if get(Usage::V) != 0 {
            Operand::Register(RegisterAccess::low(Reg::C))
        } else {
            Operand::imm(1)
        };
    }

    Some(Instruction {
        op: enc.op,
        size: cursor,
        flags,
        segment_override: ctx.segment_override,
        operands,
    })
}

/// Reads an optional 8- or 16-bit little-endian value at `cursor`.
fn read_value<B: Bus + ?Sized>(
    bus: &B,
    at: Segment,
    cursor: &mut u32,
    exists: bool,
    wide: bool,
    sign_extend: bool,
) -> u32 {
    if !exists {
        return 0;
    }
    if wide {
        let v = bus.read_u16(at, *cursor);
        *cursor += 2;
        u32::from(v)
    } else {
        let v = bus.read_u8(at, *cursor);
        *cursor += 1;
        if sign_extend {
            i32::from(v as i8) as u32
        } else {
            u32::from(v)
        }
    }
}

fn reg_operand(code: u32, wide: bool) -> RegisterAccess {
    const WORD: [Reg; 8] = [Reg::A, Reg::C, Reg::D, Reg::B, Reg::Sp, Reg::Bp, Reg::Si, Reg::Di];
    const BYTE: [Reg; 4] = [Reg::A, Reg::C, Reg::D, Reg::B];
    let code = (code & 0b111) as usize;
    if wide {
        RegisterAccess::word(WORD[code])
    } else if code < 4 {
        RegisterAccess::low(BYTE[code])
    } else {
        RegisterAccess::high(BYTE[code - 4])
    }
}

fn effective_address(rm: u32, direct: bool, displacement: i32) -> EffectiveAddress {
    if direct {
        return EffectiveAddress::direct(displacement);
    }
    let terms = match rm & 0b111 {
        0b000 => [Some(EaTerm::of(Reg::B)), Some(EaTerm::of(Reg::Si))],
        0b001 => [Some(EaTerm::of(Reg::B)), Some(EaTerm::of(Reg::Di))],
        0b010 => [Some(EaTerm::of(Reg::Bp)), Some(EaTerm::of(Reg::Si))],
        0b011 => [Some(EaTerm::of(Reg::Bp)), Some(EaTerm::of(Reg::Di))],
        0b100 => [Some(EaTerm::of(Reg::Si)), None],
        0b101 => [Some(EaTerm::of(Reg::Di)), None],
        0b110 => [Some(EaTerm::of(Reg::Bp)), None],
        _ => [Some(EaTerm::of(Reg::B)), None],
    };
    EffectiveAddress {
        terms,
        displacement,
        explicit_segment: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_registers_alias_the_word_slots() {
        assert_eq!(reg_operand(0b100, false), RegisterAccess::high(Reg::A));
        assert_eq!(reg_operand(0b011, false), RegisterAccess::low(Reg::B));
        assert_eq!(reg_operand(0b100, true), RegisterAccess::word(Reg::Sp));
    }

    #[test]
    fn prefixes_alone_do_not_decode() {
        assert!(decode_bytes(&[0xF0, 0x60]).is_none());
        assert!(decode_bytes(&[0x2E; 15]).is_none());
    }
}
