use crate::arith::{bit_add, bit_sub};
use crate::cpu::{Flags, Reg, RegisterBank, Segments, Trap, REGISTER_COUNT};
use crate::decoder::{EffectiveAddress, InstFlags, Instruction, Op, Operand};
use crate::memory::Bus;

pub trait Executor {
    fn exec<B: Bus>(
        &self,
        regs: &mut RegisterBank,
        bus: &mut B,
        segs: &Segments,
        inst: &Instruction,
    ) -> Result<(), Trap>;
}

/// Executes the subset of the 8086 that the simulator models: `mov`,
/// `add`/`sub`/`cmp`, `test`, `xor`, the `je`/`jne`/`jp`/`jb` branches,
/// `loop`/`loopnz`, `jmp`, `push`/`pop`, `call` and `ret`.
///
/// IP has already been advanced past `inst` when this runs, so relative
/// displacements apply directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimExecutor;

impl Executor for SimExecutor {
    fn exec<B: Bus>(
        &self,
        regs: &mut RegisterBank,
        bus: &mut B,
        segs: &Segments,
        inst: &Instruction,
    ) -> Result<(), Trap> {
        match inst.op {
            Op::Mov => exec_mov(regs, bus, segs, inst),
            Op::Add | Op::Sub | Op::Cmp => {
                let rhs = reg_or_imm(regs, inst.src()).ok_or_else(|| unsupported(regs, inst))?;
                let Operand::Register(dst) = *inst.dest() else {
                    return Err(unsupported(regs, inst));
                };
                let lhs = regs.get(dst);
                let r = match inst.op {
                    Op::Add => bit_add(lhs, rhs),
                    _ => bit_sub(lhs, rhs),
                };
                if inst.op != Op::Cmp {
                    regs.set(dst, r.value);
                }
                regs.apply_flags(r);
                Ok(())
            }
            Op::Test => {
                let lhs = reg_or_imm(regs, inst.dest()).ok_or_else(|| unsupported(regs, inst))?;
                let rhs = reg_or_imm(regs, inst.src()).ok_or_else(|| unsupported(regs, inst))?;
                // Only a non-zero result touches the flags, and only ZF.
                if lhs & rhs != 0 {
                    let mut f = regs.flags();
                    f.remove(Flags::ZF);
                    regs.set_flags(f);
                }
                Ok(())
            }
            Op::Xor => {
                let rhs = reg_or_imm(regs, inst.src()).ok_or_else(|| unsupported(regs, inst))?;
                let Operand::Register(dst) = *inst.dest() else {
                    return Err(unsupported(regs, inst));
                };
                regs.set(dst, regs.get(dst) ^ rhs);
                let mut f = regs.flags();
                f.remove(Flags::OF | Flags::CF);
                regs.set_flags(f);
                Ok(())
            }
            Op::Jne | Op::Je | Op::Jp | Op::Jb => {
                let disp = jump_displacement(regs, inst)?;
                let f = regs.flags();
                let taken = match inst.op {
                    Op::Jne => !f.contains(Flags::ZF),
                    Op::Je => f.contains(Flags::ZF),
                    Op::Jp => f.contains(Flags::PF),
                    _ => f.contains(Flags::CF),
                };
                if taken {
                    jump(regs, disp);
                }
                Ok(())
            }
            Op::Loop | Op::Loopnz => {
                let cx = regs.reg(Reg::C).wrapping_sub(1);
                regs.set_reg(Reg::C, cx);
                let disp = jump_displacement(regs, inst)?;
                let taken = match inst.op {
                    Op::Loop => cx != 0,
                    _ => cx != 0 && !regs.flags().contains(Flags::ZF),
                };
                if taken {
                    jump(regs, disp);
                }
                Ok(())
            }
            Op::Jmp => {
                let disp = match *inst.dest() {
                    Operand::Immediate(imm) => imm.value,
                    Operand::Register(r) => i32::from(regs.get(r)),
                    _ => return Err(unsupported(regs, inst)),
                };
                jump(regs, disp);
                Ok(())
            }
            Op::Push => {
                let Operand::Register(src) = *inst.dest() else {
                    return Err(unsupported(regs, inst));
                };
                let sp = regs.reg(Reg::Sp);
                bus.write_u16(segs.stack, u32::from(sp), regs.get(src));
                regs.set_reg(Reg::Sp, sp.wrapping_add(2));
                Ok(())
            }
            Op::Pop => {
                let Operand::Register(dst) = *inst.dest() else {
                    return Err(unsupported(regs, inst));
                };
                let sp = regs.reg(Reg::Sp);
                let v = bus.read_u16(segs.stack, u32::from(sp));
                regs.set_reg(Reg::Sp, sp.wrapping_sub(2));
                regs.set(dst, v);
                Ok(())
            }
            Op::Call => {
                let Operand::Immediate(imm) = *inst.dest() else {
                    return Err(unsupported(regs, inst));
                };
                if inst.flags.contains(InstFlags::FAR) {
                    return Err(unsupported(regs, inst));
                }
                // Dumps the whole register file; SP is stored with the value
                // it has reached at that point of the dump.
                for index in 1..REGISTER_COUNT {
                    let sp = regs.reg(Reg::Sp);
                    bus.write_u16(segs.stack, u32::from(sp), regs.regs[index]);
                    regs.set_reg(Reg::Sp, sp.wrapping_add(2));
                }
                jump(regs, imm.value);
                Ok(())
            }
            Op::Ret => {
                match *inst.dest() {
                    Operand::Immediate(imm) => jump(regs, imm.value),
                    Operand::None => {}
                    _ => return Err(unsupported(regs, inst)),
                }
                Ok(())
            }

            Op::None => Err(Trap::InvalidInstruction { ip: inst_ip(regs, inst) }),

            Op::Xchg
            | Op::In
            | Op::Out
            | Op::Xlat
            | Op::Lea
            | Op::Lds
            | Op::Les
            | Op::Lahf
            | Op::Sahf
            | Op::Pushf
            | Op::Popf
            | Op::Adc
            | Op::Inc
            | Op::Aaa
            | Op::Daa
            | Op::Sbb
            | Op::Dec
            | Op::Neg
            | Op::Aas
            | Op::Das
            | Op::Mul
            | Op::Imul
            | Op::Aam
            | Op::Div
            | Op::Idiv
            | Op::Aad
            | Op::Cbw
            | Op::Cwd
            | Op::Not
            | Op::Shl
            | Op::Shr
            | Op::Sar
            | Op::Rol
            | Op::Ror
            | Op::Rcl
            | Op::Rcr
            | Op::And
            | Op::Or
            | Op::Rep
            | Op::Movs
            | Op::Cmps
            | Op::Scas
            | Op::Lods
            | Op::Stos
            | Op::Retf
            | Op::Jl
            | Op::Jle
            | Op::Jbe
            | Op::Jo
            | Op::Js
            | Op::Jnl
            | Op::Jg
            | Op::Jnb
            | Op::Ja
            | Op::Jnp
            | Op::Jno
            | Op::Jns
            | Op::Loopz
            | Op::Jcxz
            | Op::Int
            | Op::Int3
            | Op::Into
            | Op::Iret
            | Op::Clc
            | Op::Cmc
            | Op::Stc
            | Op::Cld
            | Op::Std
            | Op::Cli
            | Op::Sti
            | Op::Hlt
            | Op::Wait
            | Op::Esc
            | Op::Lock
            | Op::Segment => Err(Trap::UnsupportedOperation {
                ip: inst_ip(regs, inst),
                op: inst.op,
            }),
        }
    }
}

fn exec_mov<B: Bus>(
    regs: &mut RegisterBank,
    bus: &mut B,
    segs: &Segments,
    inst: &Instruction,
) -> Result<(), Trap> {
    match (*inst.dest(), *inst.src()) {
        (Operand::Register(dst), Operand::Immediate(imm)) => {
            regs.set(dst, imm.value as u16);
        }
        (Operand::Register(dst), Operand::Register(src)) => {
            regs.set(dst, regs.get(src));
        }
        (Operand::Memory(ea), Operand::Immediate(imm)) => {
            let addr = address_of(regs, inst, &ea)?;
            store(bus, segs, addr, imm.value as u16, inst.is_wide());
        }
        (Operand::Register(dst), Operand::Memory(ea)) => {
            let addr = address_of(regs, inst, &ea)?;
            regs.set(dst, load(bus, segs, addr, dst.is_wide()));
        }
        (Operand::Memory(ea), Operand::Register(src)) => {
            let addr = address_of(regs, inst, &ea)?;
            store(bus, segs, addr, regs.get(src), src.is_wide());
        }
        _ => return Err(unsupported(regs, inst)),
    }
    Ok(())
}

fn load<B: Bus>(bus: &B, segs: &Segments, addr: u16, wide: bool) -> u16 {
    if wide {
        bus.read_u16(segs.data, u32::from(addr))
    } else {
        u16::from(bus.read_u8(segs.data, u32::from(addr)))
    }
}

fn store<B: Bus>(bus: &mut B, segs: &Segments, addr: u16, v: u16, wide: bool) {
    if wide {
        bus.write_u16(segs.data, u32::from(addr), v);
    } else {
        bus.write_u8(segs.data, u32::from(addr), v as u8);
    }
}

/// Data-segment offset named by `ea`. Segment overrides and far addresses
/// are not modeled.
fn address_of(regs: &RegisterBank, inst: &Instruction, ea: &EffectiveAddress) -> Result<u16, Trap> {
    if ea.explicit_segment.is_some() || inst.flags.contains(InstFlags::SEGMENT) {
        return Err(unsupported(regs, inst));
    }
    let base = ea.terms.iter().flatten().fold(0i32, |acc, t| {
        acc.wrapping_add(i32::from(regs.get(t.reg)).wrapping_mul(t.scale))
    });
    Ok(base.wrapping_add(ea.displacement) as u16)
}

fn reg_or_imm(regs: &RegisterBank, op: &Operand) -> Option<u16> {
    match *op {
        Operand::Immediate(imm) => Some(imm.value as u16),
        Operand::Register(r) => Some(regs.get(r)),
        _ => None,
    }
}

fn jump_displacement(regs: &RegisterBank, inst: &Instruction) -> Result<i32, Trap> {
    match *inst.dest() {
        Operand::Immediate(imm) => Ok(imm.value),
        _ => Err(unsupported(regs, inst)),
    }
}

fn jump(regs: &mut RegisterBank, disp: i32) {
    let ip = regs.ip().wrapping_add(disp as u16);
    regs.set_reg(Reg::Ip, ip);
}

fn inst_ip(regs: &RegisterBank, inst: &Instruction) -> u16 {
    regs.ip().wrapping_sub(inst.size as u16)
}

fn unsupported(regs: &RegisterBank, inst: &Instruction) -> Trap {
    Trap::UnsupportedOperands {
        ip: inst_ip(regs, inst),
        instruction: *inst,
    }
}
