//! Rough 8086 clock estimates for `mov` and `add`.

use serde::{Deserialize, Serialize};

use crate::cpu::Reg;
use crate::decoder::{EffectiveAddress, Instruction, Op, Operand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CycleEstimate {
    pub base: u32,
    /// Effective-address calculation clocks.
    pub ea: u32,
    /// Penalty charged for the memory transfer(s).
    pub transfer: u32,
}

impl CycleEstimate {
    pub fn total(&self) -> u32 {
        self.base + self.ea + self.transfer
    }
}

/// Clocks for computing `ea`.
pub fn ea_cycles(ea: &EffectiveAddress) -> u32 {
    let mut regs = ea.terms.iter().flatten().map(|t| t.reg.reg());
    let first = regs.next();
    let second = regs.next();
    let disp = ea.displacement != 0;

    match (first, second) {
        (None, _) => 6,
        (Some(_), None) => {
            if disp {
                9
            } else {
                5
            }
        }
        (Some(a), Some(b)) => {
            let fast = matches!((a, b), (Reg::Bp, Reg::Di) | (Reg::B, Reg::Si));
            match (fast, disp) {
                (true, false) => 7,
                (false, false) => 8,
                (true, true) => 11,
                (false, true) => 12,
            }
        }
    }
}

/// Estimates `inst`, or `None` for operations and operand pairs that have
/// no entry.
pub fn estimate_cycles(inst: &Instruction) -> Option<CycleEstimate> {
    let est = |base, ea, transfer| Some(CycleEstimate { base, ea, transfer });

    match (inst.op, *inst.dest(), *inst.src()) {
        (Op::Mov, Operand::Register(r), Operand::Memory(m))
        | (Op::Mov, Operand::Memory(m), Operand::Register(r)) => {
            let to_reg = matches!(inst.dest(), Operand::Register(_));
            if r.reg() == Reg::A && r.offset == 0 && m.term_count() == 0 {
                est(10, 0, 4)
            } else if to_reg {
                est(8, ea_cycles(&m), 4)
            } else {
                est(9, ea_cycles(&m), 4)
            }
        }
        (Op::Mov, Operand::Register(_), Operand::Register(_)) => est(2, 0, 0),
        (Op::Mov, Operand::Register(_), Operand::Immediate(_)) => est(4, 0, 0),
        (Op::Mov, Operand::Memory(m), Operand::Immediate(_)) => est(10, ea_cycles(&m), 4),

        (Op::Add, Operand::Register(_), Operand::Memory(m)) => est(9, ea_cycles(&m), 4),
        (Op::Add, Operand::Memory(m), Operand::Register(_)) => est(16, ea_cycles(&m), 8),
        (Op::Add, Operand::Register(_), Operand::Register(_)) => est(3, 0, 0),
        (Op::Add, Operand::Register(_), Operand::Immediate(_)) => est(4, 0, 0),
        (Op::Add, Operand::Memory(m), Operand::Immediate(_)) => est(17, ea_cycles(&m), 8),

        _ => None,
    }
}
