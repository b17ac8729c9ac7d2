pub mod arith;
pub mod cpu;
pub mod cycles;
pub mod decoder;
pub mod exec;
pub mod instructions;
pub mod memory;
pub mod names;
pub mod session;

pub mod isa {
    pub mod i8086; // 8086/8088 real-mode encoding
}

pub use cpu::{Cpu, CpuConfig, Flags, Layout, Reg, RegisterAccess, RegisterBank, Trap};
pub use decoder::{Instruction, Op, Operand};
pub use isa::i8086::{decode_bytes, decode_region, DecodeError};
pub use memory::{Bus, Memory, Segment};
pub use session::{LoadError, Session};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
