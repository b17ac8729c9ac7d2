use crate::cpu::{Cpu, CpuConfig, RegisterBank, Trap};
use crate::exec::SimExecutor;
use crate::isa::i8086::I8086Decoder;
use crate::memory::Memory;

/// Largest view a session will allocate for (16 MiB).
pub const MAX_MEMORY_POW2: u8 = 24;

/// Largest data or stack view a session will carve (one 64 KiB segment).
pub const MAX_SEGMENT_STRIDE: u32 = 1 << 16;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Program is {len} bytes but the code segment holds {capacity}")]
    ProgramTooLarge { len: usize, capacity: usize },
    #[error("Memory size 2^{pow2} is out of range (max 2^{max})")]
    MemoryTooLarge { pow2: u8, max: u8 },
    #[error("Segment stride {stride:#x} must be a power of two no larger than {max:#x}")]
    SegmentStrideOutOfRange { stride: u32, max: u32 },
}

/// One simulated machine: a CPU and the arena it runs against.
///
/// Sessions share nothing, so any number can run side by side.
#[derive(Debug, Clone)]
pub struct Session {
    pub cpu: Cpu,
    pub mem: Memory,
    dec: I8086Decoder,
    exec: SimExecutor,
}

impl Session {
    pub fn new(cfg: CpuConfig) -> Result<Self, LoadError> {
        if cfg.memory_pow2 > MAX_MEMORY_POW2 {
            return Err(LoadError::MemoryTooLarge {
                pow2: cfg.memory_pow2,
                max: MAX_MEMORY_POW2,
            });
        }
        if !cfg.segment_stride.is_power_of_two() || cfg.segment_stride > MAX_SEGMENT_STRIDE {
            return Err(LoadError::SegmentStrideOutOfRange {
                stride: cfg.segment_stride,
                max: MAX_SEGMENT_STRIDE,
            });
        }
        Ok(Self {
            cpu: Cpu::new(cfg),
            mem: Memory::new(cfg.arena_size()),
            dec: I8086Decoder::new(),
            exec: SimExecutor,
        })
    }

    /// Builds a session with `program` at offset 0 of the code segment and
    /// every register cleared.
    pub fn load(cfg: CpuConfig, program: &[u8]) -> Result<Self, LoadError> {
        let mut session = Self::new(cfg)?;
        let capacity = session.cpu.segments.code.size() as usize;
        if program.len() > capacity {
            return Err(LoadError::ProgramTooLarge {
                len: program.len(),
                capacity,
            });
        }
        session.mem.load(session.cpu.segments.code, program);
        session.cpu.program_len = program.len() as u32;
        session.cpu.reset(0);
        tracing::debug!(len = program.len(), layout = ?cfg.layout, "program loaded");
        Ok(session)
    }

    pub fn step(&mut self) -> Result<&RegisterBank, Trap> {
        self.cpu.step(&mut self.mem, &self.dec, &self.exec)
    }

    /// Steps until IP leaves the program or `max_steps` have run. Returns
    /// the number of instructions executed.
    pub fn run(&mut self, max_steps: u64) -> Result<u64, Trap> {
        let mut steps = 0;
        while steps < max_steps && !self.halted() {
            self.step()?;
            steps += 1;
        }
        Ok(steps)
    }

    pub fn halted(&self) -> bool {
        self.cpu.halted()
    }

    pub fn regs(&self) -> &RegisterBank {
        &self.cpu.regs
    }
}
