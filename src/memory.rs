use serde::{Deserialize, Serialize};

/// A power-of-two window into a [`Memory`] arena.
///
/// Offsets are always reduced modulo the window size, so any offset maps to a
/// byte inside the window instead of faulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub base: u32,
    pub size_pow2: u8,
}

impl Segment {
    pub fn fixed_pow2(size_pow2: u8, base: u32) -> Self {
        Self {
            base,
            size_pow2: size_pow2.min(32),
        }
    }

    /// A window of the same size starting `delta` bytes further into the arena.
    pub fn move_base(self, delta: u32) -> Self {
        Self {
            base: self.base.wrapping_add(delta),
            size_pow2: self.size_pow2,
        }
    }

    pub fn size(self) -> u64 {
        1u64 << self.size_pow2
    }

    pub fn mask(self) -> u32 {
        (self.size() - 1) as u32
    }

    /// Arena coordinate of `offset` within this window.
    pub fn absolute_address(self, offset: u32) -> u32 {
        self.base.wrapping_add(offset & self.mask())
    }
}

pub trait Bus {
    fn read_u8(&self, seg: Segment, offset: u32) -> u8;
    fn write_u8(&mut self, seg: Segment, offset: u32, val: u8);

    // Each byte wraps on its own, so a word at the last offset of a window
    // straddles back to offset 0.
    fn read_u16(&self, seg: Segment, offset: u32) -> u16 {
        let lo = self.read_u8(seg, offset);
        let hi = self.read_u8(seg, offset.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    fn write_u16(&mut self, seg: Segment, offset: u32, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        self.write_u8(seg, offset, lo);
        self.write_u8(seg, offset.wrapping_add(1), hi);
    }
}

/// The flat byte arena that code, data and stack segments are carved from.
#[derive(Clone, Serialize, Deserialize)]
pub struct Memory {
    pub mem: Vec<u8>,
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory").field("len", &self.mem.len()).finish()
    }
}

impl Memory {
    pub fn new(size: usize) -> Self {
        Self {
            mem: vec![0; size.max(1)],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut mem = Self::new(bytes.len());
        mem.mem[..bytes.len()].copy_from_slice(bytes);
        mem
    }

    pub fn len(&self) -> usize {
        self.mem.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mem.is_empty()
    }

    fn index(&self, seg: Segment, offset: u32) -> usize {
        seg.absolute_address(offset) as usize % self.mem.len()
    }

    pub fn access(&mut self, seg: Segment, offset: u32) -> &mut u8 {
        let idx = self.index(seg, offset);
        &mut self.mem[idx]
    }

    /// Copies `bytes` into `seg` starting at offset 0, wrapping inside the window.
    pub fn load(&mut self, seg: Segment, bytes: &[u8]) {
        for (off, b) in bytes.iter().enumerate() {
            *self.access(seg, off as u32) = *b;
        }
    }
}

impl Bus for Memory {
    fn read_u8(&self, seg: Segment, offset: u32) -> u8 {
        self.mem[self.index(seg, offset)]
    }

    fn write_u8(&mut self, seg: Segment, offset: u32, val: u8) {
        *self.access(seg, offset) = val;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_index_wraps_past_the_end() {
        let mut mem = Memory::new(8);
        let seg = Segment::fixed_pow2(4, 6);
        *mem.access(seg, 3) = 0xAA;
        // base 6 + 3 = 9, arena length 8
        assert_eq!(mem.mem[1], 0xAA);
    }

    #[test]
    fn word_straddles_window_end() {
        let mut mem = Memory::new(16);
        let seg = Segment::fixed_pow2(2, 0);
        mem.write_u16(seg, 3, 0xBEEF);
        assert_eq!(mem.mem[3], 0xEF);
        assert_eq!(mem.mem[0], 0xBE);
        assert_eq!(mem.read_u16(seg, 3), 0xBEEF);
    }
}
