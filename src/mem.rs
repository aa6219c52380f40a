//! Bounded access to the story's memory image.
//!
//! The codec and router never index raw slices; every read and write goes
//! through [`StoryMemory`] so a malformed address surfaces as a
//! [`MemoryError`] instead of a panic or a runaway scan.

use crate::error::MemoryError;

/// The byte-addressable memory image shared with the interpreter core.
///
/// `rom_start` marks the first read-only byte: writes at or above it fail,
/// and output-stream-3 commits truncate against it.
pub struct StoryMemory {
    bytes: Vec<u8>,
    rom_start: usize,
}

impl StoryMemory {
    pub fn new(bytes: Vec<u8>, rom_start: usize) -> Self {
        debug_assert!(rom_start <= bytes.len());
        StoryMemory { bytes, rom_start }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// First byte of the read-only region.
    pub fn rom_start(&self) -> usize {
        self.rom_start
    }

    pub fn read_byte(&self, addr: u32) -> Result<u8, MemoryError> {
        self.bytes
            .get(addr as usize)
            .copied()
            .ok_or(MemoryError::OutOfBounds(addr))
    }

    /// Read a big-endian 16-bit word.
    pub fn read_word(&self, addr: u32) -> Result<u16, MemoryError> {
        let next = addr.checked_add(1).ok_or(MemoryError::OutOfBounds(addr))?;
        let hi = self.read_byte(addr)?;
        let lo = self.read_byte(next)?;
        Ok(((hi as u16) << 8) | lo as u16)
    }

    pub fn write_byte(&mut self, addr: u32, value: u8) -> Result<(), MemoryError> {
        let i = addr as usize;
        if i >= self.bytes.len() {
            return Err(MemoryError::OutOfBounds(addr));
        }
        if i >= self.rom_start {
            return Err(MemoryError::ReadOnly(addr));
        }
        self.bytes[i] = value;
        Ok(())
    }

    /// Write a big-endian 16-bit word.
    pub fn write_word(&mut self, addr: u32, value: u16) -> Result<(), MemoryError> {
        let next = addr.checked_add(1).ok_or(MemoryError::OutOfBounds(addr))?;
        self.write_byte(addr, (value >> 8) as u8)?;
        self.write_byte(next, (value & 0xff) as u8)
    }

    /// Raw view, for callers that have already validated their range.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}
