//! # cpu
//!
//! The 6502 itself lives outside this crate. All we need from it is a way to
//! reset it, a way to make it execute one instruction, and a look at its
//! registers for diagnostics. Every memory access it makes during those calls
//! comes back to us through `MemoryAccess`.
use std::fmt;

/// what the CPU is allowed to do to the outside world
pub trait MemoryAccess {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, value: u8);
}

/// programmer-visible 6502 registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub status: u8,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            pc: 0x0000,
            a: 0x00,
            x: 0x00,
            y: 0x00,
            /* reset leaves SP three below the top of page one */
            sp: 0xfd,
            /* I and the unused bit are set after reset */
            status: 0x24,
        }
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PC={:04x} A={:02x} X={:02x} Y={:02x} SP={:02x} P={:02x}",
            self.pc, self.a, self.x, self.y, self.sp, self.status
        )
    }
}

/// an instruction stepper that talks to memory only through `MemoryAccess`
pub trait Cpu {
    fn registers(&self) -> &Registers;

    /// load PC from the reset vector and put everything else in its power-on state
    fn reset(&mut self, memory: &mut dyn MemoryAccess);

    /// execute exactly one instruction
    fn step(&mut self, memory: &mut dyn MemoryAccess);
}
