//! # bus
//!
//! Every byte the CPU touches goes through `MemoryBus`. An address decodes to
//! exactly one region; the register window and the ROM are real branches of
//! that decode, not special cases bolted onto plain memory.
use log::{info, trace, warn};
use std::borrow::Cow;
use std::fmt;
use std::io;

use crate::cpu::MemoryAccess;
use crate::error::{EmuError, Result};
use crate::keyboard::Keyboard;
use crate::memory::{
    MemoryImage, MemoryMap, DSP, DSPCR, KBD, KBDCR, MEMORY_SIZE, RAM_END, RAM_START, RESET_VECTOR,
    ROM_END, ROM_START,
};
use crate::display::Renderer;
use crate::screen::TerminalScreen;

/// DSP only takes seven bits; bit 7 is the PIA's handshake line
const DSP_DATA_MASK: u8 = 0x7f;

/// both vector bytes read like this on an unprogrammed ROM
const UNSET_VECTOR_BYTE: u8 = 0xff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Ram,
    Rom,
    KeyboardData,
    KeyboardStatus,
    DisplayData,
    DisplayControl,
    /// unpopulated on the real board; plain storage here
    Open,
}

impl Region {
    /// does this region keep bytes in the memory image
    fn is_storage(self) -> bool {
        matches!(self, Region::Ram | Region::Rom | Region::Open)
    }

    /// can a program image be copied straight into this region
    fn is_loadable(self) -> bool {
        matches!(self, Region::Ram | Region::Open)
    }
}

/// searched in order; first hit wins
const REGIONS: [(u16, u16, Region); 6] = [
    (RAM_START, RAM_END, Region::Ram),
    (KBD, KBD, Region::KeyboardData),
    (KBDCR, KBDCR, Region::KeyboardStatus),
    (DSP, DSP, Region::DisplayData),
    (DSPCR, DSPCR, Region::DisplayControl),
    (ROM_START, ROM_END, Region::Rom),
];

pub fn decode(addr: u16) -> Region {
    REGIONS
        .iter()
        .find(|(start, end, _)| (*start..=*end).contains(&addr))
        .map_or(Region::Open, |(_, _, region)| *region)
}

/// what the bus looks like, for the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusSummary {
    pub ram: (u16, u16),
    pub rom: (u16, u16),
    pub registers: [u16; 4],
    pub reset_vector: u16,
}

impl fmt::Display for BusSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RAM {:04x}-{:04x} ROM {:04x}-{:04x} KBD {:04x} KBDCR {:04x} DSP {:04x} DSPCR {:04x} RESET -> {:04x}",
            self.ram.0,
            self.ram.1,
            self.rom.0,
            self.rom.1,
            self.registers[0],
            self.registers[1],
            self.registers[2],
            self.registers[3],
            self.reset_vector
        )
    }
}

pub struct MemoryBus<R: Renderer> {
    image: MemoryImage,
    rom: Cow<'static, [u8]>,
    keyboard: Keyboard,
    screen: TerminalScreen<R>,
    /// renderer failure from inside a CPU step, waiting to be reported
    fault: Option<io::Error>,
}

impl<R: Renderer> MemoryBus<R> {
    /// a bus in its post-reset state
    pub fn new(screen: TerminalScreen<R>, rom: Cow<'static, [u8]>) -> Self {
        let mut bus = MemoryBus {
            image: MemoryImage::new(),
            rom,
            keyboard: Keyboard::new(),
            screen,
            fault: None,
        };
        bus.reset();
        bus
    }

    /// Power-on memory: zeroes everywhere, ROM copied in, and a usable reset
    /// vector. The keyboard and screen are left alone.
    pub fn reset(&mut self) {
        self.image.zero();
        self.image.install_rom(&self.rom);
        let lo = self.image.read(RESET_VECTOR);
        let hi = self.image.read(RESET_VECTOR + 1);
        if lo == UNSET_VECTOR_BYTE && hi == UNSET_VECTOR_BYTE {
            warn!(
                "reset vector unset, pointing it at the start of ROM ({:04x})",
                ROM_START
            );
            let [lo, hi] = ROM_START.to_le_bytes();
            self.image.store(RESET_VECTOR, lo);
            self.image.store(RESET_VECTOR + 1, hi);
        }
        self.fault = None;
        info!("bus reset: {}", self.summary());
    }

    pub fn read(&mut self, addr: u16) -> u8 {
        match decode(addr) {
            Region::KeyboardData => self.keyboard.read_data(),
            Region::KeyboardStatus => self.keyboard.read_status(),
            // DSP bit 7 low means the display is ready for another character,
            // and this display always is
            Region::DisplayData | Region::DisplayControl => 0x00,
            Region::Ram | Region::Rom | Region::Open => self.image.read(addr),
        }
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        match decode(addr) {
            Region::DisplayData => {
                if let Err(e) = self.screen.write_char(value & DSP_DATA_MASK) {
                    // keep the first failure; the loop reports it after the batch
                    self.fault.get_or_insert(e);
                }
            }
            Region::Rom => trace!("ignoring write of {:02x} to ROM at {:04x}", value, addr),
            Region::KeyboardData | Region::KeyboardStatus | Region::DisplayControl => {
                trace!("ignoring write of {:02x} to register {:04x}", value, addr)
            }
            Region::Ram | Region::Open => self.image.store(addr, value),
        }
    }

    /// read with no side effects
    pub fn peek(&self, addr: u16) -> u8 {
        match decode(addr) {
            Region::KeyboardData => self.keyboard.peek_data(),
            Region::KeyboardStatus => self.keyboard.read_status(),
            Region::DisplayData | Region::DisplayControl => 0x00,
            Region::Ram | Region::Rom | Region::Open => self.image.read(addr),
        }
    }

    /// Copy a program into memory at `addr`. Bytes that land on ROM or the
    /// register window are skipped, the same as CPU writes would be.
    pub fn load(&mut self, reader: &mut impl io::Read, addr: u16) -> Result<usize> {
        let mut buf = Vec::new();
        let len = reader.read_to_end(&mut buf)?;
        if addr as usize + len > MEMORY_SIZE {
            return Err(EmuError::ImageTooLarge { addr, len });
        }
        let loadable = |offset: usize| decode(addr + offset as u16).is_loadable();
        let mut skipped = 0;
        let mut offset = 0;
        // copy each stretch of plain storage in one go, skip the rest
        while offset < len {
            let storage = loadable(offset);
            let run = (offset..len).take_while(|o| loadable(*o) == storage).count();
            if storage {
                let start = addr + offset as u16;
                self.image.write(&buf[offset..offset + run], start, run)?;
            } else {
                skipped += run;
            }
            offset += run;
        }
        if skipped > 0 {
            warn!(
                "skipped {} of {} bytes loaded at {:04x}: they overlap ROM or registers",
                skipped, len, addr
            );
        }
        Ok(len)
    }

    pub fn reset_vector(&self) -> u16 {
        self.image.get_word(RESET_VECTOR)
    }

    pub fn summary(&self) -> BusSummary {
        BusSummary {
            ram: (RAM_START, RAM_END),
            rom: (ROM_START, ROM_END),
            registers: [KBD, KBDCR, DSP, DSPCR],
            reset_vector: self.reset_vector(),
        }
    }

    /// raw view of a stretch of storage, for dumps
    pub fn slice(&self, addr: u16, len: usize) -> &[u8] {
        debug_assert!(decode(addr).is_storage());
        self.image.get_ro_slice(addr, len)
    }

    pub fn take_fault(&mut self) -> Option<io::Error> {
        self.fault.take()
    }

    pub fn keyboard(&self) -> &Keyboard {
        &self.keyboard
    }

    pub fn keyboard_mut(&mut self) -> &mut Keyboard {
        &mut self.keyboard
    }

    pub fn screen(&self) -> &TerminalScreen<R> {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut TerminalScreen<R> {
        &mut self.screen
    }
}

impl<R: Renderer> MemoryAccess for MemoryBus<R> {
    fn read(&mut self, addr: u16) -> u8 {
        MemoryBus::read(self, addr)
    }

    fn write(&mut self, addr: u16, value: u8) {
        MemoryBus::write(self, addr, value)
    }
}
