use std::io;
use std::io::Read;

// NB. addresses are u16 as per the 6502; lengths are usize to stop endless casting

/// Represents the raw storage behind the bus. No side effects live here; the
/// register window and ROM protection are the bus's business.
pub trait MemoryMap {
    /// write a chunk of bytes
    fn write(&mut self, data: &[u8], addr: u16, len: usize) -> Result<(), io::Error> {
        let bytes = self.get_rw_slice(addr, len);
        let mut d: &[u8] = data;
        d.read_exact(bytes)
    }

    /// get a little-endian word (vectors)
    fn get_word(&self, addr: u16) -> u16 {
        let word = self.get_ro_slice(addr, 2);
        u16::from_le_bytes([word[0], word[1]])
    }

    /// get a r/w slice of the underlying memory
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> &mut [u8];

    /// get a r/o slice of the underlying memory
    fn get_ro_slice(&self, addr: u16, len: usize) -> &[u8];
}

/// Apple-1 memory map, as far as this machine cares:
///   0x0000-0x1fff  RAM (8K)
///   0xd010         KBD    keyboard data
///   0xd011         KBDCR  keyboard control/status
///   0xd012         DSP    display data
///   0xd013         DSPCR  display control
///   0xff00-0xffff  ROM (Woz Monitor)
///   0xfffc-0xfffd  reset vector
///
/// everything else is plain storage
pub const MEMORY_SIZE: usize = 1 << 16;
pub const RAM_START: u16 = 0x0000;
pub const RAM_END: u16 = 0x1fff;
pub const ROM_START: u16 = 0xff00;
pub const ROM_END: u16 = 0xffff;
pub const ROM_SIZE: usize = (ROM_END - ROM_START) as usize + 1;
pub const RESET_VECTOR: u16 = 0xfffc;

pub const KBD: u16 = 0xd010;
pub const KBDCR: u16 = 0xd011;
pub const DSP: u16 = 0xd012;
pub const DSPCR: u16 = 0xd013;

/// 64K of bytes
pub struct MemoryImage {
    bytes: Box<[u8]>,
}

impl MemoryMap for MemoryImage {
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> &mut [u8] {
        let a = addr as usize;
        &mut self.bytes[a..(a + len)]
    }
    fn get_ro_slice(&self, addr: u16, len: usize) -> &[u8] {
        let a = addr as usize;
        &self.bytes[a..(a + len)]
    }
}

impl Default for MemoryImage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryImage {
    pub fn new() -> Self {
        MemoryImage {
            bytes: vec![0u8; MEMORY_SIZE].into_boxed_slice(),
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.bytes[addr as usize]
    }

    pub fn store(&mut self, addr: u16, value: u8) {
        self.bytes[addr as usize] = value;
    }

    pub fn zero(&mut self) {
        self.bytes.fill(0);
    }

    /// copy `image` into the ROM region: anything past 256 bytes is cut off,
    /// anything short of it leaves zeroes behind
    pub fn install_rom(&mut self, image: &[u8]) {
        let len = image.len().min(ROM_SIZE);
        let rom = self.get_rw_slice(ROM_START, ROM_SIZE);
        rom.fill(0);
        rom[..len].copy_from_slice(&image[..len]);
    }
}

/// Steve Wozniak's 256-byte system monitor, as shipped at 0xff00.
/// NMI -> 0x0f00, RESET -> 0xff00, IRQ -> 0x0000
#[rustfmt::skip]
pub const WOZ_MONITOR: [u8; 256] = [
    0xd8, 0x58, 0xa0, 0x7f, 0x8c, 0x12, 0xd0, 0xa9, 0xa7, 0x8d, 0x11, 0xd0, 0x8d, 0x13, 0xd0, 0xc9, // ff00
    0xdf, 0xf0, 0x13, 0xc9, 0x9b, 0xf0, 0x03, 0xc8, 0x10, 0x0f, 0xa9, 0xdc, 0x20, 0xef, 0xff, 0xa9, // ff10
    0x8d, 0x20, 0xef, 0xff, 0xa0, 0x01, 0x88, 0x30, 0xf6, 0xad, 0x11, 0xd0, 0x10, 0xfb, 0xad, 0x10, // ff20
    0xd0, 0x99, 0x00, 0x02, 0x20, 0xef, 0xff, 0xc9, 0x8d, 0xd0, 0xd4, 0xa0, 0xff, 0xa9, 0x00, 0xaa, // ff30
    0x0a, 0x85, 0x2b, 0xc8, 0xb9, 0x00, 0x02, 0xc9, 0x8d, 0xf0, 0xd4, 0xc9, 0xae, 0x90, 0xf4, 0xf0, // ff40
    0xf0, 0xc9, 0xba, 0xf0, 0xeb, 0xc9, 0xd2, 0xf0, 0x3b, 0x86, 0x28, 0x86, 0x29, 0x84, 0x2a, 0xb9, // ff50
    0x00, 0x02, 0x49, 0xb0, 0xc9, 0x0a, 0x90, 0x06, 0x69, 0x88, 0xc9, 0xfa, 0x90, 0x11, 0x0a, 0x0a, // ff60
    0x0a, 0x0a, 0xa2, 0x04, 0x0a, 0x26, 0x28, 0x26, 0x29, 0xca, 0xd0, 0xf8, 0xc8, 0xd0, 0xe0, 0xc4, // ff70
    0x2a, 0xf0, 0x97, 0x24, 0x2b, 0x50, 0x10, 0xa5, 0x28, 0x81, 0x26, 0xe6, 0x26, 0xd0, 0xb5, 0xe6, // ff80
    0x27, 0x4c, 0x44, 0xff, 0x6c, 0x24, 0x00, 0x30, 0x2b, 0xa2, 0x02, 0xb5, 0x27, 0x95, 0x25, 0x95, // ff90
    0x23, 0xca, 0xd0, 0xf7, 0xd0, 0x14, 0xa9, 0x8d, 0x20, 0xef, 0xff, 0xa5, 0x25, 0x20, 0xdc, 0xff, // ffa0
    0xa5, 0x24, 0x20, 0xdc, 0xff, 0xa9, 0xba, 0x20, 0xef, 0xff, 0xa9, 0xa0, 0x20, 0xef, 0xff, 0xa1, // ffb0
    0x24, 0x20, 0xdc, 0xff, 0x86, 0x2b, 0xa5, 0x24, 0xc5, 0x28, 0xa5, 0x25, 0xe5, 0x29, 0xb0, 0xc1, // ffc0
    0xe6, 0x24, 0xd0, 0x02, 0xe6, 0x25, 0xa5, 0x24, 0x29, 0x07, 0x10, 0xc8, 0x48, 0x4a, 0x4a, 0x4a, // ffd0
    0x4a, 0x20, 0xe5, 0xff, 0x68, 0x29, 0x0f, 0x09, 0xb0, 0xc9, 0xba, 0x90, 0x02, 0x69, 0x06, 0x2c, // ffe0
    0x12, 0xd0, 0x30, 0xfb, 0x8d, 0x12, 0xd0, 0x60, 0x00, 0x00, 0x00, 0x0f, 0x00, 0xff, 0x00, 0x00, // fff0
];
