//! The keyboard half of the PIA: one character of buffer and a strobe.
//!
//! The data register multiplexes the strobe into bit 7 of the character and
//! reading it acknowledges the key. The control register shows the same bit
//! without acknowledging anything, so software can poll KBDCR for as long as
//! it likes and then fetch from KBD exactly once.
use log::trace;

pub const CR: u8 = 0x0d;
pub const LF: u8 = 0x0a;

const STROBE: u8 = 0x80;

#[derive(Debug, Default)]
pub struct Keyboard {
    pending: u8,
    ready: bool,
    /// the previous ingress was a line ending that got through
    after_line_end: bool,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// back to power-on: nothing pending
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// A key arrives from the host. Unread input is overwritten, just like the
    /// real latch.
    pub fn ingress(&mut self, c: u8) {
        let c = match c {
            CR | LF => {
                // both become CR, so any two in a row are one Enter press
                if self.after_line_end {
                    trace!("dropping {:#04x}, second half of a line ending", c);
                    self.after_line_end = false;
                    return;
                }
                self.after_line_end = true;
                CR
            }
            c => {
                self.after_line_end = false;
                c.to_ascii_uppercase()
            }
        };
        self.pending = c & !STROBE;
        self.ready = true;
    }

    /// KBD: the character with the strobe in bit 7; acknowledges the key
    pub fn read_data(&mut self) -> u8 {
        let value = self.peek_data();
        self.ready = false;
        value
    }

    /// KBDCR: strobe in bit 7; leaves it alone
    pub fn read_status(&self) -> u8 {
        if self.ready {
            STROBE
        } else {
            0x00
        }
    }

    /// what a KBD read would return, without acknowledging anything
    pub fn peek_data(&self) -> u8 {
        if self.ready {
            self.pending | STROBE
        } else {
            self.pending
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }
}
