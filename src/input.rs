use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal;
use log::debug;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

/// where typed characters come from
pub trait Input {
    /// next pending character, if any; never blocks
    fn poll_char(&mut self) -> Result<Option<u8>, io::Error>;
}

/// host keys that don't arrive as plain characters
const HOST_KEYMAP: [(KeyCode, u8); 4] = [
    (KeyCode::Enter, 0x0d),
    (KeyCode::Backspace, 0x08),
    (KeyCode::Esc, 0x1b),
    (KeyCode::Tab, 0x09),
];

/// simple implementation of Input, using the controlling terminal in raw mode
pub struct StdinInput {
    _raw: RawMode,
}

struct RawMode;

impl RawMode {
    fn enable() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            debug!("could not leave raw mode: {}", e);
        }
    }
}

impl StdinInput {
    pub fn new() -> Result<Self, io::Error> {
        Ok(StdinInput {
            _raw: RawMode::enable()?,
        })
    }
}

/// turn a key event into the byte a serial terminal would have sent
fn key_to_byte(evt: KeyEvent) -> Option<u8> {
    match evt.code {
        KeyCode::Char(c) if !c.is_ascii() => None,
        KeyCode::Char(c) if evt.modifiers.contains(KeyModifiers::CONTROL) => {
            // Ctrl-A..Ctrl-Z -> 0x01..0x1a
            Some((c.to_ascii_uppercase() as u8) & 0x1f)
        }
        KeyCode::Char(c) => Some(c as u8),
        code => HOST_KEYMAP
            .iter()
            .find(|(k, _)| *k == code)
            .map(|(_, b)| *b),
    }
}

impl Input for StdinInput {
    fn poll_char(&mut self) -> Result<Option<u8>, io::Error> {
        while poll(Duration::from_millis(0))? {
            match read()? {
                Event::Key(evt) => match key_to_byte(evt) {
                    Some(b) => return Ok(Some(b)),
                    None => debug!("can't map {:?} to an Apple-1 key", evt.code),
                },
                _ => {
                    // resize, mouse: not for us
                }
            }
        }
        Ok(None)
    }
}

/// dummy Input implementation for testing
pub struct DummyInput {
    bytes: VecDeque<u8>,
}

impl DummyInput {
    pub fn new(keys: &[u8]) -> Self {
        DummyInput {
            bytes: keys.iter().copied().collect(),
        }
    }

    /// queue more keys behind whatever is still pending
    pub fn push(&mut self, keys: &[u8]) {
        self.bytes.extend(keys);
    }

    pub fn pending(&self) -> usize {
        self.bytes.len()
    }
}

impl Input for DummyInput {
    fn poll_char(&mut self) -> Result<Option<u8>, io::Error> {
        Ok(self.bytes.pop_front())
    }
}
