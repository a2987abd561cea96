//! # screen
//!
//! The terminal the DSP register feeds: a rows x cols character buffer with a
//! write position. The buffer always matches what has been painted, so a
//! scroll can repaint the whole screen from it without reading anything back
//! from the renderer.
//!
//! Per character:
//!  1. take down the blinking cursor if it is up
//!  2. drop control codes (unless the filter is permissive); CR and LF survive
//!  3. CR becomes LF
//!  4. a third LF in a row is dropped; anything else restarts the count
//!  5. echo to the host, best effort
//!  6. LF blanks the rest of the row and moves down; anything else is stored,
//!     painted, and moves right
//!  7. writing the last column leaves the position there with a wrap pending;
//!     the next printable character wraps first, an LF just moves down once
//!  8. moving down off the bottom scrolls or clears, per `OverflowPolicy`
use log::{debug, trace};
use std::io;
use std::io::Write;

use crate::config::{Config, ControlFilter, OverflowPolicy};
use crate::cursor::{Blink, CursorBlinker, CURSOR_GLYPH};
use crate::display::{Renderer, BLANK};
use crate::keyboard::{CR, LF};

const BLANK_GLYPH: u8 = b' ';
const DEL: u8 = 0x7f;

/// LFs accepted back to back before the rest are dropped
const MAX_NEWLINE_RUN: u8 = 2;

pub struct TerminalScreen<R: Renderer> {
    renderer: R,
    rows: usize,
    cols: usize,
    cells: Vec<u8>,
    row: usize,
    col: usize,
    /// last column written; the next glyph goes on a new row
    wrap_pending: bool,
    newline_run: u8,
    overflow: OverflowPolicy,
    filter: ControlFilter,
    cursor: CursorBlinker,
    echo: Option<Box<dyn Write>>,
}

impl<R: Renderer> TerminalScreen<R> {
    pub fn new(renderer: R, config: &Config) -> Result<Self, io::Error> {
        assert!(
            config.rows > 0 && config.cols > 0,
            "TerminalScreen needs at least one cell"
        );
        let (w, h) = renderer.cell_size();
        assert!(
            config.cols * usize::from(w) <= usize::from(u16::MAX)
                && config.rows * usize::from(h) <= usize::from(u16::MAX),
            "TerminalScreen must fit in the renderer's 16-bit coordinates"
        );
        let mut screen = TerminalScreen {
            renderer,
            rows: config.rows,
            cols: config.cols,
            cells: vec![BLANK_GLYPH; config.rows * config.cols],
            row: 0,
            col: 0,
            wrap_pending: false,
            newline_run: 0,
            overflow: config.overflow,
            filter: config.control_filter,
            cursor: CursorBlinker::new(config.blink_interval_ms),
            echo: None,
        };
        screen.clear()?;
        Ok(screen)
    }

    /// copy every accepted character to `sink` as well (a serial console, say)
    pub fn set_echo(&mut self, sink: Box<dyn Write>) {
        self.echo = Some(sink);
    }

    pub fn write_char(&mut self, c: u8) -> Result<(), io::Error> {
        self.erase_cursor()?;
        let c = match self.accept(c) {
            Some(c) => c,
            None => return Ok(()),
        };
        self.echo(c);

        if c == LF {
            if self.wrap_pending {
                // the row is already full
                self.wrap_pending = false;
                return self.next_row();
            }
            let start = self.index(self.row, self.col);
            let end = self.index(self.row, 0) + self.cols;
            self.cells[start..end].fill(BLANK_GLYPH);
            let (x, y) = self.origin(self.row, self.col);
            let (w, h) = self.renderer.cell_size();
            let width = (self.cols - self.col) as u16 * w;
            self.renderer.fill_region(x, y, width, h, BLANK)?;
            return self.next_row();
        }

        if self.wrap_pending {
            self.wrap_pending = false;
            self.next_row()?;
        }
        let i = self.index(self.row, self.col);
        self.cells[i] = c;
        let (x, y) = self.origin(self.row, self.col);
        self.renderer.set_cursor_position(x, y)?;
        self.renderer.print_glyph(c)?;
        if self.col + 1 == self.cols {
            self.wrap_pending = true;
        } else {
            self.col += 1;
        }
        Ok(())
    }

    pub fn write_str(&mut self, text: &[u8]) -> Result<(), io::Error> {
        for c in text {
            self.write_char(*c)?;
        }
        Ok(())
    }

    /// `text` and then a line feed
    pub fn write_line(&mut self, text: &[u8]) -> Result<(), io::Error> {
        self.write_str(text)?;
        self.write_char(LF)
    }

    pub fn clear(&mut self) -> Result<(), io::Error> {
        self.cells.fill(BLANK_GLYPH);
        self.row = 0;
        self.col = 0;
        self.wrap_pending = false;
        self.newline_run = 0;
        // wiping the panel takes the cursor with it
        self.cursor.forget();
        self.renderer.fill_screen(BLANK)?;
        self.renderer.set_cursor_position(0, 0)
    }

    /// advance the cursor blink to `now_ms`
    pub fn blink(&mut self, now_ms: u64) -> Result<(), io::Error> {
        match self.cursor.tick(now_ms) {
            Some(Blink::Show) => {
                let at = (self.row, self.col);
                let (x, y) = self.origin(at.0, at.1);
                self.renderer.set_cursor_position(x, y)?;
                self.renderer.print_glyph(CURSOR_GLYPH)?;
                self.cursor.shown(at);
                Ok(())
            }
            Some(Blink::Hide) => self.erase_cursor(),
            None => Ok(()),
        }
    }

    pub fn present(&mut self) -> Result<(), io::Error> {
        self.renderer.present()
    }

    /// (row, col) of the write position; it stays on the last column while a
    /// wrap is pending
    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn cursor_visible(&self) -> bool {
        self.cursor.is_visible()
    }

    pub fn cell(&self, row: usize, col: usize) -> u8 {
        self.cells[self.index(row, col)]
    }

    pub fn row_text(&self, row: usize) -> String {
        let start = self.index(row, 0);
        self.cells[start..start + self.cols]
            .iter()
            .map(|b| *b as char)
            .collect()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    // steps 2-4: None means the character is dropped
    fn accept(&mut self, c: u8) -> Option<u8> {
        let control = c < 0x20 || c == DEL;
        if control && c != CR && c != LF && self.filter == ControlFilter::Suppress {
            trace!("dropping control code {:#04x}", c);
            return None;
        }
        let c = if c == CR { LF } else { c };
        if c == LF {
            self.newline_run = self.newline_run.saturating_add(1);
            if self.newline_run > MAX_NEWLINE_RUN {
                return None;
            }
        } else {
            self.newline_run = 0;
        }
        Some(c)
    }

    fn echo(&mut self, c: u8) {
        if let Some(sink) = self.echo.as_mut() {
            if let Err(e) = sink.write_all(&[c]).and_then(|_| sink.flush()) {
                debug!("echo failed: {}", e);
            }
        }
    }

    fn next_row(&mut self) -> Result<(), io::Error> {
        self.col = 0;
        self.row += 1;
        if self.row < self.rows {
            let (x, y) = self.origin(self.row, 0);
            return self.renderer.set_cursor_position(x, y);
        }
        match self.overflow {
            OverflowPolicy::Scroll => self.scroll(),
            OverflowPolicy::Clear => self.clear(),
        }
    }

    fn scroll(&mut self) -> Result<(), io::Error> {
        self.cells.copy_within(self.cols.., 0);
        let last = self.index(self.rows - 1, 0);
        self.cells[last..].fill(BLANK_GLYPH);
        self.redraw()?;
        self.row = self.rows - 1;
        self.col = 0;
        let (x, y) = self.origin(self.row, 0);
        self.renderer.set_cursor_position(x, y)
    }

    fn redraw(&mut self) -> Result<(), io::Error> {
        self.renderer.fill_screen(BLANK)?;
        for row in 0..self.rows {
            let (x, y) = self.origin(row, 0);
            self.renderer.set_cursor_position(x, y)?;
            let start = self.index(row, 0);
            for &glyph in &self.cells[start..start + self.cols] {
                self.renderer.print_glyph(glyph)?;
            }
        }
        Ok(())
    }

    // put back whatever the cursor glyph is covering
    fn erase_cursor(&mut self) -> Result<(), io::Error> {
        let (row, col) = match self.cursor.take_shown() {
            Some(at) => at,
            None => return Ok(()),
        };
        let (x, y) = self.origin(row, col);
        let (w, h) = self.renderer.cell_size();
        self.renderer.fill_region(x, y, w, h, BLANK)?;
        let under = self.cell(row, col);
        if under != BLANK_GLYPH {
            self.renderer.set_cursor_position(x, y)?;
            self.renderer.print_glyph(under)?;
        }
        Ok(())
    }

    fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    // top-left of a character cell in device units
    fn origin(&self, row: usize, col: usize) -> (u16, u16) {
        let (w, h) = self.renderer.cell_size();
        (col as u16 * w, row as u16 * h)
    }
}
