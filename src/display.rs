use std::io;
use tui::backend::{Backend, CrosstermBackend};
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::text::Spans;
use tui::widgets::{Block, Borders, Paragraph};
use tui::Terminal;

/// 16-bit colour as the panel takes it
pub type Rgb565 = u16;

pub const BLANK: Rgb565 = 0x0000;
pub const PHOSPHOR: Rgb565 = 0x07e0;

/// Renderer is how the terminal gets characters onto a physical screen. It
/// works like a small TFT text API: position a pen in device units, print
/// glyphs that advance the pen by one cell, and fill rectangles. The screen
/// model never reads anything back.
pub trait Renderer {
    /// draw a glyph at the pen and move the pen one cell right
    fn print_glyph(&mut self, glyph: u8) -> Result<(), io::Error>;

    fn fill_region(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        colour: Rgb565,
    ) -> Result<(), io::Error>;

    fn set_cursor_position(&mut self, x: u16, y: u16) -> Result<(), io::Error>;

    fn fill_screen(&mut self, colour: Rgb565) -> Result<(), io::Error>;

    /// width and height of one character cell in device units
    fn cell_size(&self) -> (u16, u16);

    /// push whatever has been drawn out to the device
    fn present(&mut self) -> Result<(), io::Error> {
        Ok(())
    }
}

fn rgb565_to_color(c: Rgb565) -> Color {
    let r = ((c >> 11) & 0x1f) << 3;
    let g = ((c >> 5) & 0x3f) << 2;
    let b = (c & 0x1f) << 3;
    Color::Rgb(r as u8, g as u8, b as u8)
}

// character cells plus a pen, in device units
struct GlyphGrid {
    cols: u16,
    rows: u16,
    cell: (u16, u16),
    glyphs: Vec<u8>,
    pen: (u16, u16),
}

impl GlyphGrid {
    fn new(cols: u16, rows: u16, cell: (u16, u16)) -> Self {
        GlyphGrid {
            cols,
            rows,
            cell,
            glyphs: vec![b' '; cols as usize * rows as usize],
            pen: (0, 0),
        }
    }

    fn index(&self, x: u16, y: u16) -> Option<usize> {
        let (col, row) = (x / self.cell.0, y / self.cell.1);
        if col < self.cols && row < self.rows {
            Some(row as usize * self.cols as usize + col as usize)
        } else {
            None
        }
    }

    fn print(&mut self, glyph: u8) {
        if let Some(i) = self.index(self.pen.0, self.pen.1) {
            self.glyphs[i] = glyph;
        }
        self.pen.0 = self.pen.0.saturating_add(self.cell.0);
    }

    fn fill(&mut self, x: u16, y: u16, width: u16, height: u16) {
        let right = x.saturating_add(width);
        let bottom = y.saturating_add(height);
        for py in (y..bottom).step_by(self.cell.1 as usize) {
            for px in (x..right).step_by(self.cell.0 as usize) {
                if let Some(i) = self.index(px, py) {
                    self.glyphs[i] = b' ';
                }
            }
        }
    }

    fn clear(&mut self) {
        self.glyphs.fill(b' ');
    }

    fn glyph_at(&self, col: u16, row: u16) -> u8 {
        self.glyphs[row as usize * self.cols as usize + col as usize]
    }

    fn row_text(&self, row: u16) -> String {
        let start = row as usize * self.cols as usize;
        self.glyphs[start..start + self.cols as usize]
            .iter()
            .map(|b| printable(*b))
            .collect()
    }
}

fn printable(b: u8) -> char {
    match b {
        0x20..=0x7e => b as char,
        _ => '?',
    }
}

/// character screen in a terminal, rendered using TUI
pub struct TermRenderer<B: Backend> {
    terminal: Terminal<B>,
    grid: GlyphGrid,
    background: Color,
    dirty: bool,
}

impl TermRenderer<CrosstermBackend<io::Stdout>> {
    pub fn stdout(cols: u16, rows: u16) -> Result<Self, io::Error> {
        Self::new(CrosstermBackend::new(io::stdout()), cols, rows)
    }
}

impl<B: Backend> TermRenderer<B> {
    pub fn new(backend: B, cols: u16, rows: u16) -> Result<Self, io::Error> {
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        Ok(TermRenderer {
            terminal,
            grid: GlyphGrid::new(cols, rows, (1, 1)),
            background: rgb565_to_color(BLANK),
            dirty: true,
        })
    }

    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }
}

impl<B: Backend> Renderer for TermRenderer<B> {
    fn print_glyph(&mut self, glyph: u8) -> Result<(), io::Error> {
        self.grid.print(glyph);
        self.dirty = true;
        Ok(())
    }

    fn fill_region(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        _colour: Rgb565,
    ) -> Result<(), io::Error> {
        self.grid.fill(x, y, width, height);
        self.dirty = true;
        Ok(())
    }

    fn set_cursor_position(&mut self, x: u16, y: u16) -> Result<(), io::Error> {
        self.grid.pen = (x, y);
        Ok(())
    }

    fn fill_screen(&mut self, colour: Rgb565) -> Result<(), io::Error> {
        self.grid.clear();
        self.background = rgb565_to_color(colour);
        self.dirty = true;
        Ok(())
    }

    fn cell_size(&self) -> (u16, u16) {
        self.grid.cell
    }

    fn present(&mut self) -> Result<(), io::Error> {
        if !self.dirty {
            return Ok(());
        }
        let text: Vec<Spans> = (0..self.grid.rows)
            .map(|row| Spans::from(self.grid.row_text(row)))
            .collect();
        let (cols, rows) = (self.grid.cols, self.grid.rows);
        let style = Style::default()
            .fg(rgb565_to_color(PHOSPHOR))
            .bg(self.background);
        self.terminal.draw(|f| {
            let area = Rect::new(0, 0, cols + 2, rows + 2).intersection(f.size());
            let screen = Paragraph::new(text).style(style).block(
                Block::default()
                    .title("APPLE-1")
                    .borders(Borders::ALL)
                    .style(style),
            );
            f.render_widget(screen, area);
        })?;
        self.dirty = false;
        Ok(())
    }
}

/// one call made against a `CaptureRenderer`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCall {
    Glyph { x: u16, y: u16, glyph: u8 },
    FillRegion { x: u16, y: u16, width: u16, height: u16 },
    Cursor { x: u16, y: u16 },
    FillScreen(Rgb565),
}

/// Keeps the picture in memory and logs every call; useful for testing the
/// screen model without a terminal.
pub struct CaptureRenderer {
    grid: GlyphGrid,
    pub calls: Vec<DrawCall>,
}

impl CaptureRenderer {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self::with_cell_size(cols, rows, (1, 1))
    }

    pub fn with_cell_size(cols: u16, rows: u16, cell: (u16, u16)) -> Self {
        CaptureRenderer {
            grid: GlyphGrid::new(cols, rows, cell),
            calls: Vec::new(),
        }
    }

    /// what is showing in a character cell right now
    pub fn glyph_at(&self, col: u16, row: u16) -> u8 {
        self.grid.glyph_at(col, row)
    }

    pub fn row_text(&self, row: u16) -> String {
        self.grid.row_text(row)
    }

    pub fn screen_fills(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DrawCall::FillScreen(_)))
            .count()
    }
}

impl Renderer for CaptureRenderer {
    fn print_glyph(&mut self, glyph: u8) -> Result<(), io::Error> {
        let (x, y) = self.grid.pen;
        self.calls.push(DrawCall::Glyph { x, y, glyph });
        self.grid.print(glyph);
        Ok(())
    }

    fn fill_region(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        _colour: Rgb565,
    ) -> Result<(), io::Error> {
        self.calls.push(DrawCall::FillRegion {
            x,
            y,
            width,
            height,
        });
        self.grid.fill(x, y, width, height);
        Ok(())
    }

    fn set_cursor_position(&mut self, x: u16, y: u16) -> Result<(), io::Error> {
        self.calls.push(DrawCall::Cursor { x, y });
        self.grid.pen = (x, y);
        Ok(())
    }

    fn fill_screen(&mut self, colour: Rgb565) -> Result<(), io::Error> {
        self.calls.push(DrawCall::FillScreen(colour));
        self.grid.clear();
        Ok(())
    }

    fn cell_size(&self) -> (u16, u16) {
        self.grid.cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tui::backend::TestBackend;

    #[test]
    fn test_rgb565_conversion() {
        assert_eq!(rgb565_to_color(BLANK), Color::Rgb(0, 0, 0));
        assert_eq!(rgb565_to_color(PHOSPHOR), Color::Rgb(0, 252, 0));
        assert_eq!(rgb565_to_color(0xf800), Color::Rgb(248, 0, 0));
    }

    #[test]
    fn test_glyphs_advance_the_pen() -> Result<(), io::Error> {
        let mut r = CaptureRenderer::new(4, 2);
        r.set_cursor_position(1, 1)?;
        r.print_glyph(b'H')?;
        r.print_glyph(b'I')?;
        assert_eq!(r.row_text(1), " HI ");
        Ok(())
    }

    #[test]
    fn test_device_units_are_scaled_by_cell_size() -> Result<(), io::Error> {
        let mut r = CaptureRenderer::with_cell_size(4, 2, (8, 16));
        r.set_cursor_position(16, 16)?;
        r.print_glyph(b'Z')?;
        assert_eq!(r.glyph_at(2, 1), b'Z');
        r.fill_region(16, 16, 8, 16, BLANK)?;
        assert_eq!(r.glyph_at(2, 1), b' ');
        Ok(())
    }

    #[test]
    fn test_glyphs_off_the_edge_are_dropped() -> Result<(), io::Error> {
        let mut r = CaptureRenderer::new(2, 1);
        r.set_cursor_position(1, 0)?;
        r.print_glyph(b'A')?;
        r.print_glyph(b'B')?;
        assert_eq!(r.row_text(0), " A");
        Ok(())
    }

    #[test]
    fn test_fill_screen_blanks_everything() -> Result<(), io::Error> {
        let mut r = CaptureRenderer::new(3, 1);
        r.print_glyph(b'A')?;
        r.fill_screen(BLANK)?;
        assert_eq!(r.row_text(0), "   ");
        assert_eq!(r.screen_fills(), 1);
        Ok(())
    }

    #[test]
    fn test_term_renderer_draws_grid_inside_border() -> Result<(), io::Error> {
        let mut r = TermRenderer::new(TestBackend::new(12, 6), 4, 2)?;
        r.set_cursor_position(0, 1)?;
        for g in b"OK" {
            r.print_glyph(*g)?;
        }
        r.present()?;
        let buffer = r.backend().buffer();
        // one cell of border on each side
        assert_eq!(buffer.get(1, 2).symbol, "O");
        assert_eq!(buffer.get(2, 2).symbol, "K");
        assert_eq!(buffer.get(1, 1).symbol, " ");
        Ok(())
    }

    #[test]
    fn test_term_renderer_survives_tiny_terminal() -> Result<(), io::Error> {
        let mut r = TermRenderer::new(TestBackend::new(3, 3), 30, 8)?;
        r.print_glyph(b'A')?;
        r.present()
    }
}
