//! Blinking cursor. This only decides *when* the cursor appears and vanishes;
//! `TerminalScreen::blink` does the painting, because only the screen knows
//! what is underneath.

/// cursor glyph the Apple-1 flashes at the write position
pub const CURSOR_GLYPH: u8 = b'@';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blink {
    Show,
    Hide,
}

#[derive(Debug)]
pub struct CursorBlinker {
    interval_ms: u64,
    last_toggle_ms: u64,
    /// (row, col) the glyph is painted on, while it is visible
    shown_at: Option<(usize, usize)>,
}

impl CursorBlinker {
    pub fn new(interval_ms: u64) -> Self {
        CursorBlinker {
            interval_ms,
            last_toggle_ms: 0,
            shown_at: None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.shown_at.is_some()
    }

    /// Which way to toggle, if a full interval has passed since the last
    /// toggle. The caller must follow up with `shown`/`take_shown`.
    pub fn tick(&mut self, now_ms: u64) -> Option<Blink> {
        if now_ms.saturating_sub(self.last_toggle_ms) < self.interval_ms {
            return None;
        }
        self.last_toggle_ms = now_ms;
        Some(if self.is_visible() {
            Blink::Hide
        } else {
            Blink::Show
        })
    }

    /// the glyph went up at (row, col)
    pub fn shown(&mut self, at: (usize, usize)) {
        self.shown_at = Some(at);
    }

    /// where the glyph was, if it is up; it counts as gone afterwards
    pub fn take_shown(&mut self) -> Option<(usize, usize)> {
        self.shown_at.take()
    }

    /// forget the glyph without repainting, e.g. when the screen was wiped
    pub fn forget(&mut self) {
        self.shown_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggles_once_per_interval() {
        let mut c = CursorBlinker::new(500);
        assert_eq!(c.tick(499), None);
        assert_eq!(c.tick(500), Some(Blink::Show));
        c.shown((0, 0));
        assert_eq!(c.tick(999), None);
        assert_eq!(c.tick(1000), Some(Blink::Hide));
        assert_eq!(c.take_shown(), Some((0, 0)));
        assert_eq!(c.tick(1500), Some(Blink::Show));
    }

    #[test]
    fn test_interval_runs_from_last_toggle() {
        let mut c = CursorBlinker::new(500);
        // a late tick moves the phase rather than catching up
        assert_eq!(c.tick(730), Some(Blink::Show));
        c.shown((1, 1));
        assert_eq!(c.tick(1000), None);
        assert_eq!(c.tick(1229), None);
        assert_eq!(c.tick(1230), Some(Blink::Hide));
    }

    #[test]
    fn test_take_shown_hides() {
        let mut c = CursorBlinker::new(500);
        c.shown((2, 3));
        assert!(c.is_visible());
        assert_eq!(c.take_shown(), Some((2, 3)));
        assert!(!c.is_visible());
        assert_eq!(c.take_shown(), None);
    }

    #[test]
    fn test_clock_going_backwards_does_not_blink() {
        let mut c = CursorBlinker::new(500);
        assert_eq!(c.tick(600), Some(Blink::Show));
        assert_eq!(c.tick(10), None);
    }
}
