use std::borrow::Cow;
use std::time::Duration;

use crate::memory::WOZ_MONITOR;

/// what happens when the cursor moves past the last row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// shift everything up a row and redraw from the buffer
    Scroll,
    /// throw the screen away and start again at the top
    Clear,
}

/// which control codes reach the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFilter {
    /// drop everything below 0x20 and DEL, apart from CR and LF
    Suppress,
    /// only CR and LF are special; anything else is drawn as a glyph
    Permissive,
}

/// Everything tunable about the machine. The defaults match the reference
/// hardware: a 30x8 character panel fed by the Woz Monitor.
#[derive(Debug, Clone)]
pub struct Config {
    pub rows: usize,
    pub cols: usize,
    pub overflow: OverflowPolicy,
    pub control_filter: ControlFilter,
    /// CPU steps per scheduling tick
    pub steps_per_tick: u32,
    /// consecutive steps with an unchanged PC before we complain
    pub stall_threshold: u64,
    pub blink_interval_ms: u64,
    pub tick_period: Duration,
    /// loaded into 0xff00-0xffff at every reset
    pub rom: Cow<'static, [u8]>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rows: 8,
            cols: 30,
            overflow: OverflowPolicy::Scroll,
            control_filter: ControlFilter::Suppress,
            steps_per_tick: 1000,
            stall_threshold: 50_000,
            blink_interval_ms: 500,
            tick_period: Duration::from_millis(1),
            rom: Cow::Borrowed(&WOZ_MONITOR),
        }
    }
}
