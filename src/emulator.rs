//! # emulator
//!
//! One scheduling tick is, in order:
//!  1. drain the host keyboard into KBD (operator keys are handled here and
//!     never reach the machine)
//!  2. run a batch of CPU steps; the CPU reaches the keyboard and screen
//!     through the bus as it goes
//!  3. report any renderer failure that happened during the batch
//!  4. blink the cursor and flush the screen
//!
//! Batching lots of steps per tick keeps the polling and blinking overhead
//! small next to the CPU work.
use log::{debug, info, warn};
use std::time::{Duration, Instant};

use crate::bus::MemoryBus;
use crate::config::Config;
use crate::cpu::Cpu;
use crate::display::Renderer;
use crate::error::{EmuError, Result};
use crate::input::Input;
use crate::screen::TerminalScreen;

/// Ctrl-R: reset the whole machine
pub const RESET_KEY: u8 = 0x12;
/// Ctrl-L: clear the screen only
pub const CLEAR_KEY: u8 = 0x0c;

/// the Apple-1 has no backspace; the monitor treats `_` as rubout
const RUBOUT: u8 = b'_';

fn remap_key(c: u8) -> u8 {
    match c {
        0x08 | 0x7f => RUBOUT,
        c => c,
    }
}

pub struct Emulator<C: Cpu, R: Renderer, I: Input> {
    cpu: C,
    bus: MemoryBus<R>,
    input: I,
    steps_per_tick: u32,
    stall_threshold: u64,
    tick_period: Duration,
    /// consecutive steps that left PC where it was
    stalled_steps: u64,
    stall_reports: u64,
}

impl<C: Cpu, R: Renderer, I: Input> Emulator<C, R, I> {
    pub fn new(mut cpu: C, renderer: R, input: I, config: &Config) -> Result<Self> {
        let screen = TerminalScreen::new(renderer, config).map_err(EmuError::Render)?;
        let mut bus = MemoryBus::new(screen, config.rom.clone());
        cpu.reset(&mut bus);
        info!("starting at {}", cpu.registers());
        Ok(Emulator {
            cpu,
            bus,
            input,
            steps_per_tick: config.steps_per_tick,
            stall_threshold: config.stall_threshold.max(1),
            tick_period: config.tick_period,
            stalled_steps: 0,
            stall_reports: 0,
        })
    }

    /// the reset button: memory, keyboard, screen and CPU
    pub fn reset(&mut self) -> Result<()> {
        self.bus.reset();
        self.bus.keyboard_mut().reset();
        self.bus.screen_mut().clear().map_err(EmuError::Render)?;
        self.cpu.reset(&mut self.bus);
        self.stalled_steps = 0;
        info!("reset to {}", self.cpu.registers());
        self.check_fault()
    }

    pub fn run_tick(&mut self, now_ms: u64) -> Result<()> {
        self.drain_input()?;
        for _ in 0..self.steps_per_tick {
            self.step();
        }
        self.check_fault()?;
        let screen = self.bus.screen_mut();
        screen.blink(now_ms).map_err(EmuError::Render)?;
        screen.present().map_err(EmuError::Render)
    }

    /// Run `ticks` ticks, or forever, one every `tick_period`. Time handed to
    /// the cursor is measured from the start of the run.
    pub fn run(&mut self, ticks: Option<u64>) -> Result<()> {
        let start = Instant::now();
        let mut done = 0;
        while ticks.map_or(true, |t| done < t) {
            let tick_start = Instant::now();
            self.run_tick(start.elapsed().as_millis() as u64)?;
            done += 1;
            if let Some(rest) = self.tick_period.checked_sub(tick_start.elapsed()) {
                spin_sleep::sleep(rest);
            }
        }
        Ok(())
    }

    fn drain_input(&mut self) -> Result<()> {
        while let Some(c) = self.input.poll_char().map_err(EmuError::Ingress)? {
            match c {
                RESET_KEY => {
                    info!("operator reset");
                    self.reset()?;
                }
                CLEAR_KEY => {
                    debug!("operator clear screen");
                    self.bus.screen_mut().clear().map_err(EmuError::Render)?;
                }
                c => self.bus.keyboard_mut().ingress(remap_key(c)),
            }
        }
        Ok(())
    }

    fn step(&mut self) {
        let before = self.cpu.registers().pc;
        self.cpu.step(&mut self.bus);
        if self.cpu.registers().pc != before {
            self.stalled_steps = 0;
            return;
        }
        // spinning on KBDCR looks just like this, so it's only ever a warning
        self.stalled_steps += 1;
        if self.stalled_steps >= self.stall_threshold {
            warn!(
                "PC unchanged for {} steps: {}",
                self.stalled_steps,
                self.cpu.registers()
            );
            self.stall_reports += 1;
            self.stalled_steps = 0;
        }
    }

    fn check_fault(&mut self) -> Result<()> {
        match self.bus.take_fault() {
            Some(e) => Err(EmuError::Render(e)),
            None => Ok(()),
        }
    }

    pub fn cpu(&self) -> &C {
        &self.cpu
    }

    pub fn bus(&self) -> &MemoryBus<R> {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut MemoryBus<R> {
        &mut self.bus
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    /// how many stuck-PC warnings have gone out
    pub fn stall_reports(&self) -> u64 {
        self.stall_reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::{MemoryAccess, Registers};
    use crate::cursor::CURSOR_GLYPH;
    use crate::display::{CaptureRenderer, Rgb565};
    use crate::input::DummyInput;
    use crate::keyboard::CR;
    use crate::memory::{DSP, KBD, KBDCR, RESET_VECTOR};
    use std::io;

    /// never moves; like a program parked in a tight loop
    #[derive(Default)]
    struct IdleCpu {
        regs: Registers,
        steps: u64,
        resets: u32,
    }

    impl Cpu for IdleCpu {
        fn registers(&self) -> &Registers {
            &self.regs
        }
        fn reset(&mut self, memory: &mut dyn MemoryAccess) {
            let lo = memory.read(RESET_VECTOR);
            let hi = memory.read(RESET_VECTOR + 1);
            self.regs = Registers {
                pc: u16::from_le_bytes([lo, hi]),
                ..Registers::default()
            };
            self.resets += 1;
        }
        fn step(&mut self, _memory: &mut dyn MemoryAccess) {
            self.steps += 1;
        }
    }

    /// PC moves every step
    #[derive(Default)]
    struct RunningCpu {
        regs: Registers,
    }

    impl Cpu for RunningCpu {
        fn registers(&self) -> &Registers {
            &self.regs
        }
        fn reset(&mut self, _memory: &mut dyn MemoryAccess) {
            self.regs = Registers::default();
        }
        fn step(&mut self, _memory: &mut dyn MemoryAccess) {
            self.regs.pc = self.regs.pc.wrapping_add(1);
        }
    }

    /// Echoes what it reads from the keyboard and, on return, prints the sum
    /// of the line it was given. Spins on KBDCR while nothing is pending.
    #[derive(Default)]
    struct AdderCpu {
        regs: Registers,
        line: Vec<u8>,
    }

    impl AdderCpu {
        fn sum(&self) -> u32 {
            self.line
                .split(|c| *c == b'+')
                .filter_map(|n| std::str::from_utf8(n).ok()?.parse::<u32>().ok())
                .sum()
        }
    }

    impl Cpu for AdderCpu {
        fn registers(&self) -> &Registers {
            &self.regs
        }
        fn reset(&mut self, _memory: &mut dyn MemoryAccess) {
            self.regs = Registers::default();
            self.line.clear();
        }
        fn step(&mut self, memory: &mut dyn MemoryAccess) {
            if memory.read(KBDCR) & 0x80 == 0 {
                return;
            }
            let key = memory.read(KBD);
            self.regs.pc = self.regs.pc.wrapping_add(1);
            if key & 0x7f == CR {
                memory.write(DSP, b'=' | 0x80);
                for d in self.sum().to_string().bytes() {
                    memory.write(DSP, d | 0x80);
                }
                self.line.clear();
            } else {
                self.line.push(key & 0x7f);
                memory.write(DSP, key);
            }
        }
    }

    /// every glyph fails to draw
    struct BrokenRenderer;

    impl Renderer for BrokenRenderer {
        fn print_glyph(&mut self, _glyph: u8) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "panel gone"))
        }
        fn fill_region(&mut self, _: u16, _: u16, _: u16, _: u16, _: Rgb565) -> io::Result<()> {
            Ok(())
        }
        fn set_cursor_position(&mut self, _x: u16, _y: u16) -> io::Result<()> {
            Ok(())
        }
        fn fill_screen(&mut self, _colour: Rgb565) -> io::Result<()> {
            Ok(())
        }
        fn cell_size(&self) -> (u16, u16) {
            (1, 1)
        }
    }

    fn emulator<C: Cpu>(cpu: C, keys: &[u8], config: &Config) -> Emulator<C, CaptureRenderer, DummyInput> {
        let renderer = CaptureRenderer::new(config.cols as u16, config.rows as u16);
        Emulator::new(cpu, renderer, DummyInput::new(keys), config).unwrap()
    }

    #[test]
    fn test_cpu_starts_from_reset_vector() {
        let e = emulator(IdleCpu::default(), b"", &Config::default());
        assert_eq!(e.cpu().regs.pc, 0xff00);
        assert_eq!(e.cpu().resets, 1);
    }

    #[test]
    fn test_runs_a_batch_per_tick() -> Result<()> {
        let config = Config {
            steps_per_tick: 1000,
            ..Config::default()
        };
        let mut e = emulator(IdleCpu::default(), b"", &config);
        e.run_tick(0)?;
        e.run_tick(1)?;
        assert_eq!(e.cpu().steps, 2000);
        Ok(())
    }

    #[test]
    fn test_stuck_pc_is_reported_not_fatal() -> Result<()> {
        let config = Config {
            steps_per_tick: 120,
            stall_threshold: 50,
            ..Config::default()
        };
        let mut e = emulator(IdleCpu::default(), b"", &config);
        e.run_tick(0)?;
        assert_eq!(e.stall_reports(), 2);
        e.run_tick(1)?;
        assert_eq!(e.stall_reports(), 4);
        assert_eq!(e.cpu().steps, 240);
        Ok(())
    }

    #[test]
    fn test_moving_pc_is_not_reported() -> Result<()> {
        let config = Config {
            steps_per_tick: 500,
            stall_threshold: 10,
            ..Config::default()
        };
        let mut e = emulator(RunningCpu::default(), b"", &config);
        e.run_tick(0)?;
        assert_eq!(e.stall_reports(), 0);
        assert_eq!(e.cpu().regs.pc, 500);
        Ok(())
    }

    #[test]
    fn test_keys_reach_the_keyboard_register() -> Result<()> {
        let mut e = emulator(IdleCpu::default(), b"q", &Config::default());
        e.run_tick(0)?;
        assert_eq!(e.bus().peek(KBD), b'Q' | 0x80);
        Ok(())
    }

    #[test]
    fn test_host_backspace_becomes_rubout() -> Result<()> {
        let mut e = emulator(IdleCpu::default(), &[0x08], &Config::default());
        e.run_tick(0)?;
        assert_eq!(e.bus().peek(KBD), 0xdf);
        e.input_mut().push(&[0x7f]);
        e.run_tick(1)?;
        assert_eq!(e.bus().peek(KBD), 0xdf);
        Ok(())
    }

    #[test]
    fn test_operator_reset() -> Result<()> {
        let mut e = emulator(IdleCpu::default(), b"", &Config::default());
        e.bus_mut().write(0x0200, 0x55);
        e.bus_mut().screen_mut().write_char(b'X').map_err(EmuError::Render)?;
        e.input_mut().push(&[b'K', RESET_KEY]);
        e.run_tick(0)?;
        assert_eq!(e.cpu().resets, 2);
        assert_eq!(e.bus().peek(0x0200), 0x00);
        assert_eq!(e.bus().screen().cursor(), (0, 0));
        assert_eq!(e.bus().screen().cell(0, 0), b' ');
        assert!(!e.bus().keyboard().is_ready());
        Ok(())
    }

    #[test]
    fn test_operator_clear_leaves_machine_running() -> Result<()> {
        let mut e = emulator(IdleCpu::default(), b"", &Config::default());
        e.bus_mut().write(0x0200, 0x55);
        e.bus_mut().screen_mut().write_char(b'X').map_err(EmuError::Render)?;
        e.input_mut().push(&[CLEAR_KEY]);
        e.run_tick(0)?;
        assert_eq!(e.cpu().resets, 1);
        assert_eq!(e.bus().peek(0x0200), 0x55);
        assert_eq!(e.bus().screen().cell(0, 0), b' ');
        assert_eq!(e.bus().screen().renderer().row_text(0).trim(), "");
        Ok(())
    }

    #[test]
    fn test_cursor_blinks_after_the_batch() -> Result<()> {
        let mut e = emulator(IdleCpu::default(), b"", &Config::default());
        e.run_tick(100)?;
        assert!(!e.bus().screen().cursor_visible());
        e.run_tick(500)?;
        assert!(e.bus().screen().cursor_visible());
        assert_eq!(e.bus().screen().renderer().glyph_at(0, 0), CURSOR_GLYPH);
        Ok(())
    }

    #[test]
    fn test_adds_one_and_one() -> Result<()> {
        let mut e = emulator(AdderCpu::default(), b"", &Config::default());
        for (t, c) in b"1+1\r".iter().enumerate() {
            e.input_mut().push(&[*c]);
            e.run_tick(t as u64)?;
        }
        let screen = e.bus().screen();
        assert_eq!(&screen.row_text(0)[..6], "1+1=2 ");
        assert_eq!(screen.cursor(), (0, 5));
        assert_eq!(&screen.renderer().row_text(0)[..5], "1+1=2");
        Ok(())
    }

    #[test]
    fn test_cr_lf_from_host_is_one_return() -> Result<()> {
        let mut e = emulator(AdderCpu::default(), b"", &Config::default());
        for (t, c) in b"2+3\r\n".iter().enumerate() {
            e.input_mut().push(&[*c]);
            e.run_tick(t as u64)?;
        }
        // a second return would have printed "=0" too
        assert_eq!(e.bus().screen().row_text(0).trim_end(), "2+3=5");
        Ok(())
    }

    #[test]
    fn test_render_failure_surfaces_after_batch() {
        let mut e = Emulator::new(
            AdderCpu::default(),
            BrokenRenderer,
            DummyInput::new(b"7"),
            &Config::default(),
        )
        .unwrap();
        assert!(matches!(e.run_tick(0), Err(EmuError::Render(_))));
        // reported once, then the machine carries on
        assert!(e.run_tick(1).is_ok());
    }

    #[test]
    fn test_run_paces_ticks() -> Result<()> {
        let config = Config {
            steps_per_tick: 10,
            tick_period: Duration::from_millis(2),
            ..Config::default()
        };
        let mut e = emulator(IdleCpu::default(), b"", &config);
        let start = Instant::now();
        e.run(Some(3))?;
        assert_eq!(e.cpu().steps, 30);
        assert!(start.elapsed() >= Duration::from_millis(6));
        Ok(())
    }
}
