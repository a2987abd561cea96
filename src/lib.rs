///
/// ## Design
///
/// * the peripheral side of an Apple-1: 64K bus, PIA keyboard/display
///   registers, and a character terminal to show what the DSP register gets
/// * the 6502 is somebody else's; it's driven through `cpu::Cpu` and calls
///   back into the bus through `cpu::MemoryAccess`
/// * no cycle accuracy: the loop runs a batch of instructions per tick, then
///   polls the keyboard and blinks the cursor
/// * abstract the screen so other panels can be plugged in; starting with TUI
///   in-console
/// * no globals: the emulator owns the bus, which owns the keyboard and
///   screen, and everything else gets `&mut`
///
/// Model
///
/// Emulator
///  |-- cpu (external)
///  |-- input
///  |-- bus
///  |    |-- memory image (RAM, ROM, open space)
///  |    |-- keyboard (KBD, KBDCR)
///  |    `-- screen (DSP, DSPCR)
///  |         |-- cursor blinker
///  |         `-- renderer
///  `-- run_tick
///       |-- drain input -> keyboard (operator keys: reset, clear)
///       |-- cpu.step(bus) x steps_per_tick, watching for a stuck PC
///       `-- screen.blink(now); screen.present()
///
/// Nothing the emulated program can do is an error: ROM writes, writes to
/// read-only registers and unprintable characters are dropped, a bad reset
/// vector is repaired, a stuck PC is logged. `EmuError` is only for host
/// devices failing.
pub mod bus;
pub mod config;
pub mod cpu;
pub mod cursor;
pub mod display;
pub mod emulator;
pub mod error;
pub mod input;
pub mod keyboard;
pub mod memory;
pub mod screen;

pub use bus::{MemoryBus, Region};
pub use config::{Config, ControlFilter, OverflowPolicy};
pub use cpu::{Cpu, MemoryAccess, Registers};
pub use display::{CaptureRenderer, Renderer, TermRenderer};
pub use emulator::Emulator;
pub use error::{EmuError, Result};
pub use input::{DummyInput, Input, StdinInput};
pub use keyboard::Keyboard;
pub use screen::TerminalScreen;
