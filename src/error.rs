use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmuError>;

/// Failures of the host devices around the emulated machine. Nothing the
/// emulated program does can produce one of these.
#[derive(Debug, Error)]
pub enum EmuError {
    #[error("renderer failed: {0}")]
    Render(#[source] io::Error),
    #[error("input failed: {0}")]
    Ingress(#[source] io::Error),
    #[error("image of {len} bytes does not fit at {addr:#06x}")]
    ImageTooLarge { addr: u16, len: usize },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
