use std::io;
use thiserror::Error;

/// Failures raised by a display surface. These are reported by whichever side of the
/// display owns the failing resource and never leave the interpreter half-executed.
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("pixel ({x}, {y}) is outside the 64x32 display")]
    PixelOutOfBounds { x: u16, y: u16 },

    #[error("terminal error: {0}")]
    Io(#[from] io::Error),

    #[error("renderer thread panicked")]
    RendererPanicked,
}

/// Unrecoverable interpreter failures; any of these ends the current run.
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("unknown instruction {opcode:#06X} at {addr:#05X}")]
    UnknownOpcode { addr: u16, opcode: u16 },

    #[error("{len} byte(s) at {offset:#05X} do not fit in memory")]
    ProgramTooLarge { offset: u16, len: usize },

    #[error("memory access out of bounds: {len} byte(s) at {addr:#05X}")]
    MemoryOutOfBounds { addr: u16, len: usize },

    #[error("program counter {pc:#06X} is past the end of memory")]
    ProgramCounterOutOfBounds { pc: u16 },

    #[error("sprite of {rows} row(s) at I={index:#05X} runs past memory ({opcode:#06X} at {addr:#05X})")]
    SpriteOutOfBounds {
        addr: u16,
        opcode: u16,
        index: u16,
        rows: u8,
    },

    #[error("display failed executing {opcode:#06X} at {addr:#05X}: {source}")]
    Display {
        addr: u16,
        opcode: u16,
        #[source]
        source: DisplayError,
    },
}
