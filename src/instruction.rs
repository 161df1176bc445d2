/// # instruction set
///
/// (from: http://devernay.free.fr/hacks/chip8/C8TECH10.HTM#3.0)
/// every instruction is two bytes, most significant byte first. Operand fields:
///
///  nnn  lowest 12 bits        -- an address
///  n    lowest 4 bits         -- a count
///  x    low nibble of hi byte -- a register
///  y    hi nibble of lo byte  -- a register
///  kk   lowest 8 bits         -- an immediate byte
///
/// only a slice of the instruction set is implemented. Everything else decodes
/// to `Unsupported`, which the interpreter refuses to execute.
use std::fmt;

/// A decoded CHIP-8 instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0 CLS
    ClearScreen,
    /// 1nnn JP addr
    Jump { addr: u16 },
    /// 6xkk LD Vx, byte
    LoadImmediate { x: usize, byte: u8 },
    /// 7xkk ADD Vx, byte
    AddImmediate { x: usize, byte: u8 },
    /// Annn LD I, addr
    LoadIndex { addr: u16 },
    /// Dxyn DRW Vx, Vy, nibble
    Draw { x: usize, y: usize, rows: u8 },
    /// anything we don't (yet) know how to run
    Unsupported(u16),
}

#[inline]
fn nnn(word: u16) -> u16 {
    word & 0x0fff
}

#[inline]
fn n(word: u16) -> u8 {
    (word & 0x000f) as u8
}

#[inline]
fn x(word: u16) -> usize {
    ((word & 0x0f00) >> 8) as usize
}

#[inline]
fn y(word: u16) -> usize {
    ((word & 0x00f0) >> 4) as usize
}

#[inline]
fn kk(word: u16) -> u8 {
    (word & 0x00ff) as u8
}

impl Instruction {
    /// classify by the high nibble, then pull out the operands
    pub fn decode(word: u16) -> Self {
        match word >> 12 {
            0x0 if word == 0x00e0 => Instruction::ClearScreen,
            0x1 => Instruction::Jump { addr: nnn(word) },
            0x6 => Instruction::LoadImmediate {
                x: x(word),
                byte: kk(word),
            },
            0x7 => Instruction::AddImmediate {
                x: x(word),
                byte: kk(word),
            },
            0xa => Instruction::LoadIndex { addr: nnn(word) },
            0xd => Instruction::Draw {
                x: x(word),
                y: y(word),
                rows: n(word),
            },
            _ => Instruction::Unsupported(word),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::ClearScreen => write!(f, "CLS"),
            Instruction::Jump { addr } => write!(f, "JP {:#05X}", addr),
            Instruction::LoadImmediate { x, byte } => write!(f, "LD V{:X}, {:#04X}", x, byte),
            Instruction::AddImmediate { x, byte } => write!(f, "ADD V{:X}, {:#04X}", x, byte),
            Instruction::LoadIndex { addr } => write!(f, "LD I, {:#05X}", addr),
            Instruction::Draw { x, y, rows } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, rows),
            Instruction::Unsupported(word) => write!(f, "??? {:#06X}", word),
        }
    }
}
