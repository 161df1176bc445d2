use crate::error::Chip8Error;

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// Represents the memory map. Every access is bounds-checked: reads and
/// writes that would leave memory fail rather than wrap or clamp.
pub trait MemoryMap {
    /// write a chunk of bytes into RAM, one byte per increasing address
    fn write(&mut self, data: &[u8], addr: u16) -> Result<(), Chip8Error> {
        let bytes = self
            .get_rw_slice(addr, data.len())
            .ok_or(Chip8Error::ProgramTooLarge {
                offset: addr,
                len: data.len(),
            })?;
        bytes.copy_from_slice(data);
        Ok(())
    }

    /// get a single byte
    fn read_byte(&self, addr: u16) -> Result<u8, Chip8Error> {
        self.get_ro_slice(addr, 1)
            .map(|b| b[0])
            .ok_or(Chip8Error::MemoryOutOfBounds { addr, len: 1 })
    }

    /// get a r/w slice of the underlying memory, if it is all in range
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> Option<&mut [u8]>;

    /// get a r/o slice of the underlying memory, if it is all in range
    fn get_ro_slice(&self, addr: u16, len: usize) -> Option<&[u8]>;
}

/// how much RAM we have
pub const CHIP8_RAM_SIZE_BYTES: usize = 4096;

/// where the program is loaded
pub const CHIP8_PROGRAM_ADDR: u16 = 0x0200;

/// where the hex digit glyphs live
pub const CHIP8_FONT_ADDR: u16 = 0x000;

/// CHIP-8 memory: 4K of RAM with the font baked in at the bottom.
///
///   0x0000-0x004f  font, 16 glyphs x 5 bytes
///   0x0050-0x01ff  unused
///   0x0200-0x0fff  program
pub struct Chip8MemoryMap {
    bytes: Box<[u8]>,
    pub program_addr: u16,
}

impl MemoryMap for Chip8MemoryMap {
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> Option<&mut [u8]> {
        let a = addr as usize;
        self.bytes.get_mut(a..a.checked_add(len)?)
    }
    fn get_ro_slice(&self, addr: u16, len: usize) -> Option<&[u8]> {
        let a = addr as usize;
        self.bytes.get(a..a.checked_add(len)?)
    }
}

impl Chip8MemoryMap {
    /// zeroed memory with the font table loaded
    pub fn new() -> Result<Self, Chip8Error> {
        let mut mm = Chip8MemoryMap {
            bytes: vec![0u8; CHIP8_RAM_SIZE_BYTES].into_boxed_slice(),
            program_addr: CHIP8_PROGRAM_ADDR,
        };
        mm.write(&CHIP8_FONT, CHIP8_FONT_ADDR)?;
        Ok(mm)
    }

    /// load a CHIP-8 program at 0x200
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), Chip8Error> {
        self.write(program, self.program_addr)
    }

    /// the whole of memory, read-only
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

pub const CHIP8_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];
