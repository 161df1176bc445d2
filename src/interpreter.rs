/// # interpreter
///
/// (from: http://devernay.free.fr/hacks/chip8/C8TECH10.HTM#2.2)
/// the machine state a CHIP-8 program can see:
///  V0-VF  16 8bit general purpose registers; VF doubles as the carry/collision flag
///  I      16bit index register, holds a memory address
///  PC     program counter                     -- 0x200
///  stack  16bit return addresses              -- empty; nothing pushes yet
///  DT     delay timer, 60Hz                   -- present but nothing drives it
///  ST     sound timer, 60Hz                   -- ditto
///
/// each cycle fetches two bytes at PC (PC += 2), decodes them, executes.
use crate::config::{CollisionMode, CoordinatePolicy, Quirks};
use crate::display::{self, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::error::{Chip8Error, DisplayError};
use crate::instruction::Instruction;
use crate::memory::{self, MemoryMap};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// the collision/carry flag register
const VF: usize = 0xf;

pub struct Chip8Interpreter<'a> {
    memory: memory::Chip8MemoryMap,
    display: &'a mut dyn display::Display,
    quirks: Quirks,
    registers: [u8; 16],
    index: u16,
    program_counter: u16,
    stack: Vec<u16>,
    delay_timer: u8,
    sound_timer: u8,
    cycle_time: Option<Duration>,
}

impl<'a> Chip8Interpreter<'a> {
    pub fn new(display: &'a mut dyn display::Display) -> Result<Chip8Interpreter<'a>, Chip8Error> {
        Chip8Interpreter::with_quirks(display, Quirks::default())
    }

    pub fn with_quirks(
        display: &'a mut dyn display::Display,
        quirks: Quirks,
    ) -> Result<Chip8Interpreter<'a>, Chip8Error> {
        let m = memory::Chip8MemoryMap::new()?;
        let program_counter = m.program_addr;
        Ok(Chip8Interpreter {
            memory: m,
            display,
            quirks,
            registers: [0; 16],
            index: 0x0000,
            program_counter,
            stack: Vec::with_capacity(16),
            delay_timer: 0x00,
            sound_timer: 0x00,
            cycle_time: None,
        })
    }

    /// pace the run loop to roughly `hz` instructions per second; None runs
    /// flat out
    pub fn set_speed(&mut self, hz: Option<u32>) {
        self.cycle_time = hz
            .filter(|&hz| hz > 0)
            .map(|hz| Duration::from_secs(1) / hz);
    }

    /// copy bytes into memory at `offset`; fails if they don't all fit
    pub fn load(&mut self, bytes: &[u8], offset: u16) -> Result<(), Chip8Error> {
        self.memory.write(bytes, offset)
    }

    /// load a chip8 program at 0x200
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), Chip8Error> {
        self.memory.load_program(program)
    }

    /// load a program and run it until it fails or the display goes away.
    /// There is no halt instruction, so this only returns Ok for the latter.
    pub fn run(&mut self, program: &[u8]) -> Result<(), Chip8Error> {
        self.load_program(program)?;
        debug!(bytes = program.len(), "program loaded, running");
        let mut next = Instant::now();
        while !self.display.is_closed() {
            self.step()?;
            if let Some(cycle_time) = self.cycle_time {
                next += cycle_time;
                let now = Instant::now();
                if next > now {
                    spin_sleep::sleep(next - now);
                } else {
                    // running behind; don't try to catch up in a burst
                    next = now;
                }
            }
        }
        debug!("display closed, stopping");
        Ok(())
    }

    /// run exactly `cycles` instructions of whatever is already loaded
    pub fn main_loop(&mut self, cycles: u64) -> Result<(), Chip8Error> {
        for _ in 0..cycles {
            self.step()?;
        }
        Ok(())
    }

    /// one fetch/decode/execute cycle
    pub fn step(&mut self) -> Result<(), Chip8Error> {
        let addr = self.program_counter;
        let opcode = self.fetch()?;
        let instruction = Instruction::decode(opcode);
        trace!("{:#05X}: {:04X}  {}", addr, opcode, instruction);
        self.execute(instruction, addr, opcode)
    }

    /// read the instruction at PC: high byte then low byte, PC moving on
    /// after each read. If either read falls off the end of memory PC is put
    /// back where the instruction started, and that is the address reported
    fn fetch(&mut self) -> Result<u16, Chip8Error> {
        let addr = self.program_counter;
        self.fetch_word().map_err(|_| {
            self.program_counter = addr;
            Chip8Error::ProgramCounterOutOfBounds { pc: addr }
        })
    }

    fn fetch_word(&mut self) -> Result<u16, Chip8Error> {
        let hi = self.fetch_byte()?;
        let lo = self.fetch_byte()?;
        Ok(((hi as u16) << 8) | lo as u16)
    }

    fn fetch_byte(&mut self) -> Result<u8, Chip8Error> {
        let byte = self.memory.read_byte(self.program_counter)?;
        self.program_counter = self.program_counter.wrapping_add(1);
        Ok(byte)
    }

    fn execute(&mut self, instruction: Instruction, addr: u16, opcode: u16) -> Result<(), Chip8Error> {
        match instruction {
            Instruction::ClearScreen => self.display.clear(),
            Instruction::Jump { addr } => self.program_counter = addr,
            Instruction::LoadImmediate { x, byte } => self.registers[x] = byte,
            Instruction::AddImmediate { x, byte } => {
                // NB. no carry into VF for this one
                self.registers[x] = self.registers[x].wrapping_add(byte)
            }
            Instruction::LoadIndex { addr } => self.index = addr,
            Instruction::Draw { x, y, rows } => self.draw(x, y, rows, addr, opcode)?,
            Instruction::Unsupported(opcode) => {
                return Err(Chip8Error::UnknownOpcode { addr, opcode })
            }
        }
        Ok(())
    }

    /// Dxyn: XOR an 8 x n sprite from memory[I..] onto the display at (Vx, Vy),
    /// most significant bit leftmost, then render once.
    fn draw(&mut self, x: usize, y: usize, rows: u8, addr: u16, opcode: u16) -> Result<(), Chip8Error> {
        let sprite = self
            .memory
            .get_ro_slice(self.index, rows as usize)
            .ok_or(Chip8Error::SpriteOutOfBounds {
                addr,
                opcode,
                index: self.index,
                rows,
            })?;
        let (origin_x, origin_y) = (self.registers[x] as u16, self.registers[y] as u16);
        let mut any_erased = false;
        let mut last_erased = None;
        for (r, &line) in sprite.iter().enumerate() {
            for c in 0..8u16 {
                if line & (0x80 >> c) == 0 {
                    continue;
                }
                let (px, py) = self.pixel_coordinates(origin_x + c, origin_y + r as u16);
                let erased = self
                    .display
                    .set_pixel(px, py)
                    .map_err(|source| Chip8Error::Display { addr, opcode, source })?;
                any_erased |= erased;
                last_erased = Some(erased);
            }
        }
        match self.quirks.collision {
            CollisionMode::LastToggle => {
                if let Some(erased) = last_erased {
                    self.registers[VF] = erased as u8;
                }
            }
            CollisionMode::AnyErased => self.registers[VF] = any_erased as u8,
        }
        self.display
            .render()
            .map_err(|source| Chip8Error::Display { addr, opcode, source })
    }

    fn pixel_coordinates(&self, x: u16, y: u16) -> (u16, u16) {
        match self.quirks.coordinates {
            CoordinatePolicy::Error => (x, y),
            CoordinatePolicy::Wrap => (x % DISPLAY_WIDTH as u16, y % DISPLAY_HEIGHT as u16),
        }
    }

    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    /// value of register Vx; only the low nibble of `x` counts
    pub fn register(&self, x: usize) -> u8 {
        self.registers[x & 0xf]
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn memory(&self) -> &[u8] {
        self.memory.as_slice()
    }
}

impl std::fmt::Debug for Chip8Interpreter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chip8Interpreter")
            .field("pc", &format_args!("{:#05X}", self.program_counter))
            .field("i", &format_args!("{:#05X}", self.index))
            .field("v", &self.registers)
            .field("stack", &self.stack)
            .finish_non_exhaustive()
    }
}

/// true for errors caused by the display rather than the program
pub fn is_display_failure(e: &Chip8Error) -> bool {
    matches!(
        e,
        Chip8Error::Display {
            source: DisplayError::Io(_) | DisplayError::RendererPanicked,
            ..
        }
    )
}
