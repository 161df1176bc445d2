///
/// ## Design
///
/// * a partial CHIP-8: clear screen, jump, load/add immediate, load index and
///   draw. Anything else stops the interpreter with an error naming the word
///   and where it was fetched from, so gaps show up straight away
/// * instructions are decoded into an enum before they're executed; adding an
///   instruction family means adding a variant and its arm
/// * abstract display so can plug alternatives:
///    - text: prints the grid as 0s and 1s, for debugging
///    - window: a TUI canvas on its own thread, fed whole frames over a
///      one-frame channel that always holds the newest picture
///    - headless: keeps the grid, shows nothing
/// * memory is bounds-checked; loading or reading past 4K is an error
/// * quirks are configurable where interpreters disagree:
///    - sprites running off the screen: error (default) or wrap
///    - VF after a draw: result of the last toggle (default) or any erasure
///
/// Model
///
/// main
///  |-- display(window config)
///  |-- interpreter(display, quirks)
///  |    |-- memory: font at 0x000, program at 0x200
///  |    `-- registers, I, PC, stack, timers
///  `-- interpreter.run(program)
///       `-- loop { fetch; decode; execute } until error or display closed
pub mod config;
pub mod display;
pub mod error;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod text_display;
pub mod window_display;

pub use error::{Chip8Error, DisplayError};
pub use interpreter::Chip8Interpreter;
