use clap::{Parser, ValueEnum};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chip8::config::{CollisionMode, CoordinatePolicy, Quirks, WindowConfig};
use chip8::display::{Display, HeadlessDisplay};
use chip8::interpreter::{is_display_failure, Chip8Interpreter};
use chip8::text_display::TextDisplay;
use chip8::window_display::WindowDisplay;
use chip8::Chip8Error;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum DisplayKind {
    /// TUI canvas on its own thread
    Window,
    /// print the grid as 0s and 1s after every draw
    Text,
    /// no output at all
    Headless,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Collision {
    /// VF holds the result of the last pixel toggled
    Last,
    /// VF = 1 if any pixel in the sprite was erased
    Any,
}

#[derive(Parser, Debug)]
#[command(name = "chip8-vm", about = "Run a CHIP-8 program.")]
struct Args {
    /// program image, loaded at 0x200
    #[arg(value_name = "ROM")]
    rom: PathBuf,

    /// where to show the display
    #[arg(long, value_enum, default_value_t = DisplayKind::Window)]
    display: DisplayKind,

    /// canvas units per CHIP-8 pixel (window display)
    #[arg(long, default_value_t = chip8::config::DEFAULT_PIXEL_SCALE)]
    scale: u16,

    /// how often the canvas checks for new frames, in milliseconds
    #[arg(long, default_value_t = 1)]
    poll_ms: u64,

    /// instructions per second; 0 runs flat out
    #[arg(long, default_value_t = 700)]
    hz: u32,

    /// stop after this many instructions instead of running until closed
    #[arg(long, value_name = "N")]
    cycles: Option<u64>,

    /// wrap sprites around the screen edges instead of failing
    #[arg(long, default_value_t = false)]
    wrap: bool,

    /// how VF reports sprite collisions
    #[arg(long, value_enum, default_value_t = Collision::Last)]
    collision: Collision,
}

impl Args {
    fn quirks(&self) -> Quirks {
        Quirks {
            coordinates: if self.wrap {
                CoordinatePolicy::Wrap
            } else {
                CoordinatePolicy::Error
            },
            collision: match self.collision {
                Collision::Last => CollisionMode::LastToggle,
                Collision::Any => CollisionMode::AnyErased,
            },
        }
    }

    fn window_config(&self) -> WindowConfig {
        WindowConfig {
            pixel_scale: self.scale,
            poll_interval: Duration::from_millis(self.poll_ms.max(1)),
            ..WindowConfig::default()
        }
    }
}

/// why a run ended early, with the machine state at that point
struct Stopped {
    error: Chip8Error,
    state: Option<String>,
}

impl From<Chip8Error> for Stopped {
    fn from(error: Chip8Error) -> Self {
        Stopped { error, state: None }
    }
}

/// runs the program; nothing is logged here, since the window display owns
/// the terminal until it is shut down
fn run(args: &Args, display: &mut dyn Display, program: &[u8]) -> Result<(), Stopped> {
    let mut interpreter = Chip8Interpreter::with_quirks(display, args.quirks())?;
    interpreter.set_speed(Some(args.hz));
    let result = match args.cycles {
        Some(cycles) => interpreter
            .load_program(program)
            .and_then(|_| interpreter.main_loop(cycles)),
        None => interpreter.run(program),
    };
    result.map_err(|error| Stopped {
        error,
        state: Some(format!("{:?}", interpreter)),
    })
}

fn report(result: Result<(), Stopped>) -> Result<(), Box<dyn Error>> {
    let Stopped { error, state } = match result {
        Ok(()) => return Ok(()),
        Err(stopped) => stopped,
    };
    if is_display_failure(&error) {
        error!("display failed: {}", error);
    } else {
        error!("program stopped: {}", error);
    }
    if let Some(state) = state {
        info!("machine state at failure: {}", state);
    }
    Err(error.into())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let program = fs::read(&args.rom)?;
    info!(rom = %args.rom.display(), bytes = program.len(), "loaded rom");

    match args.display {
        DisplayKind::Window => {
            let mut display = WindowDisplay::new(args.window_config())?;
            let result = run(&args, &mut display, &program);
            // terminal has to be back before the failure is logged
            let closed = display.shutdown();
            let reported = report(result);
            if let (Err(e), Err(_)) = (&closed, &reported) {
                error!("display failed to close: {}", e);
            }
            reported?;
            Ok(closed?)
        }
        DisplayKind::Text => report(run(&args, &mut TextDisplay::new(), &program)),
        DisplayKind::Headless => report(run(&args, &mut HeadlessDisplay::new(), &program)),
    }
}
