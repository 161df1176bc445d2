use crate::display::{Display, FrameBuffer};
use crate::error::DisplayError;
use crossterm::cursor::MoveTo;
use crossterm::terminal::{Clear, ClearType};
use crossterm::QueueableCommand;
use std::io::{self, Write};

/// dumps the grid to a console as rows of 0s and 1s, wiping the console
/// first. Synchronous and unbuffered: for debugging, not for playing games.
pub struct TextDisplay<W: Write> {
    out: W,
    frame: FrameBuffer,
}

impl TextDisplay<io::Stdout> {
    pub fn new() -> Self {
        TextDisplay::with_writer(io::stdout())
    }
}

impl Default for TextDisplay<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> TextDisplay<W> {
    pub fn with_writer(out: W) -> Self {
        TextDisplay {
            out,
            frame: FrameBuffer::new(),
        }
    }

    /// give the writer back, e.g. to inspect what was printed
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Display for TextDisplay<W> {
    fn clear(&mut self) {
        self.frame.clear();
    }

    fn set_pixel(&mut self, x: u16, y: u16) -> Result<bool, DisplayError> {
        self.frame.toggle(x, y)
    }

    fn render(&mut self) -> Result<(), DisplayError> {
        self.out.queue(Clear(ClearType::All))?.queue(MoveTo(0, 0))?;
        self.out.write_all(self.frame.to_text().as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}
