use crate::error::DisplayError;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// Display is used by the interpreter to draw things on the screen. It should
/// abstract the implementation details, so a variety of kinds of screen would
/// work. The interpreter never reads pixels back; it only learns whether a
/// toggle erased something.
pub trait Display {
    /// blank the whole grid
    fn clear(&mut self);

    /// XOR the pixel at column `x`, row `y`; true iff the pixel is now off
    fn set_pixel(&mut self, x: u16, y: u16) -> Result<bool, DisplayError>;

    /// make the current grid visible. Called once per sprite from the hot
    /// loop, so must only do a bounded amount of work
    fn render(&mut self) -> Result<(), DisplayError>;

    /// true once whatever is presenting the grid has gone away
    fn is_closed(&self) -> bool {
        false
    }
}

/// One whole frame: 32 rows of 64 pixels, each row packed into a u64 with
/// column 0 in the most significant bit. Small enough to copy per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameBuffer {
    rows: [u64; DISPLAY_HEIGHT],
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn mask(x: usize) -> u64 {
        1 << (DISPLAY_WIDTH - 1 - x)
    }

    pub fn clear(&mut self) {
        self.rows = [0; DISPLAY_HEIGHT];
    }

    /// XOR one pixel, returning true if it was erased
    pub fn toggle(&mut self, x: u16, y: u16) -> Result<bool, DisplayError> {
        let (col, row) = (x as usize, y as usize);
        if col >= DISPLAY_WIDTH || row >= DISPLAY_HEIGHT {
            return Err(DisplayError::PixelOutOfBounds { x, y });
        }
        self.rows[row] ^= Self::mask(col);
        Ok(self.rows[row] & Self::mask(col) == 0)
    }

    /// 0 or 1; anything off-grid reads as 0
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        if x >= DISPLAY_WIDTH || y >= DISPLAY_HEIGHT {
            return 0;
        }
        (self.rows[y] >> (DISPLAY_WIDTH - 1 - x)) as u8 & 1
    }

    /// iterate (x, y, bit) over every cell, row by row
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, u8)> + '_ {
        (0..DISPLAY_HEIGHT)
            .flat_map(|y| (0..DISPLAY_WIDTH).map(move |x| (x, y)))
            .map(move |(x, y)| (x, y, self.pixel(x, y)))
    }

    pub fn lit_count(&self) -> u32 {
        self.rows.iter().map(|r| r.count_ones()).sum()
    }

    pub fn is_blank(&self) -> bool {
        self.rows.iter().all(|&r| r == 0)
    }

    /// one line of `0`/`1` characters per row
    pub fn to_text(&self) -> String {
        let mut s = String::with_capacity((DISPLAY_WIDTH + 1) * DISPLAY_HEIGHT);
        for row in self.rows.iter() {
            s.push_str(&format!("{:064b}", row));
            s.push('\n');
        }
        s
    }
}

/// keeps the grid but never shows it; useful for tests and for running
/// programs with no screen attached
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    frame: FrameBuffer,
    renders: usize,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    /// how many times render() has been called
    pub fn render_count(&self) -> usize {
        self.renders
    }
}

impl Display for HeadlessDisplay {
    fn clear(&mut self) {
        self.frame.clear();
    }

    fn set_pixel(&mut self, x: u16, y: u16) -> Result<bool, DisplayError> {
        self.frame.toggle(x, y)
    }

    fn render(&mut self) -> Result<(), DisplayError> {
        self.renders += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_reports_erasure() -> Result<(), DisplayError> {
        let mut f = FrameBuffer::new();
        assert!(!f.toggle(3, 4)?);
        assert_eq!(f.pixel(3, 4), 1);
        assert!(f.toggle(3, 4)?);
        assert_eq!(f.pixel(3, 4), 0);
        Ok(())
    }

    #[test]
    fn test_corners() -> Result<(), DisplayError> {
        let mut f = FrameBuffer::new();
        f.toggle(0, 0)?;
        f.toggle(63, 31)?;
        assert_eq!(f.pixel(0, 0), 1);
        assert_eq!(f.pixel(63, 31), 1);
        assert_eq!(f.pixel(1, 0), 0);
        assert_eq!(f.lit_count(), 2);
        Ok(())
    }

    #[test]
    fn test_out_of_range_is_an_error() {
        let mut f = FrameBuffer::new();
        assert!(matches!(
            f.toggle(64, 0),
            Err(DisplayError::PixelOutOfBounds { x: 64, y: 0 })
        ));
        assert!(matches!(
            f.toggle(0, 32),
            Err(DisplayError::PixelOutOfBounds { x: 0, y: 32 })
        ));
        assert!(f.is_blank());
    }

    #[test]
    fn test_clear() -> Result<(), DisplayError> {
        let mut f = FrameBuffer::new();
        for x in 0..8 {
            f.toggle(x, x)?;
        }
        assert_eq!(f.lit_count(), 8);
        f.clear();
        assert!(f.is_blank());
        Ok(())
    }

    #[test]
    fn test_cells_row_major() -> Result<(), DisplayError> {
        let mut f = FrameBuffer::new();
        f.toggle(1, 0)?;
        let cells: Vec<_> = f.cells().collect();
        assert_eq!(cells.len(), DISPLAY_WIDTH * DISPLAY_HEIGHT);
        assert_eq!(cells[0], (0, 0, 0));
        assert_eq!(cells[1], (1, 0, 1));
        assert_eq!(cells[64], (0, 1, 0));
        Ok(())
    }

    #[test]
    fn test_to_text() -> Result<(), DisplayError> {
        let mut f = FrameBuffer::new();
        f.toggle(0, 0)?;
        f.toggle(63, 1)?;
        let text = f.to_text();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 32);
        assert!(lines.iter().all(|l| l.len() == 64));
        assert_eq!(&lines[0][..2], "10");
        assert!(lines[1].ends_with("01"));
        Ok(())
    }

    #[test]
    fn test_headless_counts_renders() -> Result<(), DisplayError> {
        let mut d = HeadlessDisplay::new();
        d.set_pixel(5, 5)?;
        d.render()?;
        d.render()?;
        assert_eq!(d.render_count(), 2);
        assert_eq!(d.frame().pixel(5, 5), 1);
        d.clear();
        assert!(d.frame().is_blank());
        assert!(!d.is_closed());
        Ok(())
    }
}
