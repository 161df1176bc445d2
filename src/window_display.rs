/// # windowed display
///
/// Two threads, sharing nothing but a channel of whole-frame snapshots:
///
///  * producer -- lives with the interpreter; owns the real grid. clear() and
///    set_pixel() just poke the grid; render() copies it onto the channel
///    without ever waiting
///  * consumer -- owns the terminal (alternate screen, raw mode) and a TUI
///    canvas. Every poll interval it takes whatever frame is waiting, if any,
///    and repaints all 64x32 cells
///
/// The channel holds one frame. When the consumer falls behind the producer
/// throws the stale frame away and queues the new one, so memory stays flat
/// and the consumer always sees the newest picture.
use crate::config::WindowConfig;
use crate::display::{Display, FrameBuffer};
use crate::error::DisplayError;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use std::io;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};
use tui::backend::{Backend, CrosstermBackend};
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Painter, Shape};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// frames in flight between the threads
const FRAME_QUEUE_DEPTH: usize = 1;

type RendererHandle = JoinHandle<Result<(), DisplayError>>;

/// producer half of the windowed display
pub struct WindowDisplay {
    frame: FrameBuffer,
    frames: Option<Sender<FrameBuffer>>,
    // our own handle on the queue, only used to evict stale frames
    stale: Receiver<FrameBuffer>,
    renderer: Option<RendererHandle>,
    dropped: u64,
    warned_closed: bool,
}

impl WindowDisplay {
    /// spawn the canvas thread; it takes over the terminal until shutdown
    pub fn new(config: WindowConfig) -> Result<WindowDisplay, DisplayError> {
        WindowDisplay::with_consumer(move |frames| run_canvas(frames, &config))
    }

    /// spawn an arbitrary consumer for the frame queue. The consumer should
    /// return once the queue reports it is disconnected
    pub fn with_consumer<F>(consumer: F) -> Result<WindowDisplay, DisplayError>
    where
        F: FnOnce(Receiver<FrameBuffer>) -> Result<(), DisplayError> + Send + 'static,
    {
        let (tx, rx) = bounded(FRAME_QUEUE_DEPTH);
        let stale = rx.clone();
        let renderer = thread::Builder::new()
            .name("chip8-canvas".to_string())
            .spawn(move || consumer(rx))?;
        debug!("canvas thread started");
        Ok(WindowDisplay {
            frame: FrameBuffer::new(),
            frames: Some(tx),
            stale,
            renderer: Some(renderer),
            dropped: 0,
            warned_closed: false,
        })
    }

    /// number of frames thrown away because the consumer hadn't collected
    /// the previous one yet
    pub fn dropped_frames(&self) -> u64 {
        self.dropped
    }

    /// tell the consumer to stop, wait for it, and report how it ended
    pub fn shutdown(mut self) -> Result<(), DisplayError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), DisplayError> {
        // hanging up is the stop signal
        self.frames.take();
        match self.renderer.take() {
            Some(handle) => {
                let result = handle.join().map_err(|_| DisplayError::RendererPanicked)?;
                debug!("canvas thread joined");
                result
            }
            None => Ok(()),
        }
    }
}

impl Display for WindowDisplay {
    fn clear(&mut self) {
        self.frame.clear();
    }

    fn set_pixel(&mut self, x: u16, y: u16) -> Result<bool, DisplayError> {
        self.frame.toggle(x, y)
    }

    fn render(&mut self) -> Result<(), DisplayError> {
        if self.is_closed() && !self.warned_closed {
            warn!("canvas has closed; frames are no longer shown");
            self.warned_closed = true;
        }
        let frames = match &self.frames {
            Some(frames) => frames,
            None => return Ok(()),
        };
        // at most two passes: once the stale frame is gone (whether we took
        // it or the consumer did) there is room, and we are the only sender
        let mut frame = self.frame;
        loop {
            match frames.try_send(frame) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(f)) => {
                    frame = f;
                    if self.stale.try_recv().is_ok() {
                        self.dropped += 1;
                        debug!(dropped = self.dropped, "canvas behind, replaced stale frame");
                    }
                }
                // can't happen while we hold `stale`, but nothing to do if it does
                Err(TrySendError::Disconnected(_)) => return Ok(()),
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.renderer.as_ref().map_or(true, |h| h.is_finished())
    }
}

impl Drop for WindowDisplay {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("canvas thread ended badly: {}", e);
        }
    }
}

/// raw mode + alternate screen for as long as this lives
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<TerminalGuard, io::Error> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, cursor::Hide)?;
        Ok(TerminalGuard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // nothing sensible to do with a failure while restoring the terminal
        let _ = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
        let _ = terminal::disable_raw_mode();
    }
}

fn is_quit(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// consumer event loop: runs until the producer hangs up or the user quits
fn run_canvas(frames: Receiver<FrameBuffer>, config: &WindowConfig) -> Result<(), DisplayError> {
    let _guard = TerminalGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    let resolution = Resolution::new(config);
    let mut last = FrameBuffer::new();
    paint_frame(&mut terminal, &resolution, &last, &config.title)?;

    loop {
        match frames.try_recv() {
            Ok(frame) => {
                last = frame;
                paint_frame(&mut terminal, &resolution, &last, &config.title)?;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                debug!("frame queue disconnected, closing canvas");
                break;
            }
        }
        // this wait is the poll cadence
        if event::poll(config.poll_interval)? {
            match event::read()? {
                Event::Key(key) if is_quit(&key) => {
                    debug!("canvas closed by user");
                    break;
                }
                Event::Resize(_, _) => {
                    paint_frame(&mut terminal, &resolution, &last, &config.title)?
                }
                _ => {}
            }
        }
    }
    Ok(())
}

/// canvas geometry: each CHIP-8 pixel is `scale` canvas units square, with
/// row 0 along the top
struct Resolution {
    width: f64,
    height: f64,
    scale: f64,
}

impl Resolution {
    fn new(config: &WindowConfig) -> Self {
        let (width, height) = config.canvas_size();
        Resolution {
            width: width as f64,
            height: height as f64,
            scale: config.pixel_scale.max(1) as f64,
        }
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, self.width]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-self.height, 0.0]
    }

    fn cell(&self, x: usize, y: usize, bit: u8) -> PixelCell {
        PixelCell {
            left: x as f64 * self.scale,
            bottom: -1.0 * (y + 1) as f64 * self.scale,
            size: self.scale,
            fill: if bit == 1 { Color::White } else { Color::Black },
            outline: Color::DarkGray,
        }
    }
}

/// a filled square with a thin border, when there's room for one
struct PixelCell {
    left: f64,
    bottom: f64,
    size: f64,
    fill: Color,
    outline: Color,
}

impl Shape for PixelCell {
    fn draw(&self, painter: &mut Painter) {
        let top_left = painter.get_point(self.left, self.bottom + self.size);
        let bottom_right = painter.get_point(self.left + self.size, self.bottom);
        let ((x0, y0), (x1, y1)) = match (top_left, bottom_right) {
            (Some(a), Some(b)) => (a, b),
            _ => return,
        };
        // the far edges belong to the neighbouring cells
        let x1 = if x1 > x0 { x1 - 1 } else { x0 };
        let y1 = if y1 > y0 { y1 - 1 } else { y0 };
        let bordered = x1 - x0 >= 2 && y1 - y0 >= 2;
        for gy in y0..=y1 {
            for gx in x0..=x1 {
                let edge = bordered && (gx == x0 || gx == x1 || gy == y0 || gy == y1);
                painter.paint(gx, gy, if edge { self.outline } else { self.fill });
            }
        }
    }
}

/// draw one whole frame. Unlit cells go down first so that, when the terminal
/// is too small to give every pixel its own cell, lit pixels win
fn paint_frame<B: Backend>(
    terminal: &mut Terminal<B>,
    resolution: &Resolution,
    frame: &FrameBuffer,
    title: &str,
) -> Result<(), io::Error> {
    terminal.draw(|f| {
        let canvas = Canvas::default()
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .style(Style::default().bg(Color::Black)),
            )
            .x_bounds(resolution.x_bounds())
            .y_bounds(resolution.y_bounds())
            .marker(Marker::Block)
            .paint(|ctx| {
                for bitplane in [0, 1] {
                    for (x, y, bit) in frame.cells().filter(|c| c.2 == bitplane) {
                        ctx.draw(&resolution.cell(x, y, bit));
                    }
                }
            });
        f.render_widget(canvas, f.size());
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tui::backend::TestBackend;

    fn colour_count(terminal: &Terminal<TestBackend>, colour: Color) -> usize {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .filter(|c| c.fg == colour)
            .count()
    }

    // Resolution tests
    #[test]
    fn test_bounds() {
        let r = Resolution::new(&WindowConfig::default());
        assert_eq!(r.x_bounds(), [0.0, 1280.0]);
        assert_eq!(r.y_bounds(), [-640.0, 0.0]);
    }

    #[test]
    fn test_bounds_follow_scale() {
        let config = WindowConfig {
            pixel_scale: 3,
            ..WindowConfig::default()
        };
        let r = Resolution::new(&config);
        assert_eq!(r.x_bounds(), [0.0, 192.0]);
        assert_eq!(r.y_bounds(), [-96.0, 0.0]);
        let c = r.cell(63, 31, 1);
        assert_eq!((c.left, c.bottom, c.size), (189.0, -96.0, 3.0));
    }

    #[test]
    fn test_cell_geometry() {
        let r = Resolution::new(&WindowConfig::default());
        let c = r.cell(0, 0, 1);
        assert_eq!((c.left, c.bottom, c.size), (0.0, -20.0, 20.0));
        assert_eq!(c.fill, Color::White);
        let c = r.cell(63, 31, 0);
        assert_eq!((c.left, c.bottom), (1260.0, -640.0));
        assert_eq!(c.fill, Color::Black);
    }

    // painting tests
    #[test]
    fn test_paint_blank_frame() -> Result<(), io::Error> {
        let mut terminal = Terminal::new(TestBackend::new(66, 34))?;
        paint_frame(&mut terminal, &Resolution::new(&WindowConfig::default()), &FrameBuffer::new(), "CHIP-8")?;
        assert_eq!(colour_count(&terminal, Color::White), 0);
        assert!(colour_count(&terminal, Color::Black) > 0);
        Ok(())
    }

    #[test]
    fn test_paint_lit_pixel() -> Result<(), io::Error> {
        let mut terminal = Terminal::new(TestBackend::new(66, 34))?;
        let mut frame = FrameBuffer::new();
        frame.toggle(10, 10).unwrap();
        paint_frame(&mut terminal, &Resolution::new(&WindowConfig::default()), &frame, "CHIP-8")?;
        assert!(colour_count(&terminal, Color::White) >= 1);
        Ok(())
    }

    #[test]
    fn test_paint_borders_when_roomy() -> Result<(), io::Error> {
        let mut terminal = Terminal::new(TestBackend::new(64 * 4 + 2, 32 * 4 + 2))?;
        let mut frame = FrameBuffer::new();
        frame.toggle(10, 10).unwrap();
        paint_frame(&mut terminal, &Resolution::new(&WindowConfig::default()), &frame, "CHIP-8")?;
        assert!(colour_count(&terminal, Color::DarkGray) > 0);
        assert!(colour_count(&terminal, Color::White) >= 1);
        Ok(())
    }

    // producer/consumer tests
    #[test]
    fn test_render_keeps_only_latest_frame() -> Result<(), DisplayError> {
        let (go_tx, go_rx) = bounded::<()>(0);
        let (seen_tx, seen_rx) = crossbeam_channel::unbounded();
        let mut d = WindowDisplay::with_consumer(move |frames| {
            let _ = go_rx.recv();
            for f in frames.try_iter() {
                let _ = seen_tx.send(f);
            }
            Ok(())
        })?;
        for x in 0..3 {
            d.set_pixel(x, 0)?;
            d.render()?;
        }
        assert_eq!(d.dropped_frames(), 2);
        go_tx.send(()).unwrap();
        d.shutdown()?;
        let seen: Vec<FrameBuffer> = seen_rx.try_iter().collect();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].lit_count(), 3);
        Ok(())
    }

    #[test]
    fn test_render_never_blocks_on_stalled_consumer() -> Result<(), DisplayError> {
        let (go_tx, go_rx) = bounded::<()>(0);
        let mut d = WindowDisplay::with_consumer(move |_frames| {
            let _ = go_rx.recv();
            Ok(())
        })?;
        let start = Instant::now();
        for _ in 0..1000 {
            d.set_pixel(0, 0)?;
            d.render()?;
        }
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(d.dropped_frames(), 999);
        go_tx.send(()).unwrap();
        d.shutdown()
    }

    #[test]
    fn test_frames_are_snapshots() -> Result<(), DisplayError> {
        let (seen_tx, seen_rx) = crossbeam_channel::unbounded();
        let mut d = WindowDisplay::with_consumer(move |frames| {
            while let Ok(f) = frames.recv() {
                let _ = seen_tx.send(f);
            }
            Ok(())
        })?;
        d.set_pixel(1, 1)?;
        d.render()?;
        let first = seen_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        // later changes don't reach a frame that has already been sent
        d.set_pixel(2, 2)?;
        assert_eq!(first.lit_count(), 1);
        assert_eq!(first.pixel(2, 2), 0);
        d.shutdown()
    }

    #[test]
    fn test_shutdown_stops_blocking_consumer() -> Result<(), DisplayError> {
        let d = WindowDisplay::with_consumer(move |frames| {
            // only returns once the producer hangs up
            while frames.recv().is_ok() {}
            Ok(())
        })?;
        assert!(!d.is_closed());
        d.shutdown()
    }

    #[test]
    fn test_consumer_error_surfaces_on_shutdown() -> Result<(), DisplayError> {
        let d = WindowDisplay::with_consumer(move |_frames| {
            Err(DisplayError::Io(io::Error::new(io::ErrorKind::Other, "no tty")))
        })?;
        assert!(matches!(d.shutdown(), Err(DisplayError::Io(_))));
        Ok(())
    }

    #[test]
    fn test_consumer_panic_surfaces_on_shutdown() -> Result<(), DisplayError> {
        let d = WindowDisplay::with_consumer(move |_frames| panic!("canvas exploded"))?;
        assert!(matches!(d.shutdown(), Err(DisplayError::RendererPanicked)));
        Ok(())
    }

    #[test]
    fn test_closed_consumer_does_not_stop_producer() -> Result<(), DisplayError> {
        let mut d = WindowDisplay::with_consumer(move |_frames| Ok(()))?;
        let start = Instant::now();
        while !d.is_closed() {
            assert!(start.elapsed() < Duration::from_secs(5));
            thread::sleep(Duration::from_millis(1));
        }
        for _ in 0..3 {
            d.set_pixel(0, 0)?;
            d.render()?;
        }
        d.shutdown()
    }

    #[test]
    fn test_quit_keys() {
        let key = KeyEvent::new;
        assert!(is_quit(&key(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(is_quit(&key(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_quit(&key(KeyCode::Char('c'), KeyModifiers::NONE)));
    }

    #[test]
    #[ignore]
    // NB. needs a real terminal; takes it over briefly
    fn test_canvas_opens_and_closes() -> Result<(), DisplayError> {
        let mut d = WindowDisplay::new(WindowConfig::default())?;
        d.set_pixel(0, 0)?;
        d.render()?;
        thread::sleep(Duration::from_millis(100));
        d.shutdown()
    }
}
