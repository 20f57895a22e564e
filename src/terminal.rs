use std::io::{self, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};

/// Fixed colour palette of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Palette {
    Default,
    Hot,
    Warm,
    Cool,
    Title,
}

impl Palette {
    fn color(self) -> Option<Color> {
        match self {
            Palette::Default => None,
            Palette::Hot => Some(Color::DarkRed),
            Palette::Warm => Some(Color::DarkYellow),
            Palette::Cool => Some(Color::DarkGreen),
            Palette::Title => Some(Color::DarkCyan),
        }
    }
}

/// Output side of the terminal. Only the orchestrator (at startup and
/// shutdown) and the display loop (in between) ever hold one.
pub trait TerminalSurface {
    fn clear_screen(&mut self) -> io::Result<()>;
    fn set_cursor_position(&mut self, col: u16, row: u16) -> io::Result<()>;
    fn set_text_color(&mut self, color: Palette) -> io::Result<()>;
    fn hide_cursor(&mut self) -> io::Result<()>;
    fn show_cursor(&mut self) -> io::Result<()>;
    fn print(&mut self, text: &str) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// Escape-sequence backend; crossterm picks ANSI or the Windows console API.
pub struct CrosstermSurface<W: Write> {
    out: W,
}

impl<W: Write> CrosstermSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl CrosstermSurface<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalSurface for CrosstermSurface<W> {
    fn clear_screen(&mut self) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        self.out.flush()
    }

    fn set_cursor_position(&mut self, col: u16, row: u16) -> io::Result<()> {
        queue!(self.out, MoveTo(col, row))
    }

    fn set_text_color(&mut self, color: Palette) -> io::Result<()> {
        match color.color() {
            Some(color) => queue!(self.out, SetForegroundColor(color)),
            None => queue!(self.out, ResetColor),
        }
    }

    fn hide_cursor(&mut self) -> io::Result<()> {
        queue!(self.out, Hide)?;
        self.out.flush()
    }

    fn show_cursor(&mut self) -> io::Result<()> {
        queue!(self.out, Show)?;
        self.out.flush()
    }

    fn print(&mut self, text: &str) -> io::Result<()> {
        queue!(self.out, Print(text))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
