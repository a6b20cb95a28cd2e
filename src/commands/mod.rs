use std::io::{self, Write};

use anyhow::{Context, Result};
use crossterm::{cursor, execute, terminal};

pub mod auto;
pub mod play;

/// Holds the terminal in raw mode on the alternate screen; restores it on drop.
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    pub fn acquire() -> Result<Self> {
        terminal::enable_raw_mode().context("failed to enable raw mode")?;
        let guard = Self { _private: () };
        execute!(io::stdout(), terminal::EnterAlternateScreen, cursor::Hide)
            .context("failed to enter alternate screen")?;
        Ok(guard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let mut out = io::stdout();
        execute!(out, cursor::Show, terminal::LeaveAlternateScreen).ok();
        out.flush().ok();
        terminal::disable_raw_mode().ok();
    }
}
