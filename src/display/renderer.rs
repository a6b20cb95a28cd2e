use std::io::{self, Write};

use crossterm::style::{ContentStyle, Print};
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, queue};
use unicode_width::UnicodeWidthChar;

use super::{format_amount, term_width, theme};
use crate::session::{SessionState, SessionStatus};

/// Rows the rocket can climb through above the launch pad.
const ROCKET_ROWS: usize = 8;
const ROCKET: &str = "    🚀";
const LAUNCH_PAD: &str = "  ======";

/// Everything one screen shows.
pub struct Frame<'a> {
    pub state: &'a SessionState,
    /// Bet as currently typed; shown instead of `state.bet` unless running.
    pub bet_input: &'a str,
    pub error: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Title,
    Plain,
    Dim,
    Multiplier,
    Status(SessionStatus),
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
    kind: LineKind,
    text: String,
}

impl Line {
    fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    fn blank() -> Self {
        Self::new(LineKind::Plain, "")
    }

    fn style(&self) -> ContentStyle {
        match self.kind {
            LineKind::Title => theme::title(),
            LineKind::Plain => ContentStyle::default(),
            LineKind::Dim => theme::dim(),
            LineKind::Multiplier => theme::multiplier(),
            LineKind::Status(status) => theme::status(status),
            LineKind::Error => theme::error(),
        }
    }
}

/// Redraws the whole game screen on every state change.
pub struct Renderer<W: Write = io::Stdout> {
    out: W,
    /// Fixed width for tests; the live terminal is queried otherwise.
    width: Option<usize>,
}

impl<W: Write> Renderer<W> {
    pub fn with_writer(writer: W) -> Self {
        Self {
            out: writer,
            width: None,
        }
    }

    pub fn set_width(&mut self, width: usize) {
        self.width = Some(width);
    }

    pub fn render_frame(&mut self, frame: &Frame<'_>) {
        let width = self.width.unwrap_or_else(term_width);
        queue!(
            self.out,
            cursor::MoveTo(0, 0),
            terminal::Clear(ClearType::All)
        )
        .ok();
        for line in frame_lines(frame, width) {
            queue!(self.out, Print(line.style().apply(&line.text)), Print("\r\n")).ok();
        }
        self.out.flush().ok();
    }

    pub fn into_writer(self) -> W {
        self.out
    }
}

fn frame_lines(frame: &Frame<'_>, width: usize) -> Vec<Line> {
    let state = frame.state;
    let bet = if state.status == SessionStatus::Running {
        format!("Bet: {}", format_amount(state.bet))
    } else {
        format!("Bet: {}_", frame.bet_input)
    };

    let mut lines = vec![
        Line::new(LineKind::Title, "Rocket Crash"),
        Line::blank(),
        Line::new(LineKind::Plain, bet),
        Line::new(
            LineKind::Multiplier,
            format!("Multiplier: {:.2}x", state.multiplier),
        ),
        Line::new(
            LineKind::Status(state.status),
            format!("Status: {}", state.status),
        ),
    ];
    if !state.message.is_empty() {
        lines.push(Line::new(
            LineKind::Dim,
            truncate_to_width(&state.message, width),
        ));
    }
    if let Some(error) = frame.error {
        lines.push(Line::new(
            LineKind::Error,
            truncate_to_width(&format!("Error: {error}"), width),
        ));
    }

    lines.push(Line::blank());
    let altitude = rocket_altitude(state);
    for height in (0..ROCKET_ROWS).rev() {
        lines.push(if height == altitude {
            Line::new(LineKind::Plain, ROCKET)
        } else {
            Line::blank()
        });
    }
    lines.push(Line::new(LineKind::Dim, LAUNCH_PAD));
    lines.push(Line::blank());

    let hint = if state.status == SessionStatus::Running {
        "c cash out · q quit"
    } else {
        "0-9 bet · s start · q quit"
    };
    lines.push(Line::new(LineKind::Dim, hint));
    lines
}

/// Rows above the pad: climbs with the multiplier while running, grounded otherwise.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rocket_altitude(state: &SessionState) -> usize {
    if state.status != SessionStatus::Running {
        return 0;
    }
    let rows = (state.multiplier * 2.0).floor().max(1.0) - 1.0;
    (rows as usize).min(ROCKET_ROWS - 1)
}

/// Truncate a string to fit within `max_width` display columns, appending `...` if truncated.
fn truncate_to_width(s: &str, max_width: usize) -> String {
    let ellipsis_width = 3; // "..."
    let mut width = 0;
    let mut cut_pos = 0;
    let mut result = String::new();
    for ch in s.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width {
            if max_width >= ellipsis_width {
                result.truncate(cut_pos);
                result.push_str("...");
            } else {
                result.clear();
            }
            return result;
        }
        result.push(ch);
        width += ch_width;
        if width <= max_width.saturating_sub(ellipsis_width) {
            cut_pos = result.len();
        }
    }
    result
}
