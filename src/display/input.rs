use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::format_amount;
use crate::session::SessionStatus;

/// Longest bet the input field accepts, in characters.
const MAX_BET_LEN: usize = 12;

/// Result of processing a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// Key ignored in the current status.
    None,
    /// The bet field changed.
    BetEdited,
    /// User asked to start a session.
    Start,
    /// User asked to cash out.
    CashOut,
    /// User wants to leave (q, Esc, Ctrl+C, Ctrl+D).
    Quit,
}

/// Maps keys to game actions and owns the bet field.
///
/// The bet field only accepts edits while no session is running, and start
/// and cash out are only offered when they could succeed.
pub struct InputHandler {
    bet: String,
}

impl InputHandler {
    pub fn new(initial_bet: f64) -> Self {
        Self {
            bet: format_amount(initial_bet),
        }
    }

    pub fn bet_text(&self) -> &str {
        &self.bet
    }

    /// The typed bet, if it is a usable amount.
    pub fn bet_value(&self) -> Option<f64> {
        self.bet
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v > 0.0)
    }

    /// Process a terminal key event. Returns the action to take.
    pub fn handle_key(&mut self, event: &KeyEvent, status: SessionStatus) -> InputAction {
        if event.kind == KeyEventKind::Release {
            return InputAction::None;
        }
        if event.modifiers.contains(KeyModifiers::CONTROL) {
            return match event.code {
                KeyCode::Char('c' | 'd') => InputAction::Quit,
                _ => InputAction::None,
            };
        }

        match event.code {
            KeyCode::Char('q') | KeyCode::Esc => InputAction::Quit,
            _ if status == SessionStatus::Running => match event.code {
                KeyCode::Char('c' | ' ') => InputAction::CashOut,
                _ => InputAction::None,
            },
            KeyCode::Char('s') | KeyCode::Enter => InputAction::Start,
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => self.push(c),
            KeyCode::Backspace => {
                if self.bet.pop().is_some() {
                    InputAction::BetEdited
                } else {
                    InputAction::None
                }
            }
            _ => InputAction::None,
        }
    }

    fn push(&mut self, c: char) -> InputAction {
        if self.bet.len() >= MAX_BET_LEN || (c == '.' && self.bet.contains('.')) {
            return InputAction::None;
        }
        self.bet.push(c);
        InputAction::BetEdited
    }
}
