use std::fmt;

/// Stake a fresh session starts with.
pub const DEFAULT_BET: f64 = 100.0;

/// Client-visible state of the current (or last) session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub bet: f64,
    pub multiplier: f64,
    pub status: SessionStatus,
    /// Result text; empty unless the status is terminal.
    pub message: String,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            bet: DEFAULT_BET,
            multiplier: 1.0,
            status: SessionStatus::Idle,
            message: String::new(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
    Crashed,
    CashedOut,
}

impl SessionStatus {
    /// Crashed and cashed-out sessions stay put until the next start.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Crashed | SessionStatus::CashedOut)
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionStatus::Idle => "Idle",
            SessionStatus::Running => "Running",
            SessionStatus::Crashed => "Crashed",
            SessionStatus::CashedOut => "Cashed Out",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
