pub mod input;
pub mod renderer;
pub mod theme;

/// Query the current terminal width, defaulting to 80.
pub(crate) fn term_width() -> usize {
    crossterm::terminal::size()
        .map(|(w, _)| w as usize)
        .unwrap_or(80)
        .max(1)
}

/// Format a stake the way a user would type it (`100`, `12.5`).
pub fn format_amount(amount: f64) -> String {
    format!("{amount}")
}
