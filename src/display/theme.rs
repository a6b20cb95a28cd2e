//! Terminal display styles.
//!
//! Only named ANSI colors are used, so the user's terminal palette applies.
//! No `Color::Rgb`, `Color::AnsiValue`, or bright variants.

use crossterm::style::{Attribute, Color, ContentStyle};

use crate::session::SessionStatus;

pub fn dim() -> ContentStyle {
    ContentStyle {
        attributes: Attribute::Dim.into(),
        ..Default::default()
    }
}

pub fn title() -> ContentStyle {
    ContentStyle {
        attributes: Attribute::Bold.into(),
        ..Default::default()
    }
}

pub fn multiplier() -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::Yellow),
        attributes: Attribute::Bold.into(),
        ..Default::default()
    }
}

pub fn error() -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::Red),
        ..Default::default()
    }
}

pub fn status(status: SessionStatus) -> ContentStyle {
    let foreground_color = match status {
        SessionStatus::Idle => None,
        SessionStatus::Running => Some(Color::Green),
        SessionStatus::Crashed => Some(Color::Red),
        SessionStatus::CashedOut => Some(Color::Yellow),
    };
    ContentStyle {
        foreground_color,
        attributes: Attribute::Bold.into(),
        ..Default::default()
    }
}
