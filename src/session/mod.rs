pub mod controller;
pub mod poll;
pub mod state;

pub use controller::{BetRejected, ControllerConfig, SessionController, SessionError};
pub use poll::{PollCancel, PollHandle, Tick};
pub use state::{SessionState, SessionStatus};
