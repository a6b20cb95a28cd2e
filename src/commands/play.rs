use std::io::{self, Write};

use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream, KeyEvent};
use futures::{Stream, StreamExt};
use tracing::debug;

use super::RawModeGuard;
use crate::display::input::{InputAction, InputHandler};
use crate::display::renderer::{Frame, Renderer};
use crate::service::GameService;
use crate::session::{ControllerConfig, PollHandle, SessionController, SessionState, Tick};

pub struct PlayConfig {
    pub controller: ControllerConfig,
    pub default_bet: f64,
}

/// Run the interactive game on the real terminal.
pub async fn play_live<S: GameService>(service: S, config: PlayConfig) -> Result<SessionState> {
    let _raw = RawModeGuard::acquire()?;
    play(service, config, EventStream::new(), io::stdout()).await
}

/// Run the game loop over any source of terminal events. Returns the final
/// session state once the user quits or the event source ends.
pub async fn play<S, E, W>(
    service: S,
    config: PlayConfig,
    mut events: E,
    writer: W,
) -> Result<SessionState>
where
    S: GameService,
    E: Stream<Item = io::Result<Event>> + Unpin,
    W: Write,
{
    let mut controller = SessionController::new(service, config.controller);
    controller
        .set_bet(config.default_bet)
        .context("invalid default bet")?;
    let mut renderer = Renderer::with_writer(writer);
    let mut input = InputHandler::new(config.default_bet);
    let mut poll: Option<PollHandle> = None;

    draw(&mut renderer, &controller, &input);
    loop {
        tokio::select! {
            Some(tick) = next_tick(&mut poll) => {
                // Failures are already recorded on the controller for the next frame.
                if let Err(e) = controller.poll_tick(tick).await {
                    debug!(error = %e, "tick not applied");
                }
            }
            event = events.next() => {
                let Some(event) = event else { break };
                if let Event::Key(key) = event.context("failed to read terminal event")?
                    && !handle_key(&key, &mut input, &mut controller, &mut poll).await
                {
                    break;
                }
            }
        }
        if poll.as_ref().is_some_and(PollHandle::is_stopped) {
            poll = None;
        }
        draw(&mut renderer, &controller, &input);
    }

    controller.shutdown();
    Ok(controller.state().clone())
}

/// Apply one key press. Returns false when the user quits.
async fn handle_key<S: GameService>(
    key: &KeyEvent,
    input: &mut InputHandler,
    controller: &mut SessionController<S>,
    poll: &mut Option<PollHandle>,
) -> bool {
    match input.handle_key(key, controller.state().status) {
        InputAction::Quit => return false,
        InputAction::Start => {
            let Some(bet) = input.bet_value() else {
                debug!(bet = input.bet_text(), "ignoring start with unusable bet");
                return true;
            };
            match controller.start_session(bet).await {
                Ok(handle) => *poll = Some(handle),
                Err(e) => debug!(error = %e, "start not applied"),
            }
        }
        InputAction::CashOut => {
            if let Err(e) = controller.cash_out().await {
                debug!(error = %e, "cash out not applied");
            }
        }
        InputAction::BetEdited => {
            if let Some(bet) = input.bet_value()
                && let Err(e) = controller.set_bet(bet)
            {
                debug!(error = %e, "bet kept as draft");
            }
        }
        InputAction::None => {}
    }
    true
}

async fn next_tick(poll: &mut Option<PollHandle>) -> Option<Tick> {
    match poll {
        Some(poll) => poll.next_tick().await,
        None => std::future::pending().await,
    }
}

fn draw<S: GameService, W: Write>(
    renderer: &mut Renderer<W>,
    controller: &SessionController<S>,
    input: &InputHandler,
) {
    renderer.render_frame(&Frame {
        state: controller.state(),
        bet_input: input.bet_text(),
        error: controller.last_error(),
    });
}
