use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::poll::{PollCancel, PollHandle, Tick};
use super::state::{SessionState, SessionStatus};
use crate::service::{self, GameService, TickResponse};

/// Why a controller operation did not apply.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("a session is already running")]
    AlreadyRunning,
    #[error("no session is running")]
    NotRunning,
    #[error(transparent)]
    Bet(#[from] BetRejected),
    #[error("network error: {0}")]
    Network(#[from] service::Error),
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum BetRejected {
    #[error("bet must be a positive amount, got {0}")]
    NotPositive(f64),
    #[error("bet can only be changed while idle (session is {0})")]
    Locked(SessionStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    pub poll_interval: Duration,
    /// Consecutive failed ticks before the session is given up on. 0 = never.
    pub max_tick_failures: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            max_tick_failures: 50,
        }
    }
}

/// Drives a [`SessionState`] from user actions and poll ticks.
///
/// Every state change happens on the success branch of a service call;
/// failures leave the state alone and are kept in [`last_error`](Self::last_error).
pub struct SessionController<S> {
    service: S,
    config: ControllerConfig,
    state: SessionState,
    /// Bumped on every successful start; ticks from older sessions are dropped.
    generation: u64,
    poll: Option<PollCancel>,
    tick_failures: u32,
    last_error: Option<String>,
}

impl<S: GameService> SessionController<S> {
    pub fn new(service: S, config: ControllerConfig) -> Self {
        Self {
            service,
            config,
            state: SessionState::default(),
            generation: 0,
            poll: None,
            tick_failures: 0,
            last_error: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The most recent failed service call, cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_polling(&self) -> bool {
        self.poll.as_ref().is_some_and(|p| !p.is_cancelled())
    }

    pub fn set_bet(&mut self, value: f64) -> Result<(), BetRejected> {
        if self.state.status != SessionStatus::Idle {
            return Err(BetRejected::Locked(self.state.status));
        }
        self.state.bet = validate_bet(value)?;
        Ok(())
    }

    /// Start a session with `bet` and return its poll handle.
    pub async fn start_session(&mut self, bet: f64) -> Result<PollHandle, SessionError> {
        if self.state.status == SessionStatus::Running {
            return Err(SessionError::AlreadyRunning);
        }
        let bet = validate_bet(bet)?;

        debug!(bet, "starting session");
        if let Err(e) = self.service.start(bet).await {
            return Err(self.network_failure("start", e));
        }

        self.generation += 1;
        self.state.bet = bet;
        self.state.multiplier = 1.0;
        self.state.status = SessionStatus::Running;
        self.state.message.clear();
        self.tick_failures = 0;
        self.last_error = None;

        let handle = PollHandle::spawn(self.config.poll_interval, self.generation);
        if let Some(previous) = self.poll.replace(handle.canceller()) {
            previous.cancel();
        }
        info!(bet, generation = self.generation, "session started");
        Ok(handle)
    }

    /// Fetch the latest multiplier. Returns the status after the tick.
    pub async fn poll_tick(&mut self, tick: Tick) -> Result<SessionStatus, SessionError> {
        if tick.generation != self.generation || self.state.status != SessionStatus::Running {
            debug!(tick.generation, current = self.generation, "dropping stale tick");
            return Ok(self.state.status);
        }

        let response = match self.service.tick().await.and_then(checked) {
            Ok(response) => response,
            Err(e) => {
                self.tick_failures += 1;
                let err = self.network_failure("tick", e);
                let limit = self.config.max_tick_failures;
                if limit > 0 && self.tick_failures >= limit {
                    self.stop_polling();
                    self.state.status = SessionStatus::Crashed;
                    self.state.message =
                        format!("Lost contact with the game after {limit} failed updates");
                    warn!(failures = limit, "giving up on session");
                }
                return Err(err);
            }
        };

        self.tick_failures = 0;
        self.last_error = None;
        self.state.multiplier = response.multiplier.max(1.0);

        if let Some(crash_point) = response.crash_point.filter(|_| !response.running) {
            self.stop_polling();
            self.state.status = SessionStatus::Crashed;
            self.state.message = format!("Rocket crashed at {crash_point:.2}x");
            info!(crash_point, "session crashed");
        }
        Ok(self.state.status)
    }

    /// Cash out the running session. Returns the service's payout text.
    pub async fn cash_out(&mut self) -> Result<String, SessionError> {
        if self.state.status != SessionStatus::Running {
            return Err(SessionError::NotRunning);
        }

        let payload = match self.service.cash_out().await {
            Ok(payload) => payload,
            Err(e) => return Err(self.network_failure("cash out", e)),
        };

        self.stop_polling();
        self.state.status = SessionStatus::CashedOut;
        self.state.message = if payload.trim().is_empty() {
            format!("Cashed out at {:.2}x", self.state.multiplier)
        } else {
            payload.clone()
        };
        self.last_error = None;
        info!(multiplier = self.state.multiplier, "cashed out");
        Ok(payload)
    }

    /// Cancel any active poll. Call on teardown; safe to repeat.
    pub fn shutdown(&mut self) {
        if self.stop_polling() {
            debug!("poll cancelled on shutdown");
        }
    }

    fn stop_polling(&mut self) -> bool {
        self.poll.take().is_some_and(|p| p.cancel())
    }

    fn network_failure(&mut self, call: &str, e: service::Error) -> SessionError {
        warn!(call, error = %e, "game service call failed");
        self.last_error = Some(format!("{call} failed: {e}"));
        SessionError::Network(e)
    }
}

impl<S> Drop for SessionController<S> {
    fn drop(&mut self) {
        if let Some(poll) = self.poll.take() {
            poll.cancel();
        }
    }
}

fn validate_bet(value: f64) -> Result<f64, BetRejected> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(BetRejected::NotPositive(value))
    }
}

fn checked(response: TickResponse) -> service::Result<TickResponse> {
    if !response.multiplier.is_finite() {
        return Err(service::Error::InvalidTick("multiplier is not a number"));
    }
    if !response.running && response.crash_point.is_none() {
        return Err(service::Error::InvalidTick("round ended without a crash point"));
    }
    Ok(response)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// In-memory game service answering from per-call scripts.
    #[derive(Default)]
    struct ScriptedService {
        starts: Mutex<VecDeque<service::Result<()>>>,
        ticks: Mutex<VecDeque<service::Result<TickResponse>>>,
        cash_outs: Mutex<VecDeque<service::Result<String>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedService {
        fn push_start(&self, result: service::Result<()>) {
            self.starts.lock().unwrap().push_back(result);
        }

        fn push_tick(&self, multiplier: f64, running: bool, crash_point: Option<f64>) {
            self.ticks.lock().unwrap().push_back(Ok(TickResponse {
                multiplier,
                running,
                crash_point,
            }));
        }

        fn push_tick_error(&self) {
            self.ticks.lock().unwrap().push_back(Err(unavailable()));
        }

        fn push_cash_out(&self, result: service::Result<String>) {
            self.cash_outs.lock().unwrap().push_back(result);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl GameService for ScriptedService {
        async fn start(&self, bet: f64) -> service::Result<()> {
            self.calls.lock().unwrap().push(format!("start {bet}"));
            self.starts.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }

        async fn tick(&self) -> service::Result<TickResponse> {
            self.calls.lock().unwrap().push("tick".to_string());
            self.ticks
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(service::Error::InvalidTick("script exhausted")))
        }

        async fn cash_out(&self) -> service::Result<String> {
            self.calls.lock().unwrap().push("cashout".to_string());
            self.cash_outs
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("You cashed out!".to_string()))
        }
    }

    fn unavailable() -> service::Error {
        service::Error::FailedWithBody {
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            body: "warming up".to_string(),
        }
    }

    fn controller(
        config: ControllerConfig,
    ) -> (Arc<ScriptedService>, SessionController<Arc<ScriptedService>>) {
        let service = Arc::new(ScriptedService::default());
        (service.clone(), SessionController::new(service, config))
    }

    fn current_tick<S: GameService>(controller: &SessionController<S>) -> Tick {
        Tick {
            generation: controller.generation(),
        }
    }

    #[tokio::test]
    async fn set_bet_then_start_runs_at_one() {
        let (service, mut controller) = controller(ControllerConfig::default());
        controller.set_bet(250.0).unwrap();
        let _poll = controller.start_session(controller.state().bet).await.unwrap();

        let state = controller.state();
        assert_eq!(state.status, SessionStatus::Running);
        assert_eq!(state.multiplier, 1.0);
        assert_eq!(state.bet, 250.0);
        assert!(controller.is_polling());
        assert_eq!(service.calls(), vec!["start 250"]);
    }

    #[tokio::test]
    async fn set_bet_is_locked_while_running() {
        let (_service, mut controller) = controller(ControllerConfig::default());
        let _poll = controller.start_session(100.0).await.unwrap();

        let err = controller.set_bet(500.0).unwrap_err();
        assert_eq!(err, BetRejected::Locked(SessionStatus::Running));
        assert_eq!(controller.state().bet, 100.0);
    }

    #[test]
    fn set_bet_rejects_non_positive_amounts() {
        let service = Arc::new(ScriptedService::default());
        let mut controller = SessionController::new(service, ControllerConfig::default());
        assert_eq!(
            controller.set_bet(0.0),
            Err(BetRejected::NotPositive(0.0))
        );
        assert!(controller.set_bet(-5.0).is_err());
        assert!(controller.set_bet(f64::NAN).is_err());
        assert_eq!(controller.state().bet, 100.0);
    }

    #[tokio::test]
    async fn failed_start_leaves_state_and_starts_no_poll() {
        let (service, mut controller) = controller(ControllerConfig::default());
        service.push_start(Err(unavailable()));

        let err = controller.start_session(100.0).await.unwrap_err();
        assert!(matches!(err, SessionError::Network(_)));
        assert_eq!(controller.state(), &SessionState::default());
        assert!(!controller.is_polling());
        assert!(controller.last_error().unwrap().starts_with("start failed"));
    }

    #[tokio::test]
    async fn start_while_running_is_rejected_without_a_request() {
        let (service, mut controller) = controller(ControllerConfig::default());
        let _poll = controller.start_session(100.0).await.unwrap();

        let err = controller.start_session(100.0).await.unwrap_err();
        assert!(matches!(err, SessionError::AlreadyRunning));
        assert_eq!(service.calls(), vec!["start 100"]);
    }

    #[tokio::test]
    async fn running_tick_updates_multiplier() {
        let (service, mut controller) = controller(ControllerConfig::default());
        service.push_tick(1.42, true, None);
        let _poll = controller.start_session(100.0).await.unwrap();

        let status = controller.poll_tick(current_tick(&controller)).await.unwrap();
        assert_eq!(status, SessionStatus::Running);
        assert_eq!(controller.state().multiplier, 1.42);
        assert!(controller.state().message.is_empty());
    }

    #[tokio::test]
    async fn crash_tick_ends_the_session_and_cancels_the_poll() {
        let (service, mut controller) = controller(ControllerConfig::default());
        service.push_tick(4.0, false, Some(2.35));
        let mut poll = controller.start_session(100.0).await.unwrap();

        let status = controller.poll_tick(current_tick(&controller)).await.unwrap();
        assert_eq!(status, SessionStatus::Crashed);
        assert_eq!(controller.state().multiplier, 4.0);
        assert_eq!(controller.state().message, "Rocket crashed at 2.35x");
        assert!(!controller.is_polling());
        assert!(poll.is_stopped());
        assert_eq!(poll.next_tick().await, None);
    }

    #[tokio::test]
    async fn failed_tick_keeps_multiplier_and_keeps_polling() {
        let (service, mut controller) = controller(ControllerConfig::default());
        service.push_tick(1.5, true, None);
        service.push_tick_error();
        let _poll = controller.start_session(100.0).await.unwrap();

        controller.poll_tick(current_tick(&controller)).await.unwrap();
        let err = controller
            .poll_tick(current_tick(&controller))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Network(_)));
        assert_eq!(controller.state().multiplier, 1.5);
        assert_eq!(controller.state().status, SessionStatus::Running);
        assert!(controller.is_polling());
        assert!(controller.last_error().is_some());
    }

    #[tokio::test]
    async fn successful_tick_clears_the_error() {
        let (service, mut controller) = controller(ControllerConfig::default());
        service.push_tick_error();
        service.push_tick(1.2, true, None);
        let _poll = controller.start_session(100.0).await.unwrap();

        controller
            .poll_tick(current_tick(&controller))
            .await
            .unwrap_err();
        controller.poll_tick(current_tick(&controller)).await.unwrap();
        assert_eq!(controller.last_error(), None);
    }

    #[tokio::test]
    async fn crash_without_crash_point_is_rejected() {
        let (service, mut controller) = controller(ControllerConfig::default());
        service.push_tick(3.0, false, None);
        let _poll = controller.start_session(100.0).await.unwrap();

        controller
            .poll_tick(current_tick(&controller))
            .await
            .unwrap_err();
        assert_eq!(controller.state().status, SessionStatus::Running);
        assert_eq!(controller.state().multiplier, 1.0);
    }

    #[tokio::test]
    async fn repeated_tick_failures_give_up_on_the_session() {
        let (service, mut controller) = controller(ControllerConfig {
            max_tick_failures: 3,
            ..ControllerConfig::default()
        });
        for _ in 0..3 {
            service.push_tick_error();
        }
        let _poll = controller.start_session(100.0).await.unwrap();

        for _ in 0..3 {
            controller
                .poll_tick(current_tick(&controller))
                .await
                .unwrap_err();
        }
        assert_eq!(controller.state().status, SessionStatus::Crashed);
        assert!(!controller.state().message.is_empty());
        assert!(!controller.is_polling());
    }

    #[tokio::test]
    async fn stale_ticks_are_ignored() {
        let (service, mut controller) = controller(ControllerConfig::default());
        service.push_tick(4.0, false, Some(1.1));
        let _first = controller.start_session(100.0).await.unwrap();
        let stale = current_tick(&controller);
        controller.poll_tick(stale).await.unwrap();
        let _second = controller.start_session(100.0).await.unwrap();

        let status = controller.poll_tick(stale).await.unwrap();
        assert_eq!(status, SessionStatus::Running);
        assert_eq!(controller.state().multiplier, 1.0);
        assert_eq!(service.calls(), vec!["start 100", "tick", "start 100"]);
    }

    #[tokio::test]
    async fn cash_out_ends_the_session_with_the_payload() {
        let (service, mut controller) = controller(ControllerConfig::default());
        service.push_cash_out(Ok("You cashed out at 1.80x!".to_string()));
        let mut poll = controller.start_session(100.0).await.unwrap();

        let payload = controller.cash_out().await.unwrap();
        assert_eq!(payload, "You cashed out at 1.80x!");
        assert_eq!(controller.state().status, SessionStatus::CashedOut);
        assert_eq!(controller.state().message, "You cashed out at 1.80x!");
        assert_eq!(poll.next_tick().await, None);
    }

    #[tokio::test]
    async fn cash_out_when_not_running_is_a_no_op() {
        let (service, mut controller) = controller(ControllerConfig::default());

        let err = controller.cash_out().await.unwrap_err();
        assert!(matches!(err, SessionError::NotRunning));
        assert_eq!(controller.state(), &SessionState::default());
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_cash_out_keeps_running() {
        let (service, mut controller) = controller(ControllerConfig::default());
        service.push_cash_out(Err(unavailable()));
        let _poll = controller.start_session(100.0).await.unwrap();

        controller.cash_out().await.unwrap_err();
        assert_eq!(controller.state().status, SessionStatus::Running);
        assert!(controller.state().message.is_empty());
        assert!(controller.is_polling());
    }

    #[tokio::test]
    async fn restart_after_crash_resets_the_round() {
        let (service, mut controller) = controller(ControllerConfig::default());
        service.push_tick(2.0, false, Some(2.0));
        let _poll = controller.start_session(100.0).await.unwrap();
        controller.poll_tick(current_tick(&controller)).await.unwrap();

        let _poll = controller.start_session(40.0).await.unwrap();
        let state = controller.state();
        assert_eq!(state.status, SessionStatus::Running);
        assert_eq!(state.multiplier, 1.0);
        assert_eq!(state.bet, 40.0);
        assert!(state.message.is_empty());
    }

    #[tokio::test]
    async fn shutdown_twice_is_harmless() {
        let (service, mut controller) = controller(ControllerConfig::default());
        service.push_tick(2.0, false, Some(2.0));
        let mut poll = controller.start_session(100.0).await.unwrap();
        controller.poll_tick(current_tick(&controller)).await.unwrap();

        controller.shutdown();
        controller.shutdown();
        assert!(!poll.stop());
        assert_eq!(poll.next_tick().await, None);
    }

    #[tokio::test]
    async fn shutdown_cancels_a_running_poll() {
        let (_service, mut controller) = controller(ControllerConfig::default());
        let mut poll = controller.start_session(100.0).await.unwrap();

        controller.shutdown();
        assert!(poll.is_stopped());
        assert_eq!(poll.next_tick().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn full_round_until_crash() {
        let (service, mut controller) = controller(ControllerConfig::default());
        service.push_tick(1.1, true, None);
        service.push_tick(1.5, true, None);
        service.push_tick(2.0, true, None);
        service.push_tick(2.35, false, Some(2.35));

        let mut poll = controller.start_session(100.0).await.unwrap();
        let mut seen = Vec::new();
        while let Some(tick) = poll.next_tick().await {
            controller.poll_tick(tick).await.unwrap();
            seen.push(controller.state().multiplier);
        }

        assert_eq!(seen, vec![1.1, 1.5, 2.0, 2.35]);
        let state = controller.state();
        assert_eq!(state.status, SessionStatus::Crashed);
        assert_eq!(state.multiplier, 2.35);
        assert_eq!(state.message, "Rocket crashed at 2.35x");
        assert_eq!(
            service.calls().iter().filter(|c| *c == "tick").count(),
            4
        );
    }
}
