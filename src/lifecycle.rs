//! Single-flight request state machine.
//!
//! ```text
//! Idle ──submit──▶ Validating ──image missing / invalid──▶ Failed
//!                      │
//!                      └──valid──▶ Submitting ──dispatched──▶ AwaitingResponse
//!                                                               │
//!                                         Succeeded ◀──2xx──────┤
//!                                         Failed    ◀──error────┘
//! Succeeded | Failed ──submit──▶ Validating
//! ```

use crate::error::SessionError;
use crate::transport::PredictionResult;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Validating,
    Submitting,
    AwaitingResponse,
    Succeeded(PredictionResult),
    Failed(SessionError),
}

impl RequestState {
    pub fn phase(&self) -> RequestPhase {
        match self {
            RequestState::Idle => RequestPhase::Idle,
            RequestState::Validating => RequestPhase::Validating,
            RequestState::Submitting => RequestPhase::Submitting,
            RequestState::AwaitingResponse => RequestPhase::AwaitingResponse,
            RequestState::Succeeded(_) => RequestPhase::Succeeded,
            RequestState::Failed(_) => RequestPhase::Failed,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            RequestState::Validating | RequestState::Submitting | RequestState::AwaitingResponse
        )
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        match self {
            RequestState::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SessionError> {
        match self {
            RequestState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Payload-free tag of a [`RequestState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPhase {
    Idle,
    Validating,
    Submitting,
    AwaitingResponse,
    Succeeded,
    Failed,
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestPhase::Idle => "idle",
            RequestPhase::Validating => "validating",
            RequestPhase::Submitting => "submitting",
            RequestPhase::AwaitingResponse => "awaiting_response",
            RequestPhase::Succeeded => "succeeded",
            RequestPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    Submit,
    ValidationFailed(SessionError),
    ValidationPassed,
    Dispatched,
    Resolved(Result<PredictionResult, SessionError>),
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::Submit => "submit",
            LifecycleEvent::ValidationFailed(_) => "validation_failed",
            LifecycleEvent::ValidationPassed => "validation_passed",
            LifecycleEvent::Dispatched => "dispatched",
            LifecycleEvent::Resolved(_) => "resolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("event {event} is not valid in state {from}")]
    InvalidTransition {
        from: RequestPhase,
        event: &'static str,
    },
}

#[derive(Debug, Default)]
pub struct RequestLifecycle {
    state: RequestState,
    attempts: u64,
}

impl RequestLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    /// Number of submissions that entered `Validating`.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Applies `event`, leaving the state untouched when the transition is invalid.
    pub fn apply(&mut self, event: LifecycleEvent) -> Result<RequestPhase, LifecycleError> {
        let from = self.state.phase();
        let next = match (from, event) {
            (
                RequestPhase::Idle | RequestPhase::Succeeded | RequestPhase::Failed,
                LifecycleEvent::Submit,
            ) => {
                self.attempts += 1;
                RequestState::Validating
            }
            (RequestPhase::Validating, LifecycleEvent::ValidationFailed(reason)) => {
                RequestState::Failed(reason)
            }
            (RequestPhase::Validating, LifecycleEvent::ValidationPassed) => RequestState::Submitting,
            (RequestPhase::Submitting, LifecycleEvent::Dispatched) => RequestState::AwaitingResponse,
            (RequestPhase::AwaitingResponse, LifecycleEvent::Resolved(Ok(result))) => {
                RequestState::Succeeded(result)
            }
            (RequestPhase::AwaitingResponse, LifecycleEvent::Resolved(Err(reason))) => {
                RequestState::Failed(reason)
            }
            (from, event) => {
                return Err(LifecycleError::InvalidTransition {
                    from,
                    event: event.name(),
                });
            }
        };

        self.state = next;
        let to = self.state.phase();
        debug!(%from, %to, attempt = self.attempts, "Request lifecycle transition");
        Ok(to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(lifespan_km: f64) -> PredictionResult {
        PredictionResult {
            lifespan_km,
            lifespan_miles: lifespan_km * 0.621371,
            classification: "Good".to_string(),
            debug_info: None,
        }
    }

    fn dispatched() -> RequestLifecycle {
        let mut lifecycle = RequestLifecycle::new();
        for event in [
            LifecycleEvent::Submit,
            LifecycleEvent::ValidationPassed,
            LifecycleEvent::Dispatched,
        ] {
            assert!(lifecycle.apply(event).is_ok());
        }
        lifecycle
    }

    #[test]
    fn starts_idle() {
        let lifecycle = RequestLifecycle::new();
        assert_eq!(lifecycle.state(), &RequestState::Idle);
        assert_eq!(lifecycle.attempts(), 0);
    }

    #[test]
    fn happy_path_reaches_succeeded() {
        let mut lifecycle = dispatched();
        assert_eq!(lifecycle.state(), &RequestState::AwaitingResponse);

        let phase = lifecycle.apply(LifecycleEvent::Resolved(Ok(result(42_000.0))));

        assert_eq!(phase, Ok(RequestPhase::Succeeded));
        assert_eq!(lifecycle.state().result(), Some(&result(42_000.0)));
    }

    #[test]
    fn missing_image_fails_from_validating() {
        let mut lifecycle = RequestLifecycle::new();
        assert!(lifecycle.apply(LifecycleEvent::Submit).is_ok());

        let phase = lifecycle.apply(LifecycleEvent::ValidationFailed(SessionError::MissingImage));

        assert_eq!(phase, Ok(RequestPhase::Failed));
        assert_eq!(lifecycle.state().error(), Some(&SessionError::MissingImage));
    }

    #[test]
    fn submit_is_rejected_while_awaiting_response() {
        let mut lifecycle = dispatched();

        let err = lifecycle.apply(LifecycleEvent::Submit);

        assert_eq!(
            err,
            Err(LifecycleError::InvalidTransition {
                from: RequestPhase::AwaitingResponse,
                event: "submit",
            })
        );
        assert_eq!(lifecycle.state(), &RequestState::AwaitingResponse);
        assert_eq!(lifecycle.attempts(), 1);
    }

    #[test]
    fn terminal_states_restart_on_submit() {
        let mut lifecycle = dispatched();
        assert!(
            lifecycle
                .apply(LifecycleEvent::Resolved(Err(SessionError::NetworkError)))
                .is_ok()
        );

        assert_eq!(
            lifecycle.apply(LifecycleEvent::Submit),
            Ok(RequestPhase::Validating)
        );
        assert_eq!(lifecycle.attempts(), 2);
    }

    #[test]
    fn skipping_states_is_invalid() {
        let mut lifecycle = RequestLifecycle::new();

        assert!(lifecycle.apply(LifecycleEvent::Dispatched).is_err());
        assert!(
            lifecycle
                .apply(LifecycleEvent::Resolved(Ok(result(1.0))))
                .is_err()
        );
        assert!(lifecycle.apply(LifecycleEvent::ValidationPassed).is_err());
        assert_eq!(lifecycle.state(), &RequestState::Idle);
    }

    #[test]
    fn in_flight_covers_intermediate_states_only() {
        assert!(!RequestState::Idle.is_in_flight());
        assert!(RequestState::Validating.is_in_flight());
        assert!(RequestState::Submitting.is_in_flight());
        assert!(RequestState::AwaitingResponse.is_in_flight());
        assert!(!RequestState::Failed(SessionError::NetworkError).is_in_flight());
    }
}
