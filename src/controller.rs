//! Composition root of a prediction session.
//!
//! The controller owns the session state behind a lock that is never held
//! across an await. `submit` moves the lifecycle to `AwaitingResponse` before
//! it suspends, so a concurrent `submit` on the same controller sees the
//! request in flight and is turned away without touching the transport. If the
//! caller drops a `submit` or `load_road_conditions` future mid-flight, the
//! pending work is failed so a later call can start over.

use crate::catalog::CatalogStatus;
use crate::error::SessionError;
use crate::image::{ImageFile, ObjectUrlRegistry, PreviewProvider};
use crate::interpret::{InterpretedResult, interpret};
use crate::lifecycle::{LifecycleEvent, RequestState};
use crate::parameters::{ParameterSet, ParameterUpdate};
use crate::state::{SessionSnapshot, SessionState};
use crate::transport::{PredictionRequest, PredictionResult, PredictionTransport};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;
use tracing::{info, warn};

/// What a call to [`PredictionSessionController::submit`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The attempt ran to a terminal state.
    Completed(RequestState),
    /// Another attempt was already in flight; nothing was sent.
    AlreadyInFlight,
}

impl SubmitOutcome {
    pub fn state(&self) -> Option<&RequestState> {
        match self {
            SubmitOutcome::Completed(state) => Some(state),
            SubmitOutcome::AlreadyInFlight => None,
        }
    }
}

enum Prepared {
    Dispatch(PredictionRequest),
    Finished(RequestState),
    InFlight,
}

pub struct PredictionSessionController<T> {
    transport: T,
    state: RwLock<SessionState>,
}

impl<T: PredictionTransport> PredictionSessionController<T> {
    pub fn new(transport: T) -> Self {
        Self::with_preview_provider(transport, Arc::new(ObjectUrlRegistry::new()))
    }

    pub fn with_preview_provider(transport: T, previews: Arc<dyn PreviewProvider>) -> Self {
        Self {
            transport,
            state: RwLock::new(SessionState::new(previews)),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.read().subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.read().snapshot()
    }

    pub fn parameters(&self) -> ParameterSet {
        self.read().parameters.get()
    }

    pub fn preview_url(&self) -> Option<String> {
        self.read().image.preview_url().map(str::to_string)
    }

    pub fn request_state(&self) -> RequestState {
        self.read().lifecycle.state().clone()
    }

    /// Present only while the lifecycle is `Succeeded`.
    pub fn interpreted_result(&self) -> Option<InterpretedResult> {
        self.read().interpreted().cloned()
    }

    pub fn road_conditions(&self) -> Vec<String> {
        self.read().catalog.values().to_vec()
    }

    pub fn catalog_status(&self) -> CatalogStatus {
        self.read().catalog.status()
    }

    /// Non-fatal condition to show alongside the form, such as a failed catalog load.
    pub fn notice(&self) -> Option<SessionError> {
        self.read().notice().cloned()
    }

    /// Applies a parameter change. Road conditions must come from the loaded catalog.
    pub fn set_parameter(&self, update: ParameterUpdate) -> Result<(), SessionError> {
        let mut state = self.write();
        if let ParameterUpdate::RoadCondition(value) = &update
            && !state.catalog.contains(value)
        {
            warn!(road_condition = %value, "Rejected road condition outside catalog");
            return Err(SessionError::UnknownRoadCondition(value.clone()));
        }
        state.parameters.set(update);
        state.publish();
        Ok(())
    }

    pub fn select_image(&self, file: ImageFile) {
        let mut state = self.write();
        info!(image = file.name(), bytes = file.byte_len(), "Image selected");
        state.image.select(file);
        state.publish();
    }

    pub fn clear_image(&self) {
        let mut state = self.write();
        state.image.clear();
        state.publish();
    }

    /// Fetches the road-condition catalog once per session.
    ///
    /// A failed load is reported through the snapshot notice and leaves the
    /// current road condition untouched.
    pub async fn load_road_conditions(&self) -> CatalogStatus {
        {
            let mut state = self.write();
            if !state.catalog.begin_load() {
                return state.catalog.status();
            }
            state.publish();
        }

        let pending = PendingGuard::new(self, Pending::Catalog);
        let fetched = self.transport.fetch_road_conditions().await;
        pending.settle();

        let mut state = self.write();
        let loaded = fetched
            .map_err(|err| {
                warn!(error = %err, "Road condition catalog unavailable");
                SessionError::CatalogUnavailable
            })
            .and_then(|values| state.catalog.complete(values));
        match loaded {
            Ok(default) => {
                info!(
                    count = state.catalog.values().len(),
                    default = %default,
                    "Road condition catalog loaded"
                );
                state.parameters.set(ParameterUpdate::RoadCondition(default));
                state.set_notice(None);
            }
            Err(err) => {
                state.catalog.fail();
                state.set_notice(Some(err));
            }
        }
        state.publish();
        state.catalog.status()
    }

    /// Runs one prediction attempt to completion.
    pub async fn submit(&self) -> SubmitOutcome {
        let request = match self.prepare_submission() {
            Prepared::Dispatch(request) => request,
            Prepared::Finished(state) => return SubmitOutcome::Completed(state),
            Prepared::InFlight => return SubmitOutcome::AlreadyInFlight,
        };

        let pending = PendingGuard::new(self, Pending::Prediction);
        let outcome = self
            .transport
            .predict(request)
            .await
            .map_err(|err| err.into_session_error());
        pending.settle();

        SubmitOutcome::Completed(self.resolve(outcome))
    }

    fn prepare_submission(&self) -> Prepared {
        let mut state = self.write();
        if let Err(err) = state.lifecycle.apply(LifecycleEvent::Submit) {
            warn!(error = %err, "Submission rejected, prediction already in flight");
            return Prepared::InFlight;
        }
        state.begin_attempt();

        let parameters = state.parameters.get();
        let validation = match state.image.file().cloned() {
            None => Err(SessionError::MissingImage),
            Some(image) => parameters.validate().map(|()| image),
        };

        let image = match validation {
            Ok(image) => image,
            Err(reason) => {
                warn!(error = %reason, "Submission failed validation");
                transition(&mut state, LifecycleEvent::ValidationFailed(reason));
                state.publish();
                return Prepared::Finished(state.lifecycle.state().clone());
            }
        };

        transition(&mut state, LifecycleEvent::ValidationPassed);
        let request = PredictionRequest::new(image, parameters.clone());
        state.set_submitted(parameters);
        transition(&mut state, LifecycleEvent::Dispatched);
        info!(
            attempt = state.lifecycle.attempts(),
            "Prediction request dispatched"
        );
        state.publish();
        Prepared::Dispatch(request)
    }

    fn resolve(&self, outcome: Result<PredictionResult, SessionError>) -> RequestState {
        let mut state = self.write();
        let interpreted = match (&outcome, state.submitted()) {
            (Ok(result), Some(submitted)) => Some(interpret(result, submitted)),
            _ => None,
        };

        match &outcome {
            Ok(result) => info!(
                lifespan_km = result.lifespan_km,
                classification = %result.classification,
                "Prediction succeeded"
            ),
            Err(err) => warn!(error = %err, code = err.code(), "Prediction failed"),
        }

        transition(&mut state, LifecycleEvent::Resolved(outcome));
        if let Some(interpreted) = interpreted
            && matches!(state.lifecycle.state(), RequestState::Succeeded(_))
        {
            state.set_interpreted(interpreted);
        }
        state.publish();
        state.lifecycle.state().clone()
    }

    fn abandon_prediction(&self) {
        let mut state = self.write();
        warn!(
            attempt = state.lifecycle.attempts(),
            "Prediction dropped before a response arrived"
        );
        transition(
            &mut state,
            LifecycleEvent::Resolved(Err(SessionError::NetworkError)),
        );
        state.publish();
    }

    fn abandon_catalog_load(&self) {
        let mut state = self.write();
        warn!("Road condition load dropped before a response arrived");
        state.catalog.fail();
        state.set_notice(Some(SessionError::CatalogUnavailable));
        state.publish();
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|poisoned| {
            warn!("Session state lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|poisoned| {
            warn!("Session state lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }
}

fn transition(state: &mut SessionState, event: LifecycleEvent) {
    if let Err(err) = state.lifecycle.apply(event) {
        warn!(error = %err, "Unexpected request lifecycle transition");
    }
}

enum Pending {
    Prediction,
    Catalog,
    Settled,
}

/// Held across a transport await. Dropped unsettled, it fails the pending
/// work so the session can start it again.
struct PendingGuard<'a, T: PredictionTransport> {
    controller: &'a PredictionSessionController<T>,
    pending: Pending,
}

impl<'a, T: PredictionTransport> PendingGuard<'a, T> {
    fn new(controller: &'a PredictionSessionController<T>, pending: Pending) -> Self {
        Self {
            controller,
            pending,
        }
    }

    fn settle(mut self) {
        self.pending = Pending::Settled;
    }
}

impl<T: PredictionTransport> Drop for PendingGuard<'_, T> {
    fn drop(&mut self) {
        match self.pending {
            Pending::Settled => {}
            Pending::Prediction => self.controller.abandon_prediction(),
            Pending::Catalog => self.controller.abandon_catalog_load(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockPrediction, MockTransport};

    fn png() -> ImageFile {
        ImageFile::new("tire.png", "image/png", vec![0x89, 0x50])
    }

    #[tokio::test]
    async fn missing_image_fails_without_request() {
        let controller = PredictionSessionController::new(MockTransport::with_road_conditions(
            &["paved"],
            vec![MockPrediction::success(40_000.0, "Good")],
        ));

        let outcome = controller.submit().await;

        assert_eq!(
            outcome,
            SubmitOutcome::Completed(RequestState::Failed(SessionError::MissingImage))
        );
        assert_eq!(controller.transport().predict_calls(), 0);
        assert!(controller.interpreted_result().is_none());
    }

    #[tokio::test]
    async fn out_of_domain_parameter_fails_without_request() -> Result<(), SessionError> {
        let controller = PredictionSessionController::new(MockTransport::with_road_conditions(
            &["paved"],
            Vec::new(),
        ));
        controller.select_image(png());
        controller.set_parameter(ParameterUpdate::Speed(500.0))?;

        let outcome = controller.submit().await;

        assert!(matches!(
            outcome,
            SubmitOutcome::Completed(RequestState::Failed(SessionError::InvalidParameter { .. }))
        ));
        assert_eq!(controller.transport().predict_calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn success_caches_interpretation_of_submitted_parameters() -> Result<(), SessionError> {
        let controller = PredictionSessionController::new(MockTransport::with_road_conditions(
            &["paved"],
            vec![MockPrediction::success(75_000.0, "Good")],
        ));
        controller.select_image(png());
        controller.set_parameter(ParameterUpdate::Pressure(55.0))?;

        let outcome = controller.submit().await;
        assert!(matches!(
            outcome,
            SubmitOutcome::Completed(RequestState::Succeeded(_))
        ));

        // Later edits do not recompute the cached interpretation.
        controller.set_parameter(ParameterUpdate::Pressure(30.0))?;
        let interpreted = controller.interpreted_result().expect("interpreted result");
        assert!(interpreted.out_of_range_warning);
        assert_eq!(interpreted.progress_ratio, 0.5);
        Ok(())
    }

    #[test]
    fn result_is_not_cached_when_resolve_does_not_succeed() {
        let controller = PredictionSessionController::new(MockTransport::with_road_conditions(
            &["paved"],
            Vec::new(),
        ));
        controller.write().set_submitted(ParameterSet::default());

        let state = controller.resolve(Ok(PredictionResult {
            lifespan_km: 70_000.0,
            lifespan_miles: 43_496.0,
            classification: "Good".to_string(),
            debug_info: None,
        }));

        assert_eq!(state, RequestState::Idle);
        assert!(controller.interpreted_result().is_none());
        assert!(controller.snapshot().result.is_none());
    }

    #[tokio::test]
    async fn road_condition_outside_catalog_is_rejected() {
        let controller = PredictionSessionController::new(MockTransport::with_road_conditions(
            &["gravel", "dirt"],
            Vec::new(),
        ));
        controller.load_road_conditions().await;

        let result = controller.set_parameter(ParameterUpdate::RoadCondition("ice".to_string()));

        assert_eq!(
            result,
            Err(SessionError::UnknownRoadCondition("ice".to_string()))
        );
        assert_eq!(controller.parameters().road_condition, "gravel");
        assert!(
            controller
                .set_parameter(ParameterUpdate::RoadCondition("dirt".to_string()))
                .is_ok()
        );
    }
}
