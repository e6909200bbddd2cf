use crate::catalog::{CatalogStatus, RoadConditionCatalog};
use crate::error::SessionError;
use crate::image::{ImageAsset, PreviewProvider};
use crate::interpret::InterpretedResult;
use crate::lifecycle::{RequestLifecycle, RequestState};
use crate::parameters::{ParameterSet, ParameterStore};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::watch;

/// Everything the presentation layer reads, captured at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub parameters: ParameterSet,
    pub preview_url: Option<String>,
    pub road_conditions: Vec<String>,
    pub catalog_status: CatalogStatus,
    pub request: RequestState,
    pub result: Option<InterpretedResult>,
    pub notice: Option<SessionError>,
    pub updated_at: SystemTime,
}

#[derive(Debug)]
pub struct SessionState {
    pub(crate) parameters: ParameterStore,
    pub(crate) image: ImageAsset,
    pub(crate) catalog: RoadConditionCatalog,
    pub(crate) lifecycle: RequestLifecycle,
    submitted: Option<ParameterSet>,
    interpreted: Option<InterpretedResult>,
    notice: Option<SessionError>,
    updated_at: SystemTime,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl SessionState {
    pub fn new(previews: Arc<dyn PreviewProvider>) -> Self {
        let parameters = ParameterStore::new();
        let updated_at = SystemTime::now();
        let (snapshot_tx, _snapshot_rx) = watch::channel(SessionSnapshot {
            parameters: parameters.get(),
            preview_url: None,
            road_conditions: Vec::new(),
            catalog_status: CatalogStatus::NotLoaded,
            request: RequestState::Idle,
            result: None,
            notice: None,
            updated_at,
        });
        Self {
            parameters,
            image: ImageAsset::new(previews),
            catalog: RoadConditionCatalog::new(),
            lifecycle: RequestLifecycle::new(),
            submitted: None,
            interpreted: None,
            notice: None,
            updated_at,
            snapshot_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            parameters: self.parameters.get(),
            preview_url: self.image.preview_url().map(str::to_string),
            road_conditions: self.catalog.values().to_vec(),
            catalog_status: self.catalog.status(),
            request: self.lifecycle.state().clone(),
            result: self.interpreted.clone(),
            notice: self.notice.clone(),
            updated_at: self.updated_at,
        }
    }

    /// Stamps the state and pushes a fresh snapshot to subscribers.
    pub fn publish(&mut self) {
        self.updated_at = SystemTime::now();
        let snapshot = self.snapshot();
        self.snapshot_tx.send_replace(snapshot);
    }

    /// Parameters sent with the current attempt, if one got past validation.
    pub fn submitted(&self) -> Option<&ParameterSet> {
        self.submitted.as_ref()
    }

    pub(crate) fn begin_attempt(&mut self) {
        self.submitted = None;
        self.interpreted = None;
    }

    pub(crate) fn set_submitted(&mut self, parameters: ParameterSet) {
        self.submitted = Some(parameters);
    }

    pub fn interpreted(&self) -> Option<&InterpretedResult> {
        self.interpreted.as_ref()
    }

    pub(crate) fn set_interpreted(&mut self, result: InterpretedResult) {
        self.interpreted = Some(result);
    }

    pub fn notice(&self) -> Option<&SessionError> {
        self.notice.as_ref()
    }

    pub(crate) fn set_notice(&mut self, notice: Option<SessionError>) {
        self.notice = notice;
    }
}
