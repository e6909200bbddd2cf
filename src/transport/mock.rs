//! Deterministic in-process transport for exercising the session without a
//! prediction service.

use crate::error::TransportError;
use crate::transport::{PredictionRequest, PredictionResult, PredictionTransport, status_error};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq)]
pub enum MockPrediction {
    Success(PredictionResult),
    Status { status: u16, body: String },
    NetworkFailure,
    Malformed,
}

impl MockPrediction {
    pub fn success(lifespan_km: f64, classification: &str) -> Self {
        MockPrediction::Success(PredictionResult {
            lifespan_km,
            lifespan_miles: (lifespan_km * 0.621371).round(),
            classification: classification.to_string(),
            debug_info: None,
        })
    }

    pub fn server_error(status: u16, message: &str) -> Self {
        MockPrediction::Status {
            status,
            body: serde_json::json!({ "error": message }).to_string(),
        }
    }

    fn into_result(self) -> Result<PredictionResult, TransportError> {
        match self {
            MockPrediction::Success(result) => Ok(result),
            MockPrediction::Status { status, body } => Err(status_error(status, body.as_bytes())),
            MockPrediction::NetworkFailure => {
                Err(TransportError::Network("connection refused".to_string()))
            }
            MockPrediction::Malformed => Err(TransportError::Decode(
                "expected value at line 1 column 1".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCatalog {
    Values(Vec<String>),
    Unavailable,
}

/// Scripted transport. Predictions are answered from a queue; an empty queue
/// answers with a network failure.
#[derive(Debug)]
pub struct MockTransport {
    catalog: MockCatalog,
    predictions: Mutex<VecDeque<MockPrediction>>,
    requests: Mutex<Vec<PredictionRequest>>,
    catalog_calls: AtomicUsize,
    predict_calls: AtomicUsize,
    hold_predictions: bool,
    hold_catalog: bool,
    dispatched: Notify,
    release: Notify,
}

impl MockTransport {
    pub fn new(catalog: MockCatalog, predictions: Vec<MockPrediction>) -> Self {
        Self {
            catalog,
            predictions: Mutex::new(predictions.into()),
            requests: Mutex::new(Vec::new()),
            catalog_calls: AtomicUsize::new(0),
            predict_calls: AtomicUsize::new(0),
            hold_predictions: false,
            hold_catalog: false,
            dispatched: Notify::new(),
            release: Notify::new(),
        }
    }

    pub fn with_road_conditions(values: &[&str], predictions: Vec<MockPrediction>) -> Self {
        Self::new(
            MockCatalog::Values(values.iter().map(|value| value.to_string()).collect()),
            predictions,
        )
    }

    /// Keeps each prediction pending until [`MockTransport::release_one`].
    pub fn holding_predictions(mut self) -> Self {
        self.hold_predictions = true;
        self
    }

    /// Keeps each catalog fetch pending until [`MockTransport::release_one`].
    pub fn holding_catalog(mut self) -> Self {
        self.hold_catalog = true;
        self
    }

    /// Resolves once a prediction request has reached the transport.
    pub async fn wait_for_dispatch(&self) {
        self.dispatched.notified().await;
    }

    pub fn release_one(&self) {
        self.release.notify_one();
    }

    pub fn catalog_calls(&self) -> usize {
        self.catalog_calls.load(Ordering::SeqCst)
    }

    pub fn predict_calls(&self) -> usize {
        self.predict_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<PredictionRequest> {
        lock(&self.requests).clone()
    }
}

impl PredictionTransport for MockTransport {
    async fn fetch_road_conditions(&self) -> Result<Vec<String>, TransportError> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        if self.hold_catalog {
            self.release.notified().await;
        }
        match &self.catalog {
            MockCatalog::Values(values) => Ok(values.clone()),
            MockCatalog::Unavailable => Err(TransportError::Status {
                status: 500,
                message: None,
            }),
        }
    }

    async fn predict(&self, request: PredictionRequest) -> Result<PredictionResult, TransportError> {
        self.predict_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.requests).push(request);
        self.dispatched.notify_one();

        if self.hold_predictions {
            self.release.notified().await;
        }

        let next = lock(&self.predictions).pop_front();
        match next {
            Some(prediction) => prediction.into_result(),
            None => MockPrediction::NetworkFailure.into_result(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
