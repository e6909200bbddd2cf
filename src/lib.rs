//! Client-side session for tire lifespan prediction.
//!
//! A [`PredictionSessionController`] owns the operator's inputs (image and
//! operational parameters), runs one prediction request at a time against the
//! prediction service, and interprets the answer into a maintenance bucket,
//! progress ratio and out-of-range warning.

pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod image;
pub mod interpret;
pub mod lifecycle;
pub mod logging;
pub mod parameters;
pub mod state;
pub mod transport;
pub mod view;

pub use controller::{PredictionSessionController, SubmitOutcome};
pub use error::{SessionError, TransportError};
pub use image::ImageFile;
pub use interpret::{InterpretedResult, MaintenanceBucket, interpret};
pub use lifecycle::RequestState;
pub use parameters::{Parameter, ParameterSet, ParameterUpdate};
pub use transport::http::HttpTransport;
pub use transport::{PredictionResult, PredictionTransport};
