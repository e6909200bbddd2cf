//! Boundary to the prediction service.
//!
//! `GET /api/road_conditions` lists catalog values and `POST /api/predict`
//! takes a multipart form with the image and every parameter.

use crate::error::TransportError;
use crate::image::ImageFile;
use crate::parameters::ParameterSet;
use serde::{Deserialize, Serialize};
use std::future::Future;

pub mod http;
pub mod mock;

pub const ROAD_CONDITIONS_PATH: &str = "/api/road_conditions";
pub const PREDICT_PATH: &str = "/api/predict";
pub const IMAGE_FIELD: &str = "image";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub lifespan_km: f64,
    pub lifespan_miles: f64,
    pub classification: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadConditionsResponse {
    pub road_conditions: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
}

/// One prediction attempt: the image plus the parameters as they were at submit.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub image: ImageFile,
    pub parameters: ParameterSet,
}

impl PredictionRequest {
    pub fn new(image: ImageFile, parameters: ParameterSet) -> Self {
        Self { image, parameters }
    }

    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        self.parameters.form_fields()
    }
}

pub trait PredictionTransport: Send + Sync {
    fn fetch_road_conditions(
        &self,
    ) -> impl Future<Output = Result<Vec<String>, TransportError>> + Send;

    fn predict(
        &self,
        request: PredictionRequest,
    ) -> impl Future<Output = Result<PredictionResult, TransportError>> + Send;
}

/// Maps a non-2xx response body to [`TransportError::Status`].
pub fn status_error(status: u16, body: &[u8]) -> TransportError {
    let message = serde_json::from_slice::<ErrorResponse>(body)
        .ok()
        .and_then(|response| response.error)
        .filter(|message| !message.trim().is_empty());
    TransportError::Status { status, message }
}

pub fn decode_prediction(body: &[u8]) -> Result<PredictionResult, TransportError> {
    serde_json::from_slice(body).map_err(|err| TransportError::Decode(err.to_string()))
}

pub fn decode_road_conditions(body: &[u8]) -> Result<Vec<String>, TransportError> {
    serde_json::from_slice::<RoadConditionsResponse>(body)
        .map(|response| response.road_conditions)
        .map_err(|err| TransportError::Decode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_reads_error_field() {
        let err = status_error(500, br#"{"error":"model unavailable"}"#);
        assert_eq!(
            err,
            TransportError::Status {
                status: 500,
                message: Some("model unavailable".to_string()),
            }
        );
    }

    #[test]
    fn status_error_without_json_body_has_no_message() {
        let err = status_error(502, b"<html>Bad Gateway</html>");
        assert_eq!(
            err,
            TransportError::Status {
                status: 502,
                message: None,
            }
        );
    }

    #[test]
    fn prediction_accepts_integer_lifespans_and_null_debug_info() -> Result<(), TransportError> {
        let result = decode_prediction(
            br#"{"lifespan_km":45000,"lifespan_miles":27962,"classification":"Defective","debug_info":null}"#,
        )?;

        assert_eq!(result.lifespan_km, 45_000.0);
        assert_eq!(result.lifespan_miles, 27_962.0);
        assert_eq!(result.classification, "Defective");
        assert!(result.debug_info.is_none());
        Ok(())
    }

    #[test]
    fn prediction_missing_fields_is_decode_error() {
        assert!(matches!(
            decode_prediction(br#"{"classification":"Good"}"#),
            Err(TransportError::Decode(_))
        ));
    }

    #[test]
    fn road_conditions_keep_server_order() -> Result<(), TransportError> {
        let values = decode_road_conditions(br#"{"road_conditions":["gravel","dirt","paved"]}"#)?;
        assert_eq!(values, vec!["gravel", "dirt", "paved"]);
        Ok(())
    }
}
