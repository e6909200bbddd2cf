use crate::parameters::Parameter;
use thiserror::Error;

pub const GENERIC_FAILURE_MESSAGE: &str = "Prediction failed";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("Please upload a tire image")]
    MissingImage,
    #[error("Failed to load road conditions")]
    CatalogUnavailable,
    #[error("prediction service unreachable")]
    NetworkError,
    #[error("{0}")]
    ServerError(String),
    #[error("{parameter} value {value} is outside {min}..={max}")]
    InvalidParameter {
        parameter: Parameter,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("unknown road condition: {0}")]
    UnknownRoadCondition(String),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::MissingImage => "MISSING_IMAGE",
            SessionError::CatalogUnavailable => "CATALOG_UNAVAILABLE",
            SessionError::NetworkError => "NETWORK_ERROR",
            SessionError::ServerError(_) => "SERVER_ERROR",
            SessionError::InvalidParameter { .. } => "INVALID_PARAMETER",
            SessionError::UnknownRoadCondition(_) => "UNKNOWN_ROAD_CONDITION",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("http status {status}")]
    Status { status: u16, message: Option<String> },
    #[error("malformed response body: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn into_session_error(self) -> SessionError {
        match self {
            TransportError::Network(_) => SessionError::NetworkError,
            TransportError::Status {
                message: Some(message),
                ..
            } => SessionError::ServerError(message),
            TransportError::Status { message: None, .. } | TransportError::Decode(_) => {
                SessionError::ServerError(GENERIC_FAILURE_MESSAGE.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_with_message_maps_to_server_error_verbatim() {
        let err = TransportError::Status {
            status: 500,
            message: Some("model unavailable".to_string()),
        };

        assert_eq!(
            err.into_session_error(),
            SessionError::ServerError("model unavailable".to_string())
        );
    }

    #[test]
    fn status_without_message_uses_generic_failure() {
        let err = TransportError::Status {
            status: 502,
            message: None,
        };

        assert_eq!(
            err.into_session_error(),
            SessionError::ServerError(GENERIC_FAILURE_MESSAGE.to_string())
        );
    }

    #[test]
    fn network_failure_maps_to_network_error() {
        let err = TransportError::Network("connection refused".to_string());
        assert_eq!(err.into_session_error(), SessionError::NetworkError);
    }

    #[test]
    fn invalid_parameter_message_names_field_and_domain() {
        let err = SessionError::InvalidParameter {
            parameter: Parameter::Speed,
            value: 250.0,
            min: 20.0,
            max: 200.0,
        };
        assert_eq!(err.to_string(), "speed value 250 is outside 20..=200");
        assert_eq!(err.code(), "INVALID_PARAMETER");
    }
}
