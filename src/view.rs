//! Serializable rendering of a [`SessionSnapshot`] for the presentation layer.

use crate::catalog::CatalogStatus;
use crate::error::SessionError;
use crate::interpret::{InterpretedResult, MaintenanceBucket, OUT_OF_RANGE_NOTE};
use crate::lifecycle::RequestPhase;
use crate::parameters::ParameterSet;
use crate::state::SessionSnapshot;
use serde::Serialize;
use std::time::SystemTime;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("timestamp format error: {0}")]
    Timestamp(#[from] time::error::Format),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SessionView {
    pub parameters: ParameterSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    pub road_conditions: Vec<String>,
    pub catalog_status: CatalogStatus,
    pub request: RequestView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<ErrorView>,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RequestView {
    pub phase: RequestPhase,
    /// True while a submit button should stay disabled.
    pub loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorView>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ErrorView {
    pub error_code: &'static str,
    pub error_message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ResultView {
    pub lifespan_km: f64,
    pub lifespan_miles: f64,
    pub classification: String,
    pub progress_percent: f64,
    pub maintenance: MaintenanceView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MaintenanceView {
    pub bucket: MaintenanceBucket,
    pub title: &'static str,
    pub suggestions: &'static [&'static str],
}

impl SessionView {
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Result<Self, ViewError> {
        Ok(Self {
            parameters: snapshot.parameters.clone(),
            preview_url: snapshot.preview_url.clone(),
            road_conditions: snapshot.road_conditions.clone(),
            catalog_status: snapshot.catalog_status,
            request: RequestView {
                phase: snapshot.request.phase(),
                loading: snapshot.request.is_in_flight(),
                error: snapshot.request.error().map(ErrorView::from),
            },
            result: snapshot.result.as_ref().map(ResultView::from),
            notice: snapshot.notice.as_ref().map(ErrorView::from),
            updated_at: format_timestamp(snapshot.updated_at)?,
        })
    }
}

impl From<&SessionError> for ErrorView {
    fn from(err: &SessionError) -> Self {
        Self {
            error_code: err.code(),
            error_message: err.to_string(),
        }
    }
}

impl From<&InterpretedResult> for ResultView {
    fn from(result: &InterpretedResult) -> Self {
        let bucket = result.maintenance_bucket;
        Self {
            lifespan_km: result.lifespan_km,
            lifespan_miles: result.lifespan_miles,
            classification: result.classification.clone(),
            progress_percent: result.progress_percent(),
            maintenance: MaintenanceView {
                bucket,
                title: bucket.title(),
                suggestions: bucket.suggestions(),
            },
            warning: result.out_of_range_warning.then_some(OUT_OF_RANGE_NOTE),
            debug_info: result.debug_info.clone(),
        }
    }
}

pub fn format_timestamp(timestamp: SystemTime) -> Result<String, ViewError> {
    let datetime = OffsetDateTime::from(timestamp);
    Ok(datetime.format(&Rfc3339)?)
}
