use crate::error::SessionError;
use crate::parameters::DEFAULT_ROAD_CONDITION;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogStatus {
    NotLoaded,
    Loading,
    Loaded,
    Unavailable,
}

/// Road-condition values offered by the prediction service.
///
/// Loading is split into `begin_load` and `complete`/`fail` so the caller can
/// await the fetch without holding a borrow on the catalog.
#[derive(Debug)]
pub struct RoadConditionCatalog {
    status: CatalogStatus,
    values: Vec<String>,
}

impl RoadConditionCatalog {
    pub fn new() -> Self {
        Self {
            status: CatalogStatus::NotLoaded,
            values: Vec::new(),
        }
    }

    /// Returns false when a load already finished or is in flight.
    pub fn begin_load(&mut self) -> bool {
        match self.status {
            CatalogStatus::Loaded | CatalogStatus::Loading => false,
            CatalogStatus::NotLoaded | CatalogStatus::Unavailable => {
                self.status = CatalogStatus::Loading;
                true
            }
        }
    }

    /// Stores fetched values and returns the default selection.
    pub fn complete(&mut self, values: Vec<String>) -> Result<String, SessionError> {
        let Some(default) = default_road_condition(&values).map(str::to_string) else {
            self.fail();
            return Err(SessionError::CatalogUnavailable);
        };
        self.values = values;
        self.status = CatalogStatus::Loaded;
        Ok(default)
    }

    pub fn fail(&mut self) {
        self.values.clear();
        self.status = CatalogStatus::Unavailable;
    }

    pub fn status(&self) -> CatalogStatus {
        self.status
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|candidate| candidate == value)
    }

    pub fn default_value(&self) -> Option<&str> {
        default_road_condition(&self.values)
    }
}

impl Default for RoadConditionCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// `"paved"` when offered, otherwise the first value.
pub fn default_road_condition(values: &[String]) -> Option<&str> {
    if values.iter().any(|value| value == DEFAULT_ROAD_CONDITION) {
        return Some(DEFAULT_ROAD_CONDITION);
    }
    values.first().map(String::as_str)
}
