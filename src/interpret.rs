use crate::parameters::ParameterSet;
use crate::transport::PredictionResult;
use serde::Serialize;

/// Lifespan shown as a full progress bar.
pub const FULL_PROGRESS_KM: f64 = 150_000.0;
pub const SHORT_LIFESPAN_BELOW_KM: f64 = 30_000.0;
pub const GOOD_LIFESPAN_FROM_KM: f64 = 60_000.0;

// Typical operating ranges. Narrower than the accepted input domains.
pub const TYPICAL_MAX_PRESSURE_PSI: f64 = 50.0;
pub const TYPICAL_MAX_LOAD_LBS: f64 = 5_000.0;
pub const TYPICAL_MAX_TEMPERATURE_C: f64 = 50.0;
pub const TYPICAL_MAX_SPEED_KMH: f64 = 120.0;

pub const OUT_OF_RANGE_NOTE: &str =
    "Some inputs are outside typical ranges. Predictions may be less reliable.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceBucket {
    Short,
    Average,
    Good,
}

impl MaintenanceBucket {
    pub fn from_lifespan_km(lifespan_km: f64) -> Self {
        if lifespan_km < SHORT_LIFESPAN_BELOW_KM {
            MaintenanceBucket::Short
        } else if lifespan_km < GOOD_LIFESPAN_FROM_KM {
            MaintenanceBucket::Average
        } else {
            MaintenanceBucket::Good
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            MaintenanceBucket::Short => "Short Lifespan Detected",
            MaintenanceBucket::Average => "Average Lifespan",
            MaintenanceBucket::Good => "Good Lifespan",
        }
    }

    pub fn suggestions(self) -> &'static [&'static str] {
        match self {
            MaintenanceBucket::Short => &[
                "Increase inspection frequency",
                "Reduce heavy loads when possible",
                "Check for alignment issues",
                "Consider higher-grade tires",
            ],
            MaintenanceBucket::Average => &[
                "Regular maintenance schedule",
                "Monitor tire pressure weekly",
                "Rotate tires every 5,000 km",
                "Check for uneven wear",
            ],
            MaintenanceBucket::Good => &[
                "Continue current maintenance routine",
                "Regular pressure checks",
                "Monitor tread depth",
                "Keep records of maintenance",
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterpretedResult {
    pub lifespan_km: f64,
    pub lifespan_miles: f64,
    pub classification: String,
    pub progress_ratio: f64,
    pub maintenance_bucket: MaintenanceBucket,
    pub out_of_range_warning: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<serde_json::Value>,
}

impl InterpretedResult {
    pub fn progress_percent(&self) -> f64 {
        self.progress_ratio * 100.0
    }
}

pub fn interpret(result: &PredictionResult, params: &ParameterSet) -> InterpretedResult {
    let debug_info = if params.debug_mode {
        result.debug_info.clone()
    } else {
        None
    };

    InterpretedResult {
        lifespan_km: result.lifespan_km,
        lifespan_miles: result.lifespan_miles,
        classification: result.classification.clone(),
        progress_ratio: progress_ratio(result.lifespan_km),
        maintenance_bucket: MaintenanceBucket::from_lifespan_km(result.lifespan_km),
        out_of_range_warning: exceeds_typical_range(params),
        debug_info,
    }
}

pub fn progress_ratio(lifespan_km: f64) -> f64 {
    (lifespan_km / FULL_PROGRESS_KM).clamp(0.0, 1.0)
}

pub fn exceeds_typical_range(params: &ParameterSet) -> bool {
    params.pressure > TYPICAL_MAX_PRESSURE_PSI
        || params.load > TYPICAL_MAX_LOAD_LBS
        || params.temperature > TYPICAL_MAX_TEMPERATURE_C
        || params.speed > TYPICAL_MAX_SPEED_KMH
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(lifespan_km: f64) -> PredictionResult {
        PredictionResult {
            lifespan_km,
            lifespan_miles: (lifespan_km * 0.621371).round(),
            classification: "Good".to_string(),
            debug_info: Some(json!({ "cnn_probability": 0.91 })),
        }
    }

    #[test]
    fn bucket_boundaries_are_inclusive_exclusive() {
        let cases = [
            (29_999.999, MaintenanceBucket::Short),
            (30_000.0, MaintenanceBucket::Average),
            (59_999.999, MaintenanceBucket::Average),
            (60_000.0, MaintenanceBucket::Good),
        ];
        for (lifespan_km, expected) in cases {
            assert_eq!(
                MaintenanceBucket::from_lifespan_km(lifespan_km),
                expected,
                "lifespan {lifespan_km}"
            );
        }
    }

    #[test]
    fn progress_ratio_is_clamped() {
        let params = ParameterSet::default();
        assert_eq!(interpret(&result(225_000.0), &params).progress_ratio, 1.0);
        assert_eq!(interpret(&result(75_000.0), &params).progress_ratio, 0.5);
        assert_eq!(progress_ratio(-10.0), 0.0);
    }

    #[test]
    fn pressure_warning_threshold_is_strict() {
        let over = ParameterSet {
            pressure: 50.1,
            ..ParameterSet::default()
        };
        let at = ParameterSet {
            pressure: 50.0,
            ..ParameterSet::default()
        };

        assert!(interpret(&result(40_000.0), &over).out_of_range_warning);
        assert!(!interpret(&result(40_000.0), &at).out_of_range_warning);
    }

    #[test]
    fn each_typical_range_triggers_warning() {
        let atypical = [
            ParameterSet {
                load: 5_000.5,
                ..ParameterSet::default()
            },
            ParameterSet {
                temperature: 51.0,
                ..ParameterSet::default()
            },
            ParameterSet {
                speed: 121.0,
                ..ParameterSet::default()
            },
        ];
        for params in atypical {
            assert!(exceeds_typical_range(&params), "{params:?}");
        }
        assert!(!exceeds_typical_range(&ParameterSet::default()));
    }

    #[test]
    fn debug_info_hidden_unless_debug_mode() {
        let payload = result(80_000.0);
        let quiet = interpret(&payload, &ParameterSet::default());
        let verbose = interpret(
            &payload,
            &ParameterSet {
                debug_mode: true,
                ..ParameterSet::default()
            },
        );

        assert!(quiet.debug_info.is_none());
        assert_eq!(verbose.debug_info, Some(json!({ "cnn_probability": 0.91 })));
    }

    #[test]
    fn interpret_is_deterministic() {
        let payload = result(31_000.0);
        let params = ParameterSet {
            speed: 130.0,
            ..ParameterSet::default()
        };

        assert_eq!(interpret(&payload, &params), interpret(&payload, &params));
    }

    #[test]
    fn suggestions_follow_bucket() {
        let interpreted = interpret(&result(12_000.0), &ParameterSet::default());

        assert_eq!(interpreted.maintenance_bucket, MaintenanceBucket::Short);
        assert_eq!(interpreted.maintenance_bucket.title(), "Short Lifespan Detected");
        assert_eq!(interpreted.maintenance_bucket.suggestions().len(), 4);

        let halfway = interpret(&result(75_000.0), &ParameterSet::default());
        assert_eq!(halfway.progress_percent(), 50.0);
    }
}
