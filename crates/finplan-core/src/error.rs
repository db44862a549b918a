use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("Assumption set not found for region {region}, version {version}")]
    AssumptionNotFound { region: String, version: String },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Calibration error: {reason}")]
    Calibration { reason: String },

    #[error("Unsupported: {feature}")]
    Unsupported { feature: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for PlanningError {
    fn from(e: serde_json::Error) -> Self {
        PlanningError::SerializationError(e.to_string())
    }
}
