//! Request and response bodies of the HTTP interface

use crate::types::feature::FeatureMap;
use serde::{Deserialize, Serialize};

/// Body of `POST /predict`
#[derive(Debug, Clone, Deserialize)]
pub struct PredictRequest {
    /// Feature map for the model
    pub features: FeatureMap,
}

/// Successful prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Probability of default (0.0 - 1.0)
    pub probability_of_default: f64,
    /// Credit score (300 - 900)
    pub credit_score: i32,
    /// Columns actually handed to the model, in order
    pub used_feature_names: Vec<String>,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub model_file: String,
}

/// Body of `GET /meta`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaResponse {
    pub model_file: String,
    /// Expected input columns, `null` when the model does not expose them
    pub expected_features: Option<Vec<String>>,
}

/// Error body returned with every 4xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::feature::FeatureValue;

    #[test]
    fn test_predict_request_deserialization() {
        let body = r#"{"features": {"age": 34, "employment": "self-employed", "owns_home": false}}"#;
        let req: PredictRequest = serde_json::from_str(body).unwrap();

        assert_eq!(req.features.len(), 3);
        assert_eq!(req.features.get("owns_home"), Some(&FeatureValue::Bool(false)));
    }

    #[test]
    fn test_predict_request_requires_features() {
        assert!(serde_json::from_str::<PredictRequest>(r#"{"age": 34}"#).is_err());
    }

    #[test]
    fn test_meta_serializes_unknown_schema_as_null() {
        let meta = MetaResponse {
            model_file: "model.json".to_string(),
            expected_features: None,
        };

        let json = serde_json::to_value(&meta).unwrap();
        assert!(json["expected_features"].is_null());
    }
}
