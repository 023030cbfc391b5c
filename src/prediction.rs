//! Request-to-prediction pipeline: coerce, align, score, derive the credit score

use crate::error::PredictionError;
use crate::feature_aligner::align_row;
use crate::metrics::PredictionMetrics;
use crate::models::handle::ModelHandle;
use crate::types::feature::FeatureMap;
use crate::types::risk::{credit_score, RiskCategory, RiskThresholds};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// Result of a single prediction
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    /// Probability of default (0.0 - 1.0)
    pub probability_of_default: f64,
    /// Credit score (300 - 900)
    pub credit_score: i32,
    /// Columns handed to the model, in order
    pub used_feature_names: Vec<String>,
    /// Risk category of the probability of default
    pub risk_category: RiskCategory,
}

/// Stateless prediction service over the shared model handle
pub struct PredictionService {
    model: Arc<ModelHandle>,
    risk_thresholds: RiskThresholds,
    metrics: Arc<PredictionMetrics>,
}

impl PredictionService {
    pub fn new(
        model: Arc<ModelHandle>,
        risk_thresholds: RiskThresholds,
        metrics: Arc<PredictionMetrics>,
    ) -> Self {
        Self {
            model,
            risk_thresholds,
            metrics,
        }
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn metrics(&self) -> &Arc<PredictionMetrics> {
        &self.metrics
    }

    /// Run one prediction. Failures carry the underlying cause and leave no
    /// trace on the service.
    pub fn predict(&self, features: &FeatureMap) -> Result<PredictionResult, PredictionError> {
        let request_id = Uuid::new_v4();
        let start_time = Instant::now();

        let row = align_row(features, self.model.expected_features());
        let probability = match self.model.score(&row) {
            Ok(p) => p,
            Err(e) => {
                self.metrics.record_failure(start_time.elapsed());
                warn!(
                    request_id = %request_id,
                    features = features.len(),
                    error = %e,
                    "Prediction failed"
                );
                return Err(e.into());
            }
        };

        let credit_score = credit_score(probability);
        let risk_category = RiskCategory::from_probability(probability, &self.risk_thresholds);
        let latency = start_time.elapsed();
        self.metrics
            .record_prediction(latency, probability, risk_category);

        debug!(
            request_id = %request_id,
            probability_of_default = probability,
            credit_score,
            risk_category = risk_category.as_str(),
            latency_us = latency.as_micros() as u64,
            "Prediction complete"
        );

        Ok(PredictionResult {
            probability_of_default: probability,
            credit_score,
            used_feature_names: row.into_columns(),
            risk_category,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::models::pipeline::PipelineArtifact;
    use crate::types::feature::FeatureValue;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn service(artifact: serde_json::Value) -> PredictionService {
        let artifact = PipelineArtifact::from_json(&artifact.to_string()).unwrap();
        let model = ModelHandle::from_artifact(Box::new(artifact), "test.json");
        PredictionService::new(
            Arc::new(model),
            RiskThresholds::default(),
            Arc::new(PredictionMetrics::new()),
        )
    }

    fn classifier() -> PredictionService {
        service(json!({
            "feature_names_in": ["age", "income"],
            "steps": [{
                "name": "clf",
                "kind": "linear_model",
                "coefficients": [0.0, 0.0],
                "intercept": 0.0,
                "link": "logit"
            }]
        }))
    }

    #[test]
    fn test_predict_aligns_and_scores() {
        let service = classifier();
        let features: FeatureMap = [
            ("income", FeatureValue::from("₹12,000")),
            ("age", FeatureValue::from("34")),
            ("nickname", FeatureValue::from("bob")),
        ]
        .into_iter()
        .collect();

        let result = service.predict(&features).unwrap();

        assert_eq!(result.probability_of_default, 0.5);
        assert_eq!(result.credit_score, 600);
        assert_eq!(result.used_feature_names, vec!["age", "income"]);
        assert_eq!(result.risk_category, RiskCategory::Medium);
        assert_eq!(service.metrics().predictions.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_failure_then_success() {
        let service = classifier();

        let bad: FeatureMap = [("age", "self-employed"), ("income", "1")].into_iter().collect();
        let err = service.predict(&bad).unwrap_err();
        assert!(matches!(
            err,
            PredictionError::Inference(ModelError::NonNumeric { .. })
        ));
        assert!(err.to_string().contains("self-employed"));

        let good: FeatureMap = [("age", 30.0), ("income", 1000.0)].into_iter().collect();
        assert!(service.predict(&good).is_ok());
        assert_eq!(service.metrics().failures.load(Ordering::Relaxed), 1);
        assert_eq!(service.metrics().predictions.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_regressor_output_clamped_before_scoring() {
        let service = service(json!({
            "feature_names_in": ["x"],
            "steps": [{
                "name": "reg",
                "kind": "linear_model",
                "coefficients": [1.0],
                "intercept": 0.0,
                "link": "identity"
            }]
        }));

        let high: FeatureMap = [("x", 42.0)].into_iter().collect();
        let result = service.predict(&high).unwrap();
        assert_eq!(result.probability_of_default, 1.0);
        assert_eq!(result.credit_score, 300);

        let low: FeatureMap = [("x", -3.0)].into_iter().collect();
        let result = service.predict(&low).unwrap();
        assert_eq!(result.probability_of_default, 0.0);
        assert_eq!(result.credit_score, 900);
    }
}
