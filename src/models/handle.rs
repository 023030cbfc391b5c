//! The process-wide model handle: the loaded artifact plus its expected schema

use crate::error::ModelError;
use crate::models::artifact::Artifact;
use crate::models::loader::ModelLoader;
use crate::models::schema::infer_expected_schema;
use crate::types::feature::AlignedRow;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

/// Immutable after construction; shared by every request.
pub struct ModelHandle {
    artifact: Box<dyn Artifact>,
    expected_features: Option<Vec<String>>,
    model_file: String,
}

impl ModelHandle {
    /// Load the artifact at `path`. Any failure here is a startup failure.
    pub fn load<P: AsRef<Path>>(path: P, loader: &ModelLoader) -> Result<Self> {
        let path = path.as_ref();
        let artifact = loader
            .load(path)
            .with_context(|| format!("Failed to load model {}", path.display()))?;
        let model_file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::from_artifact(artifact, model_file))
    }

    pub fn from_artifact(artifact: Box<dyn Artifact>, model_file: impl Into<String>) -> Self {
        let model_file = model_file.into();
        let expected_features = infer_expected_schema(artifact.introspect());

        match &expected_features {
            Some(columns) => info!(
                model_file = %model_file,
                columns = columns.len(),
                "Expected features: {:?}",
                columns
            ),
            None => warn!(
                model_file = %model_file,
                "Expected features unknown, input columns will be passed through as given"
            ),
        }
        if !artifact.supports_proba() {
            warn!(
                model_file = %model_file,
                "Model has no predict_proba; plain predictions are clamped into [0, 1], \
                 which is only an approximation of a probability"
            );
        }

        Self {
            artifact,
            expected_features,
            model_file,
        }
    }

    /// File name of the loaded artifact
    pub fn model_file(&self) -> &str {
        &self.model_file
    }

    /// Ordered training-time columns, `None` when unknown
    pub fn expected_features(&self) -> Option<&[String]> {
        self.expected_features.as_deref()
    }

    /// Probability of default for one aligned row.
    ///
    /// Uses the positive-class probability when the artifact has one,
    /// otherwise the plain prediction clamped into [0, 1].
    pub fn score(&self, row: &AlignedRow) -> Result<f64, ModelError> {
        let value = if self.artifact.supports_proba() {
            self.artifact.predict_proba(row)?
        } else {
            self.artifact.predict(row)?.clamp(0.0, 1.0)
        };
        if !value.is_finite() {
            return Err(ModelError::NonFiniteOutput(value));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::artifact::Introspect;
    use crate::types::feature::Cell;

    /// Artifact returning a fixed raw output.
    struct Fixed {
        proba: bool,
        value: f64,
    }

    impl Introspect for Fixed {}

    impl Artifact for Fixed {
        fn kind(&self) -> &'static str {
            "fixed"
        }

        fn introspect(&self) -> &dyn Introspect {
            self
        }

        fn supports_proba(&self) -> bool {
            self.proba
        }

        fn predict_proba(&self, _row: &AlignedRow) -> Result<f64, ModelError> {
            Ok(self.value)
        }

        fn predict(&self, _row: &AlignedRow) -> Result<f64, ModelError> {
            Ok(self.value)
        }
    }

    fn one_cell_row() -> AlignedRow {
        let mut row = AlignedRow::new();
        row.push("x", Cell::Number(1.0));
        row
    }

    #[test]
    fn test_fallback_prediction_is_clamped() {
        for (raw, expected) in [(3.5, 1.0), (-2.0, 0.0), (0.25, 0.25)] {
            let handle = ModelHandle::from_artifact(
                Box::new(Fixed {
                    proba: false,
                    value: raw,
                }),
                "reg.json",
            );
            assert_eq!(handle.score(&one_cell_row()).unwrap(), expected);
        }
    }

    #[test]
    fn test_probability_passed_through() {
        let handle = ModelHandle::from_artifact(
            Box::new(Fixed {
                proba: true,
                value: 0.42,
            }),
            "clf.json",
        );
        assert_eq!(handle.score(&one_cell_row()).unwrap(), 0.42);
        assert_eq!(handle.expected_features(), None);
        assert_eq!(handle.model_file(), "clf.json");
    }

    #[test]
    fn test_nan_output_is_error() {
        let handle = ModelHandle::from_artifact(
            Box::new(Fixed {
                proba: false,
                value: f64::NAN,
            }),
            "reg.json",
        );
        assert!(matches!(
            handle.score(&one_cell_row()),
            Err(ModelError::NonFiniteOutput(_))
        ));
    }

    #[test]
    fn test_load_bundled_model() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/models/final_model_auc.json");
        let handle = ModelHandle::load(path, &ModelLoader::new()).unwrap();

        assert_eq!(handle.model_file(), "final_model_auc.json");
        assert_eq!(
            handle.expected_features().unwrap(),
            &[
                "payment_delay_ratio",
                "cart_abandonment_rate",
                "geo_variance_score",
                "avg_order_value",
                "avg_recharge_amt",
                "months_active",
                "employment_type",
            ]
        );

        // every numeric input at its training mean, unknown employment
        let mut row = AlignedRow::new();
        for column in handle.expected_features().unwrap() {
            row.push(column.clone(), Cell::Missing);
        }
        let p = handle.score(&row).unwrap();
        let expected = 1.0 / (1.0 + 1.4f64.exp());
        assert!((p - expected).abs() < 1e-12);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = ModelHandle::load("missing/model.json", &ModelLoader::new());
        let err = result.err().unwrap();
        assert!(err.to_string().contains("missing/model.json"));
    }
}
