//! Capabilities every loaded model artifact exposes to the service

use crate::error::ModelError;
use crate::types::feature::AlignedRow;

/// A raw-column selector declared by a preprocessing step.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSelector {
    pub name: String,
    pub columns: Vec<String>,
    /// Columns selected only to be discarded
    pub drop: bool,
}

/// How an artifact describes its own inputs. Every capability is optional.
pub trait Introspect {
    /// Feature names stored directly on the artifact at training time.
    fn stored_feature_names(&self) -> Option<Vec<String>> {
        None
    }

    /// Named sub-steps, empty for single-step artifacts.
    fn steps(&self) -> Vec<&dyn StepIntrospect> {
        Vec::new()
    }
}

/// How one pipeline step describes its inputs.
pub trait StepIntrospect {
    fn name(&self) -> &str;

    fn column_selectors(&self) -> Option<Vec<ColumnSelector>> {
        None
    }

    fn stored_feature_names(&self) -> Option<Vec<String>> {
        None
    }
}

/// A trained estimator loaded from disk.
///
/// Implementations are immutable after loading and shared across requests.
pub trait Artifact: Send + Sync {
    /// Short format name, for logs
    fn kind(&self) -> &'static str;

    fn introspect(&self) -> &dyn Introspect;

    /// Whether `predict_proba` is available
    fn supports_proba(&self) -> bool;

    /// Probability mass of the positive (default) class
    fn predict_proba(&self, row: &AlignedRow) -> Result<f64, ModelError>;

    /// Plain prediction output, unbounded
    fn predict(&self, row: &AlignedRow) -> Result<f64, ModelError>;
}
