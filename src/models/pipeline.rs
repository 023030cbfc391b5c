//! JSON pipeline artifact: optional column preprocessing followed by a
//! linear model with a logit or identity link.

use crate::error::ModelError;
use crate::models::artifact::{Artifact, ColumnSelector, Introspect, StepIntrospect};
use crate::types::feature::{AlignedRow, Cell};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Link function connecting the linear predictor to the model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkFunction {
    /// Binary classifier, output is a probability.
    Logit,
    /// Regressor, output is unbounded.
    Identity,
}

/// How `one_hot` treats a category it was not fitted on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleUnknown {
    #[default]
    Ignore,
    Error,
}

/// What a column transformer does with its selected columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformAction {
    Drop,
    Passthrough {
        /// Per-column value used when the input is missing
        #[serde(default)]
        fill: Option<Vec<f64>>,
    },
    StandardScaler {
        mean: Vec<f64>,
        scale: Vec<f64>,
        #[serde(default)]
        fill: Option<Vec<f64>>,
    },
    OneHot {
        categories: Vec<Vec<String>>,
        #[serde(default)]
        handle_unknown: HandleUnknown,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transformer {
    pub name: String,
    pub columns: Vec<String>,
    pub action: TransformAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub link: LinkFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    ColumnTransformer { transformers: Vec<Transformer> },
    LinearModel(LinearModel),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStep {
    pub name: String,
    /// Columns this step saw at training time, if recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names_in: Option<Vec<String>>,
    #[serde(flatten)]
    pub kind: StepKind,
}

/// The on-disk pipeline artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names_in: Option<Vec<String>>,
    pub steps: Vec<PipelineStep>,
}

impl PipelineArtifact {
    /// Load and validate an artifact from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        let artifact: PipelineArtifact = serde_json::from_str(text)?;
        artifact.validate()?;
        Ok(artifact)
    }

    fn preprocessor(&self) -> Option<&[Transformer]> {
        self.steps.iter().find_map(|step| match &step.kind {
            StepKind::ColumnTransformer { transformers } => Some(transformers.as_slice()),
            StepKind::LinearModel(_) => None,
        })
    }

    fn estimator(&self) -> &LinearModel {
        match self.steps.last().map(|step| &step.kind) {
            Some(StepKind::LinearModel(model)) => model,
            // validate() guarantees the last step is the estimator
            _ => unreachable!("pipeline without a final linear model"),
        }
    }

    /// Check the structure once at load time so scoring never sees a
    /// malformed pipeline.
    fn validate(&self) -> Result<(), ModelError> {
        let invalid = |msg: String| Err(ModelError::InvalidArtifact(msg));

        let Some(last) = self.steps.last() else {
            return invalid("pipeline has no steps".to_string());
        };
        let StepKind::LinearModel(model) = &last.kind else {
            return invalid(format!("last step '{}' is not a linear_model", last.name));
        };
        if self.steps.len() > 2 {
            return invalid(format!(
                "expected at most one column_transformer before the estimator, found {} steps",
                self.steps.len()
            ));
        }
        if let Some(first) = self.steps.first().filter(|_| self.steps.len() == 2) {
            if !matches!(first.kind, StepKind::ColumnTransformer { .. }) {
                return invalid(format!("step '{}' must be a column_transformer", first.name));
            }
        }

        let width = match self.preprocessor() {
            Some(transformers) => {
                let mut width = 0;
                for transformer in transformers {
                    width += validate_transformer(transformer)?;
                }
                width
            }
            None => match &self.feature_names_in {
                Some(names) => names.len(),
                None => model.coefficients.len(),
            },
        };

        if width != model.coefficients.len() {
            return invalid(format!(
                "estimator '{}' has {} coefficients but receives {} inputs",
                last.name,
                model.coefficients.len(),
                width
            ));
        }
        Ok(())
    }

    /// Turn the aligned row into the dense vector the estimator consumes.
    fn design_row(&self, row: &AlignedRow) -> Result<Vec<f64>, ModelError> {
        let Some(transformers) = self.preprocessor() else {
            return row
                .columns()
                .iter()
                .zip(row.cells())
                .map(|(column, cell)| numeric(column, cell, None))
                .collect();
        };

        let mut values = Vec::with_capacity(self.estimator().coefficients.len());
        for transformer in transformers {
            transform(transformer, row, &mut values)?;
        }
        Ok(values)
    }

    fn linear_predictor(&self, row: &AlignedRow) -> Result<f64, ModelError> {
        let model = self.estimator();
        let x = self.design_row(row)?;
        if x.len() != model.coefficients.len() {
            return Err(ModelError::ShapeMismatch {
                expected: model.coefficients.len(),
                found: x.len(),
            });
        }
        let eta = model.intercept
            + x.iter()
                .zip(&model.coefficients)
                .map(|(x, beta)| x * beta)
                .sum::<f64>();
        if !eta.is_finite() {
            return Err(ModelError::NonFiniteOutput(eta));
        }
        Ok(eta)
    }
}

/// Output width of a transformer, after checking its per-column vectors.
fn validate_transformer(transformer: &Transformer) -> Result<usize, ModelError> {
    let n = transformer.columns.len();
    let check = |what: &str, len: usize| {
        if len == n {
            Ok(())
        } else {
            Err(ModelError::InvalidArtifact(format!(
                "transformer '{}' has {} columns but {} {} values",
                transformer.name, n, len, what
            )))
        }
    };

    match &transformer.action {
        TransformAction::Drop => Ok(0),
        TransformAction::Passthrough { fill } => {
            if let Some(fill) = fill {
                check("fill", fill.len())?;
            }
            Ok(n)
        }
        TransformAction::StandardScaler { mean, scale, fill } => {
            check("mean", mean.len())?;
            check("scale", scale.len())?;
            if let Some(fill) = fill {
                check("fill", fill.len())?;
            }
            if scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
                return Err(ModelError::InvalidArtifact(format!(
                    "transformer '{}' has a zero or non-finite scale",
                    transformer.name
                )));
            }
            Ok(n)
        }
        TransformAction::OneHot { categories, .. } => {
            check("category", categories.len())?;
            Ok(categories.iter().map(Vec::len).sum())
        }
    }
}

static MISSING: Cell = Cell::Missing;

fn transform(
    transformer: &Transformer,
    row: &AlignedRow,
    out: &mut Vec<f64>,
) -> Result<(), ModelError> {
    for (i, column) in transformer.columns.iter().enumerate() {
        let cell = row.get(column).unwrap_or(&MISSING);
        match &transformer.action {
            TransformAction::Drop => {}
            TransformAction::Passthrough { fill } => {
                out.push(numeric(column, cell, fill.as_ref().map(|f| f[i]))?);
            }
            TransformAction::StandardScaler { mean, scale, fill } => {
                let x = numeric(column, cell, fill.as_ref().map(|f| f[i]))?;
                out.push((x - mean[i]) / scale[i]);
            }
            TransformAction::OneHot {
                categories,
                handle_unknown,
            } => {
                let known = &categories[i];
                let start = out.len();
                out.resize(start + known.len(), 0.0);
                let value = match cell {
                    Cell::Missing => continue,
                    Cell::Text(s) => s.clone(),
                    Cell::Number(v) => category_label(*v),
                };
                match known.iter().position(|c| *c == value) {
                    Some(hit) => out[start + hit] = 1.0,
                    None if *handle_unknown == HandleUnknown::Error => {
                        return Err(ModelError::UnknownCategory {
                            column: column.clone(),
                            value,
                        });
                    }
                    None => {}
                }
            }
        }
    }
    Ok(())
}

fn numeric(column: &str, cell: &Cell, fill: Option<f64>) -> Result<f64, ModelError> {
    if let Some(v) = cell.as_number() {
        return Ok(v);
    }
    match cell {
        Cell::Text(s) => Err(ModelError::NonNumeric {
            column: column.to_string(),
            value: s.clone(),
        }),
        _ => fill.ok_or_else(|| ModelError::MissingValue {
            column: column.to_string(),
        }),
    }
}

/// Numeric cells matched against string categories: `2.0` matches `"2"`.
fn category_label(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

fn sigmoid(eta: f64) -> f64 {
    let eta = eta.clamp(-700.0, 700.0);
    1.0 / (1.0 + (-eta).exp())
}

impl Introspect for PipelineArtifact {
    fn stored_feature_names(&self) -> Option<Vec<String>> {
        self.feature_names_in.clone()
    }

    fn steps(&self) -> Vec<&dyn StepIntrospect> {
        self.steps.iter().map(|s| s as &dyn StepIntrospect).collect()
    }
}

impl StepIntrospect for PipelineStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn column_selectors(&self) -> Option<Vec<ColumnSelector>> {
        match &self.kind {
            StepKind::ColumnTransformer { transformers } => Some(
                transformers
                    .iter()
                    .map(|t| ColumnSelector {
                        name: t.name.clone(),
                        columns: t.columns.clone(),
                        drop: matches!(t.action, TransformAction::Drop),
                    })
                    .collect(),
            ),
            StepKind::LinearModel(_) => None,
        }
    }

    fn stored_feature_names(&self) -> Option<Vec<String>> {
        self.feature_names_in.clone()
    }
}

impl Artifact for PipelineArtifact {
    fn kind(&self) -> &'static str {
        "pipeline"
    }

    fn introspect(&self) -> &dyn Introspect {
        self
    }

    fn supports_proba(&self) -> bool {
        self.estimator().link == LinkFunction::Logit
    }

    fn predict_proba(&self, row: &AlignedRow) -> Result<f64, ModelError> {
        match self.estimator().link {
            LinkFunction::Logit => Ok(sigmoid(self.linear_predictor(row)?)),
            LinkFunction::Identity => Err(ModelError::Runtime(
                "estimator with identity link has no predict_proba".to_string(),
            )),
        }
    }

    fn predict(&self, row: &AlignedRow) -> Result<f64, ModelError> {
        let eta = self.linear_predictor(row)?;
        Ok(match self.estimator().link {
            LinkFunction::Logit => {
                if sigmoid(eta) >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            LinkFunction::Identity => eta,
        })
    }
}
