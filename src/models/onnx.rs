//! ONNX Runtime backed artifact (cargo feature `onnx`)

use crate::error::ModelError;
use crate::models::artifact::{Artifact, Introspect};
use crate::types::feature::{AlignedRow, Cell};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Custom metadata key holding the training-time column names.
const FEATURE_NAMES_KEY: &str = "feature_names";

/// Single-input float tensor model.
pub struct OnnxArtifact {
    /// Running a session needs `&mut`, requests share the artifact
    session: Mutex<Session>,
    input_name: String,
    /// Output carrying class probabilities, if the model has one
    proba_output: Option<String>,
    /// Output carrying a plain prediction (label or regression value)
    value_output: Option<String>,
    feature_names: Option<Vec<String>>,
}

impl OnnxArtifact {
    pub fn load<P: AsRef<Path>>(path: P, threads: usize) -> Result<Self, ModelError> {
        let path = path.as_ref();

        ort::init().commit().map_err(runtime)?;
        let session = Session::builder()
            .map_err(runtime)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(runtime)?
            .with_intra_threads(threads)
            .map_err(runtime)?
            .commit_from_file(path)
            .map_err(runtime)?;

        if session.inputs.len() != 1 {
            return Err(ModelError::InvalidArtifact(format!(
                "expected a single input tensor, found {}",
                session.inputs.len()
            )));
        }
        let input_name = session.inputs[0].name.clone();

        let proba_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .map(|o| o.name.clone());
        let value_output = session
            .outputs
            .iter()
            .find(|o| !o.name.contains("prob"))
            .map(|o| o.name.clone());

        let feature_names = session
            .metadata()
            .map_err(runtime)?
            .custom(FEATURE_NAMES_KEY)
            .map_err(runtime)?
            .map(|raw| parse_feature_names(&raw));

        info!(
            path = %path.display(),
            input = %input_name,
            proba_output = ?proba_output,
            value_output = ?value_output,
            "ONNX model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            proba_output,
            value_output,
            feature_names,
        })
    }

    fn run<T>(
        &self,
        row: &AlignedRow,
        extract: impl FnOnce(&SessionOutputs) -> Result<T, ModelError>,
    ) -> Result<T, ModelError> {
        let features = row
            .columns()
            .iter()
            .zip(row.cells())
            .map(|(column, cell)| match cell {
                Cell::Number(v) => Ok(*v as f32),
                Cell::Missing => Ok(f32::NAN),
                Cell::Text(s) => Err(ModelError::NonNumeric {
                    column: column.clone(),
                    value: s.clone(),
                }),
            })
            .collect::<Result<Vec<f32>, _>>()?;

        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features)).map_err(runtime)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| ModelError::Runtime(format!("Lock error: {e}")))?;
        let outputs = session
            .run(ort::inputs![&self.input_name => input_tensor])
            .map_err(runtime)?;
        extract(&outputs)
    }
}

fn runtime<E: std::fmt::Display>(e: E) -> ModelError {
    ModelError::Runtime(e.to_string())
}

/// Accepts a JSON array of names or a comma-separated list.
fn parse_feature_names(raw: &str) -> Vec<String> {
    if let Ok(names) = serde_json::from_str::<Vec<String>>(raw) {
        return names;
    }
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Positive-class probability from a tensor or a `seq(map(int64, float))` output.
fn extract_positive_class(output: &ort::value::DynValue) -> Result<f64, ModelError> {
    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        let dims: Vec<i64> = shape.iter().copied().collect();
        return positive_class_from_tensor(&dims, data);
    }

    if DynSequenceValueType::can_downcast(&output.dtype()) {
        let allocator = Allocator::default();
        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(runtime)?;
        let maps = sequence
            .try_extract_sequence::<DynMapValueType>(&allocator)
            .map_err(runtime)?;
        let first = maps
            .first()
            .ok_or_else(|| ModelError::Runtime("empty probability sequence".to_string()))?;
        let pairs = first.try_extract_key_values::<i64, f32>().map_err(runtime)?;

        if let Some(p) = positive_class_from_pairs(&pairs) {
            return Ok(p);
        }
    }

    Err(ModelError::Runtime(
        "could not extract a probability from the model output".to_string(),
    ))
}

/// `[.., 2+]` shaped output is `[p0, p1, ..]`, a single value is `p1` itself.
fn positive_class_from_tensor(dims: &[i64], data: &[f32]) -> Result<f64, ModelError> {
    let classes = dims.last().copied().unwrap_or(0);
    match (classes, data) {
        (n, [_, p1, ..]) if n >= 2 => Ok(*p1 as f64),
        (_, [p]) => Ok(*p as f64),
        _ => Err(ModelError::Runtime(format!(
            "unexpected probability tensor shape {dims:?}"
        ))),
    }
}

/// Class 1 from a class to probability map, or the complement of class 0.
fn positive_class_from_pairs(pairs: &[(i64, f32)]) -> Option<f64> {
    if let Some((_, p)) = pairs.iter().find(|(class, _)| *class == 1) {
        return Some(*p as f64);
    }
    pairs
        .iter()
        .find(|(class, _)| *class == 0)
        .map(|(_, p)| 1.0 - *p as f64)
}

fn extract_value(output: &ort::value::DynValue) -> Result<f64, ModelError> {
    if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
        if let Some(v) = data.first() {
            return Ok(*v as f64);
        }
    }
    if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
        if let Some(v) = data.first() {
            return Ok(*v as f64);
        }
    }
    Err(ModelError::Runtime(
        "could not extract a prediction from the model output".to_string(),
    ))
}

impl Introspect for OnnxArtifact {
    fn stored_feature_names(&self) -> Option<Vec<String>> {
        self.feature_names.clone()
    }
}

impl Artifact for OnnxArtifact {
    fn kind(&self) -> &'static str {
        "onnx"
    }

    fn introspect(&self) -> &dyn Introspect {
        self
    }

    fn supports_proba(&self) -> bool {
        self.proba_output.is_some()
    }

    fn predict_proba(&self, row: &AlignedRow) -> Result<f64, ModelError> {
        let name = self
            .proba_output
            .as_deref()
            .ok_or_else(|| ModelError::Runtime("model has no probability output".to_string()))?;
        self.run(row, |outputs| {
            let output = outputs
                .get(name)
                .ok_or_else(|| ModelError::Runtime(format!("missing output '{name}'")))?;
            let p = extract_positive_class(output)?;
            debug!(output = %name, prob = p, "Extracted probability");
            Ok(p)
        })
    }

    fn predict(&self, row: &AlignedRow) -> Result<f64, ModelError> {
        let name = self
            .value_output
            .as_deref()
            .ok_or_else(|| ModelError::Runtime("model has no prediction output".to_string()))?;
        self.run(row, |outputs| {
            let output = outputs
                .get(name)
                .ok_or_else(|| ModelError::Runtime(format!("missing output '{name}'")))?;
            extract_value(output)
        })
    }
}
