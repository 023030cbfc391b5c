//! Model artifact loader

use crate::error::ModelError;
use crate::models::artifact::Artifact;
use crate::models::pipeline::PipelineArtifact;
use std::path::Path;
use tracing::info;

/// Loader for model artifacts, dispatching on the file extension
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    #[cfg_attr(not(feature = "onnx"), allow(dead_code))]
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of ONNX threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self { onnx_threads }
    }

    /// Load a single artifact from file
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Box<dyn Artifact>, ModelError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        info!(path = %path.display(), format = %extension, "Loading model artifact");

        let artifact: Box<dyn Artifact> = match extension.as_str() {
            "json" => Box::new(PipelineArtifact::load(path)?),
            #[cfg(feature = "onnx")]
            "onnx" => Box::new(crate::models::onnx::OnnxArtifact::load(
                path,
                self.onnx_threads,
            )?),
            other => return Err(ModelError::UnsupportedFormat(other.to_string())),
        };

        info!(
            kind = artifact.kind(),
            predict_proba = artifact.supports_proba(),
            "Model artifact loaded"
        );
        Ok(artifact)
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_io_error() {
        let loader = ModelLoader::new();
        let result = loader.load("does/not/exist.json");
        assert!(matches!(result, Err(ModelError::Io(_))));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let loader = ModelLoader::new();
        let result = loader.load("model.pkl");
        assert!(matches!(result, Err(ModelError::UnsupportedFormat(ext)) if ext == "pkl"));
    }

    #[test]
    fn test_corrupt_artifact_rejected() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(b"{\"steps\": [").unwrap();

        let result = ModelLoader::new().load(file.path());
        assert!(matches!(result, Err(ModelError::Parse(_))));
    }
}
