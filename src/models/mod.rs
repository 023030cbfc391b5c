//! Model artifacts and the shared model handle

pub mod artifact;
pub mod handle;
pub mod loader;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod pipeline;
pub mod schema;

pub use artifact::{Artifact, Introspect, StepIntrospect};
pub use handle::ModelHandle;
pub use loader::ModelLoader;
pub use pipeline::PipelineArtifact;
