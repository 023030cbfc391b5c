//! Credit Risk API Library
//!
//! Serves a pre-trained probability-of-default model over HTTP and derives a
//! bounded credit score from the predicted probability.

pub mod config;
pub mod error;
pub mod feature_aligner;
pub mod metrics;
pub mod models;
pub mod prediction;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use error::{ModelError, PredictionError};
pub use models::handle::ModelHandle;
pub use prediction::{PredictionResult, PredictionService};
pub use types::{feature::FeatureMap, risk::credit_score};
