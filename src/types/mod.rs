//! Type definitions for the credit risk service

pub mod api;
pub mod feature;
pub mod risk;

pub use api::{ErrorResponse, HealthResponse, MetaResponse, PredictRequest, PredictResponse};
pub use feature::{AlignedRow, Cell, FeatureMap, FeatureValue};
pub use risk::{credit_score, RiskCategory, RiskThresholds};
