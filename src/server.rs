//! HTTP routes: `/health`, `/meta` and `/predict`

use crate::error::PredictionError;
use crate::prediction::PredictionService;
use crate::types::api::{HealthResponse, MetaResponse, PredictRequest, PredictResponse};
use actix_cors::Cors;
use actix_web::error::JsonPayloadError;
use actix_web::{web, HttpRequest, HttpResponse};
use tracing::debug;

/// Register the routes and the JSON body error handler.
///
/// Handlers expect a `web::Data<PredictionService>` in the app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .route("/health", web::get().to(health))
        .route("/meta", web::get().to(meta))
        .route("/predict", web::post().to(predict));
}

/// CORS policy for the configured origins, `*` allows any origin.
///
/// Credentials are always allowed; with `*` the caller's origin is echoed back
/// instead of a literal wildcard.
pub fn build_cors(origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .supports_credentials()
        .max_age(3600);

    if origins.iter().any(|o| o == "*") {
        return cors.allow_any_origin();
    }
    origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!(error = %err, "Rejected request body");
    PredictionError::InvalidRequest(err.to_string()).into()
}

async fn health(service: web::Data<PredictionService>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        model_loaded: true,
        model_file: service.model().model_file().to_string(),
    })
}

async fn meta(service: web::Data<PredictionService>) -> HttpResponse {
    let model = service.model();
    HttpResponse::Ok().json(MetaResponse {
        model_file: model.model_file().to_string(),
        expected_features: model.expected_features().map(<[String]>::to_vec),
    })
}

async fn predict(
    service: web::Data<PredictionService>,
    request: web::Json<PredictRequest>,
) -> Result<HttpResponse, PredictionError> {
    let result = service.predict(&request.features)?;

    Ok(HttpResponse::Ok().json(PredictResponse {
        probability_of_default: result.probability_of_default,
        credit_score: result.credit_score,
        used_feature_names: result.used_feature_names,
    }))
}
