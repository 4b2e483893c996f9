//! HTTP surface for the maintenance pipeline.
//!
//! `GET /predict` (also mounted at `/maintenance/predict`) renders the
//! pipeline outcome. Error bodies are `{"detail": ...}` with a fixed,
//! generic message per status; specifics go to the log.

use std::convert::Infallible;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::common::error::{ErrorCode, MaintError};
use crate::inference::service::MaintenanceService;

pub type SharedService = Arc<MaintenanceService>;

pub const DETAIL_NOT_FOUND: &str = "Equipment data not found";
pub const DETAIL_INVALID: &str = "equipment_id is required";
pub const DETAIL_UNAVAILABLE: &str = "Equipment data temporarily unavailable";
pub const DETAIL_FAILED: &str = "Error processing maintenance prediction request.";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PredictQuery {
    pub equipment_id: Option<String>,
    pub alert_recipient: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WelcomeBody {
    pub message: String,
}

/// Build the complete route tree, including rejection recovery.
pub fn routes(
    service: SharedService,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let root = warp::get().and(warp::path::end()).map(|| {
        warp::reply::json(&WelcomeBody {
            message: "Welcome to the maintenance prediction API".to_string(),
        })
    });

    let predict = warp::get()
        .and(
            warp::path!("predict")
                .or(warp::path!("maintenance" / "predict"))
                .unify(),
        )
        .and(warp::query::<PredictQuery>())
        .and(with_service(service))
        .and_then(handle_predict);

    root.or(predict).recover(handle_rejection)
}

fn with_service(
    service: SharedService,
) -> impl Filter<Extract = (SharedService,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

async fn handle_predict(
    query: PredictQuery,
    service: SharedService,
) -> Result<warp::reply::Response, Infallible> {
    let equipment_id = query.equipment_id.unwrap_or_default();
    let recipient = query.alert_recipient;

    // Run on its own task so a panic in the pipeline still yields a 500 body.
    let outcome = tokio::spawn(async move {
        service
            .predict(&equipment_id, recipient.as_deref())
            .await
    })
    .await;

    let reply = match outcome {
        Ok(Ok(body)) => {
            warp::reply::with_status(warp::reply::json(&body), StatusCode::OK).into_response()
        }
        Ok(Err(err)) => maint_error_response(&err),
        Err(join_err) => {
            error!(ev = "predict_panicked", code = ErrorCode::Internal as u32, error = %join_err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, DETAIL_FAILED)
        }
    };
    Ok(reply)
}

fn error_response(status: StatusCode, detail: &str) -> warp::reply::Response {
    let body = ErrorBody {
        detail: detail.to_string(),
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

/// Map a pipeline error to its status and public message.
pub fn status_for(err: &MaintError) -> (StatusCode, &'static str) {
    match err.code {
        ErrorCode::NotFound => (StatusCode::NOT_FOUND, DETAIL_NOT_FOUND),
        ErrorCode::InvalidInput => (StatusCode::BAD_REQUEST, DETAIL_INVALID),
        ErrorCode::TransientIo => (StatusCode::SERVICE_UNAVAILABLE, DETAIL_UNAVAILABLE),
        ErrorCode::ModelError | ErrorCode::Internal => {
            (StatusCode::INTERNAL_SERVER_ERROR, DETAIL_FAILED)
        }
    }
}

fn maint_error_response(err: &MaintError) -> warp::reply::Response {
    let (status, detail) = status_for(err);
    error_response(status, detail)
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, detail) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found")
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query parameters")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    } else {
        error!(ev = "unhandled_rejection", code = ErrorCode::Internal as u32, rejection = ?err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "An unexpected error occurred. Please try again later.",
        )
    };
    Ok(error_response(status, detail))
}
