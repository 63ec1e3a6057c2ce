//! HTTP surface for the rate service.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::core::quote::QuoteRecord;
use crate::service::{RateError, RateService, RateSnapshot};

pub const CURRENCY_PAIR: &str = "USD/RUB";

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub usd_rate: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CurrentRateResponse {
    pub current_rate: f64,
    pub currency_pair: &'static str,
    pub timestamp: DateTime<Utc>,
    pub last_10_requests: Vec<HistoryEntry>,
    pub source_api: String,
}

fn as_float(rate: Decimal) -> f64 {
    rate.to_f64().unwrap_or_default()
}

impl From<QuoteRecord> for HistoryEntry {
    fn from(record: QuoteRecord) -> Self {
        HistoryEntry {
            usd_rate: as_float(record.rate),
            timestamp: record.captured_at,
        }
    }
}

impl From<RateSnapshot> for CurrentRateResponse {
    fn from(snapshot: RateSnapshot) -> Self {
        CurrentRateResponse {
            current_rate: as_float(snapshot.rate),
            currency_pair: CURRENCY_PAIR,
            timestamp: snapshot.captured_at,
            last_10_requests: snapshot.history.into_iter().map(Into::into).collect(),
            source_api: snapshot.source,
        }
    }
}

impl RateError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RateError::Throttled { .. } => StatusCode::TOO_MANY_REQUESTS,
            RateError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            RateError::UpstreamUnavailable(_) | RateError::RateUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            RateError::Persistence(_) | RateError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RateError {
    fn into_response(self) -> Response {
        let body = match &self {
            RateError::Throttled { remaining_secs } => serde_json::json!({
                "error": self.to_string(),
                "remaining_time": remaining_secs,
            }),
            _ => serde_json::json!({ "error": self.to_string() }),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// GET /get-current-usd/ - Current rate plus the latest stored quotes
async fn get_current_usd(
    State(service): State<Arc<RateService>>,
) -> Result<Json<CurrentRateResponse>, RateError> {
    let snapshot = service.get_current_rate(Utc::now()).await?;
    Ok(Json(snapshot.into()))
}

pub fn router(service: Arc<RateService>) -> Router {
    Router::new()
        .route("/get-current-usd/", get(get_current_usd))
        .route("/get-current-usd", get(get_current_usd))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Serves requests on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    service: Arc<RateService>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Rate server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Rate server stopped");
    Ok(())
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
