//! HTTP endpoint for exchange rates
//!
//! Exposes `GET /api/exchange-rates[?base=XXX]`. A resolved sheet is returned
//! as JSON with status 200; any resolution failure becomes a 500 whose body
//! is `Error: <message>`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::service::ExchangeRateService;

/// Route served by [`router`]
pub const EXCHANGE_RATES_PATH: &str = "/api/exchange-rates";

/// Query parameters of the exchange-rates route
#[derive(Debug, Deserialize)]
pub struct RatesQuery {
    pub base: Option<String>,
}

/// Builds the router around a shared service
pub fn router(service: Arc<ExchangeRateService>) -> Router {
    Router::new()
        .route(EXCHANGE_RATES_PATH, get(get_exchange_rates))
        .with_state(service)
}

async fn get_exchange_rates(
    State(service): State<Arc<ExchangeRateService>>,
    Query(query): Query<RatesQuery>,
) -> Response {
    match service.get_exchange_rates(query.base.as_deref()).await {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Exchange rate request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error: {}", err),
            )
                .into_response()
        }
    }
}

/// Binds `listen` and serves until the process is stopped
pub async fn serve(listen: &str, service: Arc<ExchangeRateService>) -> std::io::Result<()> {
    let listener = TcpListener::bind(listen).await?;
    info!("Exchange rate endpoint listening on {}", listener.local_addr()?);

    axum::serve(listener, router(service)).await
}
