//! Axum-based HTTP server for the dashboard UI and JSON API

use crate::config::{Config, ReferenceLine};
use crate::dashboard::{DashboardHandle, DashboardSnapshot, WeekSection};
use crate::pricing::{AggregateBucket, PricePoint, PriceStats};
use axum::response::Redirect;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, get_service, post},
};
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tower_http::services::ServeDir;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[cfg(feature = "openapi")]
use utoipa::OpenApi;
#[cfg(feature = "openapi")]
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
pub struct AppState {
    pub dashboard: DashboardHandle,
    pub config: Arc<Config>,
}

fn latest_or_unavailable(state: &AppState) -> Result<Arc<DashboardSnapshot>, Response> {
    state.dashboard.latest().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"error": "pricing data not loaded yet"})),
        )
            .into_response()
    })
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/health", responses(
    (status = 200, description = "Service is healthy")
)))]
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/version", responses((status = 200))))]
pub async fn version() -> impl IntoResponse {
    Json(serde_json::json!({ "version": env!("APP_VERSION") }))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/dashboard", responses(
    (status = 200, description = "Latest dashboard snapshot"),
    (status = 503, description = "First refresh has not completed")
)))]
pub async fn get_dashboard(State(state): State<AppState>) -> Response {
    match latest_or_unavailable(&state) {
        Ok(snap) => Json(&*snap).into_response(),
        Err(resp) => resp,
    }
}

#[derive(Serialize)]
struct RecentView<'a> {
    points: &'a [PricePoint],
    stats: Option<PriceStats>,
    reference_line: ReferenceLine,
    error: Option<&'a str>,
}

#[derive(Serialize)]
struct HourlyView<'a> {
    buckets: &'a [AggregateBucket],
    error: Option<&'a str>,
}

#[derive(Serialize)]
struct WeeklyView<'a> {
    weeks: &'a [WeekSection],
    weekly_averages: &'a [AggregateBucket],
    error: Option<&'a str>,
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/prices/recent", responses((status = 200), (status = 503))))]
pub async fn prices_recent(State(state): State<AppState>) -> Response {
    match latest_or_unavailable(&state) {
        Ok(snap) => Json(RecentView {
            points: &snap.recent.points,
            stats: snap.recent.stats,
            reference_line: snap.reference_line,
            error: snap.error.as_deref(),
        })
        .into_response(),
        Err(resp) => resp,
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/prices/hourly", responses((status = 200), (status = 503))))]
pub async fn prices_hourly(State(state): State<AppState>) -> Response {
    match latest_or_unavailable(&state) {
        Ok(snap) => Json(HourlyView {
            buckets: &snap.hourly,
            error: snap.error.as_deref(),
        })
        .into_response(),
        Err(resp) => resp,
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/prices/weekly", responses((status = 200), (status = 503))))]
pub async fn prices_weekly(State(state): State<AppState>) -> Response {
    match latest_or_unavailable(&state) {
        Ok(snap) => Json(WeeklyView {
            weeks: &snap.weeks,
            weekly_averages: &snap.weekly_averages,
            error: snap.error.as_deref(),
        })
        .into_response(),
        Err(resp) => resp,
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/api/refresh", responses(
    (status = 202, description = "Refresh queued"),
    (status = 503, description = "Refresher is not running")
)))]
pub async fn refresh(State(state): State<AppState>) -> impl IntoResponse {
    match state.dashboard.request_refresh() {
        Ok(()) => (StatusCode::ACCEPTED, Json(serde_json::json!({"ok":true}))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"error": e.to_string()})),
        ),
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/events", responses((status = 200))))]
pub async fn events(State(state): State<AppState>) -> impl IntoResponse {
    let stream = WatchStream::new(state.dashboard.subscribe()).filter_map(|snap| {
        let snap = snap?;
        let payload = serde_json::to_string(&*snap).ok()?;
        Some(Ok::<Event, std::convert::Infallible>(
            Event::default().event("snapshot").data(payload),
        ))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/config", responses((status = 200))))]
pub async fn get_config(State(state): State<AppState>) -> Response {
    Json(&*state.config).into_response()
}

#[cfg(feature = "openapi")]
#[utoipa::path(get, path = "/api/config/schema", responses((status = 200)))]
pub async fn get_config_schema() -> impl IntoResponse {
    Json(schemars::schema_for!(crate::config::Config))
}

#[cfg(feature = "openapi")]
#[derive(OpenApi)]
#[openapi(
    paths(
        health, version, get_dashboard,
        prices_recent, prices_hourly, prices_weekly,
        refresh, events, get_config, get_config_schema,
    ),
    tags((name = "comed-dashboard", description = "ComEd pricing dashboard API"))
)]
pub struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let static_dir = state.config.web.static_dir.clone();

    let router = Router::new()
        .route("/", get(|| async { Redirect::to("/ui/index.html") }))
        .route("/api/health", get(health))
        .route("/api/version", get(version))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/prices/recent", get(prices_recent))
        .route("/api/prices/hourly", get(prices_hourly))
        .route("/api/prices/weekly", get(prices_weekly))
        .route("/api/refresh", post(refresh))
        .route("/api/events", get(events))
        .route("/api/config", get(get_config))
        .nest_service(
            "/ui",
            get_service(ServeDir::new(static_dir).append_index_html_on_directories(true))
                .handle_error(|_| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );

    #[cfg(feature = "openapi")]
    let router = router
        .route("/api/config/schema", get(get_config_schema))
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()));

    let router = router
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    // Event streams are left uncompressed by the default predicate
    #[cfg(feature = "compression")]
    let router = router.layer(tower_http::compression::CompressionLayer::new());

    router
}

/// Resolve the bind address, falling back to loopback for an unparseable host
pub fn bind_addr(host: &str, port: u16) -> (SocketAddr, bool) {
    match host.trim().parse::<IpAddr>() {
        Ok(ip) => (SocketAddr::new(ip, port), true),
        Err(_) => (([127, 0, 0, 1], port).into(), false),
    }
}

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let host = state.config.web.host.clone();
    let port = state.config.web.port;
    let router = build_router(state);

    let logger = crate::logging::get_logger("web");
    logger.info(&format!(
        "Starting web server; requested host={}, port={}",
        host, port
    ));

    let (addr, parsed_ok) = bind_addr(&host, port);
    if !parsed_ok {
        logger.warn(&format!("Invalid host '{}'; falling back to 127.0.0.1", host));
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!(
        "Web server listening at http://{}:{} (UI /ui, API /api)",
        local_addr.ip(),
        local_addr.port()
    ));

    axum::serve(listener, router).await?;
    Ok(())
}
