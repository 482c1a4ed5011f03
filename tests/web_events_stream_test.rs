#[tokio::test]
async fn events_stream_emits_snapshot_after_refresh() {
    use axum::body::Body;
    use axum::http::Request;
    use chrono::TimeZone;
    use comed_dashboard::config::Config;
    use comed_dashboard::dashboard::DashboardRefresher;
    use comed_dashboard::error::FetchError;
    use comed_dashboard::pricing::{FetchedFeed, PricePoint, PriceSeries, PriceSource};
    use comed_dashboard::web::{AppState, build_router};
    use http_body_util::BodyExt as _;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    struct OnePoint;

    #[async_trait::async_trait]
    impl PriceSource for OnePoint {
        async fn fetch_latest(
            &self,
            now: chrono::DateTime<chrono_tz::Tz>,
        ) -> Result<FetchedFeed, FetchError> {
            Ok(FetchedFeed {
                series: PriceSeries::from_points(vec![PricePoint::new(now, 3.3)]),
                total_records: 1,
                source_url: "http://feed.test/api".to_string(),
            })
        }
    }

    let config = Config::default();
    let (mut refresher, handle) = DashboardRefresher::new(&config, Arc::new(OnePoint)).unwrap();
    let state = AppState {
        dashboard: handle,
        config: Arc::new(config),
    };

    let response = build_router(state)
        .oneshot(
            Request::builder()
                .uri("/api/events")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let ct = response
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");
    assert!(ct.contains("text/event-stream"));

    // Publish a snapshot once the stream is open
    let now = chrono_tz::America::Chicago
        .with_ymd_and_hms(2025, 7, 1, 12, 0, 0)
        .unwrap();
    refresher.refresh_at(now).await;

    let mut body = response.into_body();
    let mut buf: Vec<u8> = Vec::new();
    let needle = b"\"refresh_id\":1";
    let wait = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(frame) = body.frame().await {
            let Ok(frame) = frame else { break };
            if let Some(data) = frame.data_ref() {
                buf.extend_from_slice(data);
                if buf.windows(needle.len()).any(|w| w == needle) {
                    break;
                }
            }
        }
    })
    .await;

    assert!(wait.is_ok(), "timed out waiting for snapshot event");
    let s = String::from_utf8_lossy(&buf);
    assert!(s.contains("event: snapshot"), "missing named event: {}", s);
    assert!(s.contains("\"refresh_id\":1"), "missing snapshot payload: {}", s);
    assert!(s.contains("3.3"), "missing price: {}", s);
}
