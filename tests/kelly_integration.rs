//! Kelly Service Integration Tests
//!
//! End-to-end checks through `KellyService` and the HTTP router:
//! 1. Leverage computation and degenerate inputs
//! 2. Request-level rejections before any quote fetch
//! 3. Partial failure inside one request
//!
//! All tests are deterministic (no real network calls) and use the static quote source.

use std::sync::Arc;
use std::time::Duration;

use approx::assert_relative_eq;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use kelly_leverage::adapters::http::{create_router, openapi_document, AppState, DEFAULT_TERMS};
use kelly_leverage::application::{KellyService, PipelineSettings};
use kelly_leverage::config::ServiceSection;
use kelly_leverage::domain::{FailureKind, RawRequest, RequestError, RiskFreeConvention};
use kelly_leverage::ports::{QuoteSourceError, StaticQuoteSource};

// ============================================================================
// Test Fixtures
// ============================================================================

const START: &str = "2018-01-01";
const END: &str = "2018-12-31";

fn service(source: &StaticQuoteSource) -> KellyService {
    KellyService::new(Arc::new(source.clone()), PipelineSettings::default(), 0.04)
}

fn router(source: &StaticQuoteSource) -> Router {
    let state = AppState::new(
        service(source),
        DEFAULT_TERMS.to_string(),
        openapi_document(&ServiceSection::default()),
    );
    create_router(Arc::new(state))
}

async fn post(app: Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/kelly_criterion")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ============================================================================
// Leverage computation
// ============================================================================

#[tokio::test]
async fn test_constant_returns_are_degenerate() {
    let source = StaticQuoteSource::new().with_prices("GROW", &[100.0, 110.0, 121.0]);

    let result = service(&source)
        .compute(&RawRequest::new(START, END, &["GROW"]).with_risk_free_rate(0.0))
        .await
        .unwrap();

    let failure = result.get("GROW").unwrap().failure().unwrap();
    assert_eq!(failure.kind, FailureKind::DegenerateVariance);
}

#[tokio::test]
async fn test_symmetric_returns_give_zero_leverage() {
    let source = StaticQuoteSource::new().with_prices("FLAT", &[100.0, 110.0, 99.0]);

    let result = service(&source)
        .compute(&RawRequest::new(START, END, &["FLAT"]).with_risk_free_rate(0.0))
        .await
        .unwrap();

    let leverage = result.get("FLAT").unwrap().leverage().unwrap();
    assert_relative_eq!(leverage, 0.0, epsilon = 1e-9);
}

#[tokio::test]
async fn test_risk_free_rate_is_subtracted() {
    // returns [0.10, -0.10]: m ~ 0, v = 0.01
    let source = StaticQuoteSource::new().with_prices("FLAT", &[100.0, 110.0, 99.0]);

    let result = service(&source)
        .compute(&RawRequest::new(START, END, &["FLAT"]).with_risk_free_rate(0.001))
        .await
        .unwrap();

    let leverage = result.get("FLAT").unwrap().leverage().unwrap();
    assert_relative_eq!(leverage, -0.1, epsilon = 1e-9);
}

#[tokio::test]
async fn test_annualized_rate_convention() {
    let source = StaticQuoteSource::new().with_prices("FLAT", &[100.0, 110.0, 99.0]);
    let settings = PipelineSettings {
        risk_free_convention: RiskFreeConvention::Annualized {
            periods_per_year: 252,
        },
        ..PipelineSettings::default()
    };
    let service = KellyService::new(Arc::new(source), settings, 0.0);

    let result = service
        .compute(&RawRequest::new(START, END, &["FLAT"]).with_risk_free_rate(0.252))
        .await
        .unwrap();

    // 0.252 / 252 = 0.001 per period
    let leverage = result.get("FLAT").unwrap().leverage().unwrap();
    assert_relative_eq!(leverage, -0.1, epsilon = 1e-9);
}

// ============================================================================
// Request-level rejections
// ============================================================================

#[tokio::test]
async fn test_same_day_range_rejected_before_fetch() {
    let source = StaticQuoteSource::new().with_prices("IBM", &[100.0, 101.0, 102.0]);

    let err = service(&source)
        .compute(&RawRequest::new("2018-01-01", "2018-01-01", &["IBM"]))
        .await
        .unwrap_err();

    assert!(matches!(err, RequestError::InvalidDateRange { .. }));
    assert_eq!(source.call_count(), 0);
}

#[tokio::test]
async fn test_empty_securities_rejected() {
    let source = StaticQuoteSource::new();

    let err = service(&source)
        .compute(&RawRequest::new(START, END, &[]))
        .await
        .unwrap_err();

    assert_eq!(err, RequestError::EmptySecurityList);
    assert_eq!(source.call_count(), 0);
}

#[tokio::test]
async fn test_rejections_over_http() {
    let source = StaticQuoteSource::new();

    let (status, body) = post(
        router(&source),
        serde_json::json!({"start_date": "2018-01-01", "end_date": "2018-01-01", "securities": ["IBM"]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid date range"));

    let (status, body) = post(
        router(&source),
        serde_json::json!({"start_date": START, "end_date": END, "securities": []}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Security list is empty");

    let (status, _) = post(
        router(&source),
        serde_json::json!({"start_date": "01/01/2018", "end_date": END, "securities": ["IBM"]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(source.call_count(), 0);
}

// ============================================================================
// Partial failure
// ============================================================================

#[tokio::test]
async fn test_one_failed_fetch_does_not_fail_request() {
    let source = StaticQuoteSource::new()
        .with_failure("BAD", QuoteSourceError::Transport("connection reset".into()))
        .with_prices("GOOD", &[100.0, 104.0, 104.0]);

    let result = service(&source)
        .compute(&RawRequest::new(START, END, &["BAD", "GOOD"]).with_risk_free_rate(0.0))
        .await
        .unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(
        result.get("BAD").unwrap().failure().unwrap().kind,
        FailureKind::DataUnavailable
    );
    assert_relative_eq!(result.get("GOOD").unwrap().leverage().unwrap(), 50.0, epsilon = 1e-6);
    assert_eq!(result.success_count(), 1);
}

#[tokio::test]
async fn test_http_response_keeps_request_order_with_nulls() {
    let source = StaticQuoteSource::new()
        .with_prices("MSFT", &[100.0, 104.0, 104.0])
        .with_failure("AAPL", QuoteSourceError::UnknownSymbol("AAPL".into()))
        .with_prices("IBM", &[100.0, 110.0, 99.0])
        .with_delay("MSFT", Duration::from_millis(50));

    let app = router(&source);
    let request = Request::builder()
        .method("POST")
        .uri("/v1/kelly_criterion")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            r#"{"start_date": "2018-1-1", "end_date": "2018-12-31", "securities": ["msft", "AAPL", "IBM", "MSFT"], "risk_free_rate": 0.0}"#,
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    // keys in first-occurrence order, duplicates collapsed
    let msft = text.find("\"MSFT\"").unwrap();
    let aapl = text.find("\"AAPL\"").unwrap();
    let ibm = text.find("\"IBM\"").unwrap();
    assert!(msft < aapl && aapl < ibm);
    assert_eq!(text.matches("\"MSFT\"").count(), 1);

    let body: Value = serde_json::from_str(&text).unwrap();
    assert_relative_eq!(body["MSFT"].as_f64().unwrap(), 50.0, epsilon = 1e-6);
    assert!(body["AAPL"].is_null());
    assert_relative_eq!(body["IBM"].as_f64().unwrap(), 0.0, epsilon = 1e-9);
}

#[tokio::test]
async fn test_slow_security_times_out_alone() {
    let source = StaticQuoteSource::new()
        .with_prices("SLOW", &[100.0, 101.0, 99.0])
        .with_delay("SLOW", Duration::from_secs(30))
        .with_prices("FAST", &[100.0, 104.0, 104.0]);
    let settings = PipelineSettings {
        request_timeout: Duration::from_millis(100),
        ..PipelineSettings::default()
    };
    let service = KellyService::new(Arc::new(source), settings, 0.0);

    let result = service
        .compute(&RawRequest::new(START, END, &["SLOW", "FAST"]))
        .await
        .unwrap();

    assert_eq!(
        result.get("SLOW").unwrap().failure().unwrap().kind,
        FailureKind::TimedOut
    );
    assert!(result.get("FAST").unwrap().is_success());
}
