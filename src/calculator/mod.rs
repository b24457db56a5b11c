//! Service C: stateless calculator. A leaf: it calls nothing.

use axum::extract::Path;
use axum::extract::rejection::PathRejection;
use axum::routing::get;
use axum::{Json, Router};
use rand::Rng;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::models::CalculationResult;
use crate::server::healthz;

/// Upper bound (exclusive) of the random number attached to each result.
const RANDOM_CEILING: u32 = 1000;

pub fn router() -> Router {
    Router::new()
        .route("/api/calculator/add/{number1}/{number2}", get(add))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
}

/// Sum two 32-bit integers. Widened to 64 bits so the sum cannot overflow.
///
/// # Errors
///
/// Fails only if `now` cannot be rendered as RFC 3339.
pub fn calculate(number1: i32, number2: i32, now: OffsetDateTime) -> Result<CalculationResult, time::error::Format> {
    Ok(CalculationResult {
        number1,
        number2,
        sum: i64::from(number1) + i64::from(number2),
        random_number: rand::rng().random_range(1..RANDOM_CEILING),
        timestamp: now.format(&Rfc3339)?,
    })
}

/// `GET /api/calculator/add/:number1/:number2`.
async fn add(path: Result<Path<(i32, i32)>, PathRejection>) -> Result<Json<CalculationResult>, ApiError> {
    let Path((number1, number2)) = path?;
    calculate(number1, number2, OffsetDateTime::now_utc())
        .map(Json)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};

    use super::*;
    use crate::state::test_helpers::send;

    #[test]
    fn sum_does_not_overflow() {
        let result = calculate(i32::MAX, i32::MAX, OffsetDateTime::UNIX_EPOCH).unwrap();
        assert_eq!(result.sum, 2 * i64::from(i32::MAX));
        let result = calculate(i32::MIN, -1, OffsetDateTime::UNIX_EPOCH).unwrap();
        assert_eq!(result.sum, i64::from(i32::MIN) - 1);
    }

    #[test]
    fn random_number_stays_in_range() {
        for _ in 0..500 {
            let n = calculate(1, 2, OffsetDateTime::UNIX_EPOCH).unwrap().random_number;
            assert!((1..RANDOM_CEILING).contains(&n), "{n}");
        }
    }

    #[test]
    fn timestamp_is_rfc3339() {
        let result = calculate(1, 2, OffsetDateTime::UNIX_EPOCH).unwrap();
        assert_eq!(result.timestamp, "1970-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn add_endpoint_returns_result() {
        let (status, body) = send(router(), Method::GET, "/api/calculator/add/2/-5", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["number1"], 2);
        assert_eq!(body["number2"], -5);
        assert_eq!(body["sum"], -3);
        assert!(body["randomNumber"].is_u64());
        assert!(OffsetDateTime::parse(body["timestamp"].as_str().unwrap(), &Rfc3339).is_ok());
    }

    #[tokio::test]
    async fn malformed_numbers_are_400() {
        for uri in ["/api/calculator/add/one/2", "/api/calculator/add/1/99999999999"] {
            let (status, body) = send(router(), Method::GET, uri, None, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn unknown_operation_is_404() {
        let (status, _) = send(router(), Method::GET, "/api/calculator/mul/1/2", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
