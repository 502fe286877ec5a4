//! Request routing
//!
//! [`handle`] maps a method and URI onto the [`HoursService`] and renders the
//! JSON response. It never touches the connection, so it is tested directly.

use std::collections::HashMap;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW, CONTENT_TYPE,
};
use hyper::{Method, Response, StatusCode, Uri};
use serde::Serialize;
use tracing::{debug, error, instrument};

use super::responses::{
    ErrorDetail, HealthBody, ServiceInfo, TimeBody, TradingDayBody, UnavailableBody,
};
use crate::error::{Error, Result};
use crate::resolver::Unavailable;
use crate::service::{parse_date, HoursService};

const JSON: &str = "application/json";

/// Every path the API answers.
const ROUTES: &[&str] = &[
    "/",
    "/v1/hours",
    "/v1/hours/open",
    "/v1/hours/close",
    "/v1/health",
    "/v1/is-trading-day",
    "/v1/trading-days",
];

/// Route one request.
#[instrument(skip(service, method, uri), fields(method = %method, path = uri.path()))]
pub async fn handle(service: &HoursService, method: &Method, uri: &Uri) -> Response<Full<Bytes>> {
    let path = uri.path();

    if !ROUTES.contains(&path) {
        return json(StatusCode::NOT_FOUND, &ErrorDetail::new("Not Found"));
    }
    if method == Method::OPTIONS {
        return preflight();
    }
    if method != Method::GET {
        let mut response = json(
            StatusCode::METHOD_NOT_ALLOWED,
            &ErrorDetail::new("Method Not Allowed"),
        );
        response
            .headers_mut()
            .insert(ALLOW, HeaderValue::from_static("GET"));
        return response;
    }

    let response = match path {
        "/" => json(StatusCode::OK, &ServiceInfo::new(&service.config().exchange_name)),
        "/v1/hours" => match service.trading_hours().await {
            Ok(hours) => json(StatusCode::OK, &hours),
            Err(err) => unavailable(&err),
        },
        "/v1/hours/open" => time_response(service.open_time().await),
        "/v1/hours/close" => time_response(service.close_time().await),
        "/v1/health" => {
            let report = service.health().await;
            let config = service.config();
            let body = HealthBody::from_report(
                &report,
                &config.open_key,
                &config.close_key,
                config.resolver.ttl,
                config.timezone,
            );
            json(StatusCode::OK, &body)
        }
        "/v1/is-trading-day" => {
            let (date, is_trading_day) = service.is_trading_day_today();
            json(
                StatusCode::OK,
                &TradingDayBody {
                    date,
                    is_trading_day,
                },
            )
        }
        "/v1/trading-days" => match trading_days(service, uri.query()) {
            Ok(days) => json(StatusCode::OK, &days),
            Err(err) if err.is_client_error() => {
                json(StatusCode::BAD_REQUEST, &ErrorDetail::new(client_message(&err)))
            }
            Err(err) => {
                error!(error = %err, "Trading days query failed");
                internal_error()
            }
        },
        _ => json(StatusCode::NOT_FOUND, &ErrorDetail::new("Not Found")),
    };

    debug!(status = response.status().as_u16(), "Request handled");
    response
}

// =============================================================================
// Handlers
// =============================================================================

fn time_response(result: std::result::Result<String, Unavailable>) -> Response<Full<Bytes>> {
    match result {
        Ok(time) => json(StatusCode::OK, &TimeBody { time }),
        Err(err) => unavailable(&err),
    }
}

fn unavailable(err: &Unavailable) -> Response<Full<Bytes>> {
    json(StatusCode::SERVICE_UNAVAILABLE, &UnavailableBody::from(err))
}

fn trading_days(service: &HoursService, query: Option<&str>) -> Result<Vec<String>> {
    let params = parse_query(query.unwrap_or_default())?;

    let start = parse_date(required(&params, "start")?)?;
    let end = parse_date(required(&params, "end")?)?;
    let exclude = match params.get("exclude") {
        Some(raw) => parse_flag(raw)?,
        None => false,
    };

    let days = service.trading_days(start, end, exclude)?;
    Ok(days.iter().map(|day| day.format("%Y-%m-%d").to_string()).collect())
}

// =============================================================================
// Query parsing
// =============================================================================

/// Decode `a=1&b=2` into a map. Later duplicates win.
pub fn parse_query(query: &str) -> Result<HashMap<String, String>> {
    let mut params = HashMap::new();
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        let name = urlencoding::decode(name)
            .map_err(|e| Error::InvalidDate(format!("Malformed query parameter name: {}", e)))?;
        let value = urlencoding::decode(value)
            .map_err(|e| Error::InvalidDate(format!("Malformed value for '{}': {}", name, e)))?;
        params.insert(name.into_owned(), value.into_owned());
    }
    Ok(params)
}

fn required<'a>(params: &'a HashMap<String, String>, name: &str) -> Result<&'a str> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| Error::InvalidDate(format!("Missing required query parameter '{}'", name)))
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(Error::InvalidDate(format!(
            "Invalid boolean '{}' for 'exclude'. Use true or false",
            raw
        ))),
    }
}

fn client_message(err: &Error) -> String {
    match err {
        Error::InvalidDate(msg) | Error::InvalidRange(msg) => msg.clone(),
        other => other.to_string(),
    }
}

// =============================================================================
// Response building
// =============================================================================

/// Serialize `body` as JSON with the CORS header attached.
pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(bytes) => respond(status, JSON, Bytes::from(bytes)),
        Err(e) => {
            error!(error = %e, "Failed to serialize response body");
            internal_error()
        }
    }
}

/// Build a response with the CORS header attached.
pub fn respond(status: StatusCode, content_type: &str, body: Bytes) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type)
        .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            error!(error = %e, "Failed to build response");
            internal_error()
        })
}

fn preflight() -> Response<Full<Bytes>> {
    let mut response = respond(StatusCode::NO_CONTENT, JSON, Bytes::new());
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET, OPTIONS"));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    response
}

/// Plain 500 that cannot fail to build.
pub fn internal_error() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(
        b"{\"detail\":\"Internal Server Error\"}",
    )));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}
