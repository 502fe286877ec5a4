//! HTTP listeners
//!
//! Two hyper HTTP/1 servers: the public API and the Prometheus scrape
//! endpoint. Each accepts until its [`CancellationToken`] fires.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::responses::ErrorDetail;
use super::routes::{handle, internal_error, json, respond};
use crate::error::{Error, Result};
use crate::metrics::ServiceMetrics;
use crate::service::HoursService;

/// Bind a listener, reporting bad addresses as configuration errors.
pub async fn bind(addr: &str) -> Result<TcpListener> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Config(format!("Invalid listen address '{}': {}", addr, e)))?;
    Ok(TcpListener::bind(addr).await?)
}

// =============================================================================
// API Server
// =============================================================================

/// Serve the public API on `listener` until `shutdown` is cancelled.
pub async fn serve_api(
    listener: TcpListener,
    service: Arc<HoursService>,
    shutdown: CancellationToken,
) -> Result<()> {
    info!("API server listening on {}", listener.local_addr()?);

    loop {
        let stream = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => stream,
                Err(e) => {
                    warn!("API server accept error: {}", e);
                    continue;
                }
            },
        };

        let service = service.clone();
        tokio::spawn(async move {
            let handler = service_fn(move |req: Request<Incoming>| {
                let service = service.clone();
                async move {
                    Ok::<_, Infallible>(handle(&service, req.method(), req.uri()).await)
                }
            });
            if let Err(e) = serve_connection(stream, handler).await {
                debug!("API connection error: {}", e);
            }
        });
    }

    info!("API server stopped");
    Ok(())
}

// =============================================================================
// Metrics Server
// =============================================================================

/// Serve `GET /metrics` on `listener` until `shutdown` is cancelled.
pub async fn serve_metrics(
    listener: TcpListener,
    metrics: ServiceMetrics,
    shutdown: CancellationToken,
) -> Result<()> {
    info!("Metrics server listening on {}", listener.local_addr()?);

    loop {
        let stream = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => stream,
                Err(e) => {
                    warn!("Metrics server accept error: {}", e);
                    continue;
                }
            },
        };

        let metrics = metrics.clone();
        tokio::spawn(async move {
            let handler = service_fn(move |req: Request<Incoming>| {
                let response = metrics_response(&metrics, req.method(), req.uri().path());
                async move { Ok::<_, Infallible>(response) }
            });
            if let Err(e) = serve_connection(stream, handler).await {
                debug!("Metrics connection error: {}", e);
            }
        });
    }

    info!("Metrics server stopped");
    Ok(())
}

fn metrics_response(metrics: &ServiceMetrics, method: &Method, path: &str) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::GET, "/metrics") => match metrics.encode() {
            Ok((content_type, buffer)) => respond(StatusCode::OK, &content_type, Bytes::from(buffer)),
            Err(e) => {
                error!("Failed to encode metrics: {}", e);
                internal_error()
            }
        },
        _ => json(StatusCode::NOT_FOUND, &ErrorDetail::new("Not Found")),
    }
}

async fn serve_connection<S>(stream: TcpStream, handler: S) -> Result<()>
where
    S: hyper::service::Service<Request<Incoming>, Response = Response<Full<Bytes>>, Error = Infallible>,
    S::Future: Send + 'static,
{
    http1::Builder::new()
        .serve_connection(TokioIo::new(stream), handler)
        .await?;
    Ok(())
}
