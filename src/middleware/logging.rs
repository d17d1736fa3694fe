//! Structured request logging. Health probes arrive every few seconds from
//! load balancers, so they log at debug instead of info to keep the output
//! readable; everything else gets a start line and a completion line with
//! timing.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    time::{Duration, Instant},
};
use tracing::{debug, error, info, warn};

/// Requests slower than this get a warning line; streaming endpoints are
/// exempt because their response lasts the whole session.
const SLOW_REQUEST_THRESHOLD: Duration = Duration::from_secs(1);

pub struct RequestLogging;

impl<S, B> Transform<S, ServiceRequest> for RequestLogging
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggingMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggingMiddleware { service }))
    }
}

pub struct RequestLoggingMiddleware<S> {
    service: S,
}

fn is_probe(path: &str) -> bool {
    path == "/healthcheck" || path == "/health"
}

fn is_streaming(path: &str) -> bool {
    path.starts_with("/ws/")
}

impl<S, B> Service<ServiceRequest> for RequestLoggingMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let uri = req.uri().to_string();
        let remote_addr = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        if is_probe(&path) {
            debug!(method = %method, uri = %uri, "Probe request");
        } else {
            info!(
                method = %method,
                uri = %uri,
                remote_addr = %remote_addr,
                "Request started"
            );
        }

        let fut = self.service.call(req);

        Box::pin(async move {
            let result = fut.await;
            let duration = start_time.elapsed();

            match &result {
                Ok(response) => {
                    let status = response.status();
                    if is_probe(&path) {
                        debug!(
                            method = %method,
                            uri = %uri,
                            status = %status.as_u16(),
                            "Probe completed"
                        );
                    } else {
                        info!(
                            method = %method,
                            uri = %uri,
                            remote_addr = %remote_addr,
                            status = %status.as_u16(),
                            duration_ms = %duration.as_millis(),
                            "Request completed"
                        );
                        if duration > SLOW_REQUEST_THRESHOLD && !is_streaming(&path) {
                            warn!(
                                method = %method,
                                uri = %uri,
                                duration_ms = %duration.as_millis(),
                                "Slow request"
                            );
                        }
                    }
                }
                Err(err) => {
                    error!(
                        method = %method,
                        uri = %uri,
                        remote_addr = %remote_addr,
                        duration_ms = %duration.as_millis(),
                        error = %err,
                        "Request failed"
                    );
                }
            }

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_paths_are_recognized() {
        assert!(is_probe("/healthcheck"));
        assert!(is_probe("/health"));
        assert!(!is_probe("/api/translate"));
    }

    #[test]
    fn streaming_paths_skip_slow_warnings() {
        assert!(is_streaming("/ws/transcribe"));
        assert!(!is_streaming("/api/tts"));
    }
}
