//! HTTP metrics middleware.
//!
//! Wraps every route of an axum `Router` and records, per completed request:
//! - status code, method and matched route pattern
//! - custom labels read from request headers
//! - latency, request body size and response body size
//!
//! The response size is the number of body bytes actually written, so it is
//! recorded when the body finishes streaming rather than when the handler
//! returns.
//!
//! Requests that never matched a route (the router fallback, typically a 404)
//! carry no `MatchedPath` and are passed through without recording anything.
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/users/:id", get(get_user))
//!     .layer(middleware::from_fn_with_state(instrumentor.clone(), track_metrics));
//! ```

use axum::{
    body::{Body, Bytes},
    extract::{MatchedPath, Request, State},
    http::{header::CONTENT_LENGTH, HeaderMap},
    middleware::Next,
    response::Response,
};
use http_body::{Body as HttpBody, Frame, SizeHint};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tracing::trace;

use crate::instrumentor::{Instrumentor, PendingResponseSize};
use crate::labels::Observation;

/// Middleware that records request metrics for matched routes.
///
/// The downstream handler always runs. Metrics are recorded exactly once,
/// after it returns, for any status code; the response size follows when the
/// body has been written or dropped. Panics raised by the handler are left to
/// the host's own layers.
pub async fn track_metrics(
    State(instrumentor): State<Instrumentor>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    let Some(route) = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
    else {
        trace!(
            target: "route_metrics",
            method = %request.method(),
            "No matched route, skipping metrics"
        );
        return next.run(request).await;
    };

    // The request moves into the handler, so capture its side first.
    let method = request.method().clone();
    let custom = instrumentor.schema().capture(request.headers());
    let request_size = content_length(request.headers())
        .or_else(|| request.body().size_hint().exact())
        .unwrap_or(0);

    let response = next.run(request).await;

    let observation = Observation {
        status: response.status(),
        method,
        route,
        custom,
        request_size,
        response_size: response_size(&response),
        elapsed: start.elapsed(),
    };

    match instrumentor.record_deferred(&observation) {
        Some(pending) => response
            .map(|body| Body::new(CountingBody::new(body, pending, observation.response_size))),
        None => response,
    }
}

/// Response body that counts the data bytes it yields and records the total
/// once the stream ends.
///
/// A body dropped before any data was polled, such as a HEAD response,
/// records the size known up front instead.
struct CountingBody {
    inner: Body,
    written: u64,
    fallback: u64,
    pending: Option<PendingResponseSize>,
}

impl CountingBody {
    fn new(inner: Body, pending: PendingResponseSize, fallback: u64) -> Self {
        Self {
            inner,
            written: 0,
            fallback,
            pending: Some(pending),
        }
    }

    fn finish(&mut self, bytes: u64) {
        if let Some(pending) = self.pending.take() {
            pending.record(bytes);
        }
    }
}

impl HttpBody for CountingBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);

        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.written += data.len() as u64;
                }
                if this.inner.is_end_stream() {
                    this.finish(this.written);
                }
            }
            Poll::Ready(Some(Err(_))) | Poll::Ready(None) => this.finish(this.written),
            Poll::Pending => {}
        }

        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for CountingBody {
    fn drop(&mut self) {
        let bytes = if self.written == 0 {
            self.fallback
        } else {
            self.written
        };
        self.finish(bytes);
    }
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Body size when known up front, falling back to the `Content-Length` header.
fn response_size(response: &Response) -> u64 {
    response
        .body()
        .size_hint()
        .exact()
        .or_else(|| content_length(response.headers()))
        .unwrap_or(0)
}
