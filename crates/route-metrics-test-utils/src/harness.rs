//! Router harness for middleware tests.

use axum::{
    body::{Body, Bytes},
    extract::Path,
    http::{Method, Request, StatusCode},
    middleware,
    response::Response,
    routing::{get, post},
    Router,
};
use futures::stream;
use route_metrics::{track_metrics, Instrumentor};
use tower::ServiceExt;

/// Router with a fixed set of routes, wrapped by `track_metrics`:
///
/// - `GET /` - 200, empty body
/// - `GET /client_error` - 400
/// - `GET /server_error` - 500
/// - `GET /users/:id` - 200, echoes the id
/// - `POST /echo` - 200, echoes the request body
/// - `GET /stream` - 200, streams `hello world` in two chunks with no
///   `Content-Length`
///
/// Anything else falls through to the router's 404 fallback.
pub fn test_router(instrumentor: Instrumentor) -> Router {
    Router::new()
        .route("/", get(|| async { StatusCode::OK }))
        .route("/client_error", get(|| async { StatusCode::BAD_REQUEST }))
        .route(
            "/server_error",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .route("/users/:id", get(|Path(id): Path<String>| async move { id }))
        .route("/echo", post(|body: Bytes| async move { body }))
        .route(
            "/stream",
            get(|| async {
                Body::from_stream(stream::iter([
                    Ok::<_, std::io::Error>("hello "),
                    Ok("world"),
                ]))
            }),
        )
        .layer(middleware::from_fn_with_state(instrumentor, track_metrics))
}

/// Send one request with an empty body.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    headers: &[(&str, &str)],
) -> Result<Response, anyhow::Error> {
    send_with_body(app, method, uri, headers, Body::empty()).await
}

/// Send one request with the given body.
pub async fn send_with_body(
    app: &Router,
    method: Method,
    uri: &str,
    headers: &[(&str, &str)],
    body: Body,
) -> Result<Response, anyhow::Error> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(body)?;

    Ok(app.clone().oneshot(request).await?)
}

/// Collect a response body into bytes.
pub async fn body_bytes(response: Response) -> Result<Bytes, anyhow::Error> {
    use http_body_util::BodyExt;
    Ok(response.into_body().collect().await?.to_bytes())
}
