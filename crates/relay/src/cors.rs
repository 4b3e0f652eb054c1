// Browser origin policy for the relay HTTP surface.
//
// The allowed origin list comes from `RelayConfig::cors_origins`
// (`FOLIO_RELAY_CORS_ORIGINS`). Without it only local dev servers may call in.

use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Origins allowed when no explicit list is configured.
const DEFAULT_DEV_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
];

/// Build a [`CorsLayer`] for the configured origins.
///
/// `"*"` allows any origin without credentials. A comma-separated list allows
/// exactly those origins. `None` falls back to [`DEFAULT_DEV_ORIGINS`].
pub fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([HeaderName::from_static("x-request-id")])
        .max_age(std::time::Duration::from_secs(3600));

    match origins.map(str::trim) {
        Some("*") => base.allow_origin(AllowOrigin::any()),
        Some(list) => base.allow_origin(parse_origins(list)).allow_credentials(true),
        None => base
            .allow_origin(parse_origins(&DEFAULT_DEV_ORIGINS.join(",")))
            .allow_credentials(true),
    }
}

fn parse_origins(comma_separated: &str) -> Vec<HeaderValue> {
    comma_separated
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    use super::*;

    fn test_app(origins: Option<&str>) -> Router {
        Router::new().route("/probe", get(|| async { "ok" })).layer(cors_layer(origins))
    }

    fn preflight(origin: &str) -> Request<Body> {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/probe")
            .header("origin", origin)
            .header("access-control-request-method", "PUT")
            .body(Body::empty())
            .expect("preflight request should build")
    }

    #[tokio::test]
    async fn dev_origin_is_allowed_by_default() {
        let response = test_app(None)
            .oneshot(preflight("http://localhost:5173"))
            .await
            .expect("preflight should succeed");

        assert_eq!(
            response.headers().get("access-control-allow-origin").expect("origin header"),
            "http://localhost:5173"
        );
        assert_eq!(
            response.headers().get("access-control-allow-credentials").expect("credentials"),
            "true"
        );
    }

    #[tokio::test]
    async fn unknown_origin_gets_no_allow_header() {
        let response = test_app(None)
            .oneshot(preflight("https://evil.example.com"))
            .await
            .expect("preflight should succeed");

        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn configured_list_replaces_defaults() {
        let app = test_app(Some("https://folio.example.com, https://staging.folio.example.com"));

        let response =
            app.clone().oneshot(preflight("https://folio.example.com")).await.expect("preflight");
        assert_eq!(
            response.headers().get("access-control-allow-origin").expect("origin header"),
            "https://folio.example.com"
        );

        let response = app.oneshot(preflight("http://localhost:3000")).await.expect("preflight");
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn wildcard_disables_credentials() {
        let response = test_app(Some("*"))
            .oneshot(preflight("https://anything.example.com"))
            .await
            .expect("preflight should succeed");

        assert_eq!(
            response.headers().get("access-control-allow-origin").expect("origin header"),
            "*"
        );
        assert!(response.headers().get("access-control-allow-credentials").is_none());
    }
}
