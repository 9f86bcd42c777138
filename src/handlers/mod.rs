pub mod dev;
pub mod licenses;
pub mod public;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::post,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::db::AppState;

/// The full API: public gateway and verification routes, the principal-only
/// license routes, and in dev mode the provisioning shortcut.
pub fn router(state: AppState, dev_mode: bool) -> Router<AppState> {
    let mut app = Router::new()
        // Public endpoints (no auth)
        .merge(public::router())
        // License and token endpoints (identity token auth)
        .merge(licenses::router(state));

    if dev_mode {
        app = app.route("/dev/create-license", post(dev::create_dev_license));
        tracing::info!("DEV endpoints enabled: POST /dev/create-license");
    }
    app
}

/// CORS for browser clients on the configured origins. `None` when no
/// origins are configured.
pub fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    )
}
