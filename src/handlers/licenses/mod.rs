mod activate;
mod check;
mod redirect_tokens;

pub use activate::*;
pub use check::*;
pub use redirect_tokens::*;

use axum::{Router, middleware, routing::post};

use crate::db::AppState;
use crate::middleware::require_principal;

/// Routes that act on behalf of an authenticated principal.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/activate-license", post(activate_license))
        .route("/check-license", post(check_license))
        .route("/list-licenses", post(list_licenses))
        .route("/create-redirect-token", post(create_redirect_token))
        .route_layer(middleware::from_fn_with_state(state, require_principal))
}
