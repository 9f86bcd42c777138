use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::util::extract_bearer_token;

/// Resolve the bearer token into a `Principal` and attach it to the request.
///
/// Requests without a valid identity token stop here with 401.
pub async fn require_principal(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = extract_bearer_token(request.headers()).ok_or(AppError::Unauthorized)?;
    let principal = state.auth.verify(token)?;

    tracing::debug!("Authenticated principal {}", principal.id);
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}
