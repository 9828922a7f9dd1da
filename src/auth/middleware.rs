use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use crate::shared::{AppError, AppState};

/// JWT authentication middleware: validates the Authorization Bearer header and adds
/// `PlayerClaims` to the request.
/// Usage: .route_layer(middleware::from_fn_with_state(app_state.clone(), auth::jwt_auth))
/// Handlers can then extract Extension(claims): Extension<PlayerClaims>.
#[instrument(skip(state, req, next), fields(uri = %req.uri()))]
pub async fn jwt_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| {
            warn!("Missing Authorization header in request");
            AppError::Unauthorized("Missing authorization header".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        warn!("Invalid Authorization header format (expected Bearer token)");
        AppError::Unauthorized("Invalid authorization header format".to_string())
    })?;

    let claims = state.token_verifier.verify(token).map_err(|e| {
        warn!(error = %e, "JWT authentication failed");
        AppError::Unauthorized("Invalid token".to_string())
    })?;

    debug!(user_id = %claims.user_id, "Authentication successful");
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Token presented on a WebSocket upgrade: the Sec-WebSocket-Protocol header,
/// or the `token` query parameter for clients that cannot set headers.
pub fn websocket_token<'a>(headers: &'a HeaderMap, query_token: Option<&'a str>) -> Option<&'a str> {
    headers
        .get("sec-websocket-protocol")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .or(query_token)
}
