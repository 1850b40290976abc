use crate::auth::TOKEN_HEADER;
use crate::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::{Error, Result};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

pub async fn mw_require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    debug!("MIDDLEWARE: require_auth");

    let token = match req.headers().get(TOKEN_HEADER) {
        Some(h) => h.to_str().map_err(|_| Error::AuthFailTokenInvalid)?,
        None => return Err(Error::AuthFailNoToken),
    };

    let user_id = state
        .keys
        .verify_token(token)
        .map_err(|_| Error::AuthFailTokenInvalid)?;

    req.extensions_mut().insert(Ctx::new(user_id));

    Ok(next.run(req).await)
}
