use axum::{extract::FromRequestParts, http::request::Parts};

use crate::core::error::{Error, Result};

/// Identity of the authenticated caller.
///
/// The auth middleware validates the token and stashes a `Ctx` in the
/// request extensions; handlers that declare a `Ctx` argument get it from
/// there. A handler reaching this extractor without the middleware having
/// run is a wiring bug, not an auth failure.
#[derive(Clone, Debug)]
pub struct Ctx {
    user_id: String,
}

impl Ctx {
    pub fn new(user_id: String) -> Self {
        Ctx { user_id }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl<S> FromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        match parts.extensions.get::<Ctx>() {
            Some(ctx) => Ok(ctx.clone()),
            None => Err(Error::AuthFailCtxNotInRequestExt),
        }
    }
}
