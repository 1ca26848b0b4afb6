use std::{
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    RequestPartsExt as _,
    body::Body,
    extract::FromRequestParts,
    response::{IntoResponse as _, Response},
};
use axum_extra::TypedHeader;
use futures::future::{Either, Ready, ready};
use headers::{Authorization, authorization::Bearer};
use http::{HeaderMap, Request, StatusCode, header, request::Parts};
use revu_types::claim::{ApiClaim, Authorization as _, Role};
use tower::{Layer, Service};
use tracing::{debug, error};

use crate::state::AppState;

impl FromRequestParts<AppState> for ApiClaim {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // TokenLayer already validated and parked the claim
        if let Some(claim) = parts.extensions.get::<ApiClaim>() {
            return Ok(claim.clone());
        }

        let header = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| {
                debug!("No bearer token in request");
                StatusCode::UNAUTHORIZED
            })?;

        state
            .tokens()
            .validate::<ApiClaim>(header.0.token())
            .map_err(|e| {
                error!("Failed to validate token: {e}");
                StatusCode::UNAUTHORIZED
            })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Validates a Bearer token when one is present and parks the claim in
/// request extensions. Requests without a token pass through anonymously,
/// so public GET routes keep working under this layer.
#[derive(Clone)]
pub struct TokenLayer {
    state: AppState,
}

impl TokenLayer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for TokenLayer {
    type Service = TokenMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TokenMiddleware {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct TokenMiddleware<S> {
    inner: S,
    state: AppState,
}

impl<S> Service<Request<Body>> for TokenMiddleware<S>
where
    S: Service<Request<Body>, Response = Response>,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Either<Ready<Result<Response, S::Error>>, S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let token = bearer_token(req.headers()).map(|t| t.to_string());
        if let Some(token) = token {
            match self.state.tokens().validate::<ApiClaim>(&token) {
                Ok(claim) => {
                    req.extensions_mut().insert(claim);
                }
                Err(e) => {
                    debug!("Rejecting invalid token: {e}");
                    return Either::Left(ready(Ok(StatusCode::UNAUTHORIZED.into_response())));
                }
            }
        }
        Either::Right(self.inner.call(req))
    }
}

/// Gates the wrapped routes: 401 without a claim, 403 with a claim that has
/// none of the required roles. Superusers always pass.
#[derive(Clone)]
pub struct RequiredRolesLayer {
    roles: Arc<Vec<Role>>,
}

impl RequiredRolesLayer {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            roles: Arc::new(roles.into_iter().collect()),
        }
    }
}

impl<S> Layer<S> for RequiredRolesLayer {
    type Service = RequiredRoles<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequiredRoles {
            inner,
            roles: self.roles.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RequiredRoles<S> {
    inner: S,
    roles: Arc<Vec<Role>>,
}

impl<S> Service<Request<Body>> for RequiredRoles<S>
where
    S: Service<Request<Body>, Response = Response>,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Either<Ready<Result<Response, S::Error>>, S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        match req.extensions().get::<ApiClaim>() {
            None => Either::Left(ready(Ok(StatusCode::UNAUTHORIZED.into_response()))),
            Some(claim)
                if claim.is_superuser() || claim.has_any_role(self.roles.iter().copied()) =>
            {
                Either::Right(self.inner.call(req))
            }
            Some(claim) => {
                debug!("User {} lacks required role", claim.username);
                Either::Left(ready(Ok(StatusCode::FORBIDDEN.into_response())))
            }
        }
    }
}
