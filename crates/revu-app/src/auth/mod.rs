use axum::{Json, extract::State, response::IntoResponse, routing::post};
use axum_valid::Garde;
use http::StatusCode;
use revu_auth::CodeSeed;
use revu_dal::user::{Register, User, UserRepository};
use revu_types::claim::ApiClaim;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

pub mod token;

pub use token::{RequiredRolesLayer, TokenLayer};

/// The account state a confirmation code binds to. Shared with the e2e
/// harness, which recomputes codes instead of scraping the outbox.
pub fn code_seed(user: &User) -> CodeSeed {
    CodeSeed {
        user_id: user.id,
        email: user.email.clone(),
        last_login: user.last_login.map(|d| d.to_string()),
    }
}

/// `POST /auth/signup` - creates (or re-fetches) the account and sends a
/// confirmation code out-of-band.
pub async fn signup(
    State(state): State<AppState>,
    user_registry: UserRepository,
    Garde(Json(payload)): Garde<Json<Register>>,
) -> ApiResult<impl IntoResponse> {
    let user = user_registry.register(payload).await?;

    let code = state.codes().make_code(&code_seed(&user))?;
    state
        .mailer()
        .send_confirmation_code(&user.email, &user.username, &code);

    Ok((
        StatusCode::OK,
        Json(json!({"username": user.username, "email": user.email})),
    ))
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub confirmation_code: String,
}

/// `POST /auth/token` - exchanges a confirmation code for a bearer token.
/// Issuing moves `last_login`, which kills every outstanding code.
pub async fn token(
    State(state): State<AppState>,
    user_registry: UserRepository,
    Json(payload): Json<TokenRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = user_registry.get_by_username(&payload.username).await?;

    if !state
        .codes()
        .check_code(&code_seed(&user), &payload.confirmation_code)
    {
        debug!("Bad confirmation code for {}", user.username);
        return Err(ApiError::InvalidConfirmationCode);
    }

    user_registry.touch_last_login(user.id).await?;

    let claim = ApiClaim::new_expired(
        user.id.to_string(),
        user.username.clone(),
        user.role,
        user.superuser,
    );
    let token = state.tokens().issue(claim)?;

    Ok((StatusCode::OK, Json(json!({"token": token}))))
}

pub fn auth_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/signup", post(signup))
        .route("/token", post(token))
}
