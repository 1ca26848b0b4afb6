use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use axum_valid::Garde;
use http::StatusCode;
use revu_dal::user::{CreateUser, UpdateProfile, UpdateUser, UserRepository};
use revu_types::claim::{ApiClaim, Role};

use crate::{
    error::{ApiError, ApiResult},
    repository_from_request,
    rest_api::{Page, Paging, SearchQuery},
    state::AppState,
};

repository_from_request!(UserRepository);

pub async fn create_user(
    user_registry: UserRepository,
    Garde(Json(payload)): Garde<Json<CreateUser>>,
) -> ApiResult<impl IntoResponse> {
    let user = user_registry.create(payload).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_users(
    user_registry: UserRepository,
    State(state): State<AppState>,
    Query(search): Query<SearchQuery>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let default_page_size = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let listing_params = paging.into_listing_params(default_page_size);
    let batch = user_registry
        .list(listing_params, search.search.as_deref())
        .await?;
    Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
}

async fn get_user(
    Path(username): Path<String>,
    user_registry: UserRepository,
) -> ApiResult<impl IntoResponse> {
    let user = user_registry.get_by_username(&username).await?;

    Ok((StatusCode::OK, Json(user)))
}

async fn update_user(
    Path(username): Path<String>,
    user_registry: UserRepository,
    Garde(Json(payload)): Garde<Json<UpdateUser>>,
) -> ApiResult<impl IntoResponse> {
    let user = user_registry.update_by_username(&username, payload).await?;

    Ok((StatusCode::OK, Json(user)))
}

async fn delete_user(
    Path(username): Path<String>,
    user_registry: UserRepository,
) -> ApiResult<impl IntoResponse> {
    user_registry.delete_by_username(&username).await?;

    Ok((StatusCode::NO_CONTENT, ()))
}

/// `GET /users/me` - any authenticated account.
async fn own_profile(
    claim: ApiClaim,
    user_registry: UserRepository,
) -> ApiResult<impl IntoResponse> {
    let id = claim.user_id().ok_or(ApiError::Unauthorized)?;
    let user = user_registry.get(id).await?;

    Ok((StatusCode::OK, Json(user)))
}

/// `PATCH /users/me` - the payload type has no role field, so the role
/// stays whatever it was.
async fn update_own_profile(
    claim: ApiClaim,
    user_registry: UserRepository,
    Garde(Json(payload)): Garde<Json<UpdateProfile>>,
) -> ApiResult<impl IntoResponse> {
    let id = claim.user_id().ok_or(ApiError::Unauthorized)?;
    let user = user_registry.update_profile(id, payload).await?;

    Ok((StatusCode::OK, Json(user)))
}

pub fn users_router() -> axum::Router<AppState> {
    use crate::auth::token::RequiredRolesLayer;
    axum::Router::new()
        .route("/", post(create_user).get(list_users))
        .route(
            "/{username}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .layer(RequiredRolesLayer::new([Role::Admin]))
        .route("/me", get(own_profile).patch(update_own_profile))
}
