use axum::routing::get;
use revu_dal::review::ReviewRepository;

use crate::state::AppState;

crate::repository_from_request!(ReviewRepository);

mod crud_api {
    use axum::{
        Json,
        extract::{Path, Query, State},
        response::IntoResponse,
    };
    use axum_valid::Garde;
    use http::StatusCode;
    use revu_dal::{
        review::{CreateReview, ReviewRepository, UpdateReview},
        title::TitleRepository,
    };
    use revu_types::claim::ApiClaim;

    use crate::{
        error::{ApiError, ApiResult},
        rest_api::{Page, Paging, ensure_author_or_moderator},
        state::AppState,
    };

    pub async fn list(
        Path(title_id): Path<i64>,
        titles: TitleRepository,
        repository: ReviewRepository,
        State(state): State<AppState>,
        Garde(Query(paging)): Garde<Query<Paging>>,
    ) -> ApiResult<impl IntoResponse> {
        titles.exists(title_id).await?;

        let default_page_size = state.config().default_page_size;
        let page_size = paging.page_size(default_page_size);
        let listing_params = paging.into_listing_params(default_page_size);
        let batch = repository.list_for_title(listing_params, title_id).await?;
        Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
    }

    pub async fn create(
        Path(title_id): Path<i64>,
        titles: TitleRepository,
        repository: ReviewRepository,
        claim: ApiClaim,
        Garde(Json(payload)): Garde<Json<CreateReview>>,
    ) -> ApiResult<impl IntoResponse> {
        titles.exists(title_id).await?;

        let author_id = claim.user_id().ok_or(ApiError::Unauthorized)?;
        let record = repository.create(title_id, author_id, payload).await?;

        Ok((StatusCode::CREATED, Json(record)))
    }

    pub async fn get(
        Path((title_id, id)): Path<(i64, i64)>,
        repository: ReviewRepository,
    ) -> ApiResult<impl IntoResponse> {
        let record = repository.get(title_id, id).await?;

        Ok((StatusCode::OK, Json(record)))
    }

    pub async fn update(
        Path((title_id, id)): Path<(i64, i64)>,
        repository: ReviewRepository,
        claim: ApiClaim,
        Garde(Json(payload)): Garde<Json<UpdateReview>>,
    ) -> ApiResult<impl IntoResponse> {
        let record = repository.get(title_id, id).await?;
        ensure_author_or_moderator(&claim, record.author_id)?;

        let record = repository.update(title_id, id, payload).await?;

        Ok((StatusCode::OK, Json(record)))
    }

    pub async fn delete(
        Path((title_id, id)): Path<(i64, i64)>,
        repository: ReviewRepository,
        claim: ApiClaim,
    ) -> ApiResult<impl IntoResponse> {
        let record = repository.get(title_id, id).await?;
        ensure_author_or_moderator(&claim, record.author_id)?;

        repository.delete(title_id, id).await?;

        Ok((StatusCode::NO_CONTENT, ()))
    }
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(crud_api::list).post(crud_api::create))
        .route(
            "/{review_id}",
            get(crud_api::get)
                .patch(crud_api::update)
                .delete(crud_api::delete),
        )
        .nest("/{review_id}/comments", super::comment::router())
}
