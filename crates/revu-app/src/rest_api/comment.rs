use axum::routing::get;
use revu_dal::comment::CommentRepository;

use crate::state::AppState;

crate::repository_from_request!(CommentRepository);

mod crud_api {
    use axum::{
        Json,
        extract::{Path, Query, State},
        response::IntoResponse,
    };
    use axum_valid::Garde;
    use http::StatusCode;
    use revu_dal::{
        comment::{CommentRepository, CreateComment, UpdateComment},
        review::ReviewRepository,
    };
    use revu_types::claim::ApiClaim;

    use crate::{
        error::{ApiError, ApiResult},
        rest_api::{Page, Paging, ensure_author_or_moderator},
        state::AppState,
    };

    pub async fn list(
        Path((title_id, review_id)): Path<(i64, i64)>,
        reviews: ReviewRepository,
        repository: CommentRepository,
        State(state): State<AppState>,
        Garde(Query(paging)): Garde<Query<Paging>>,
    ) -> ApiResult<impl IntoResponse> {
        // also covers a review id that exists under a different title
        reviews.get(title_id, review_id).await?;

        let default_page_size = state.config().default_page_size;
        let page_size = paging.page_size(default_page_size);
        let listing_params = paging.into_listing_params(default_page_size);
        let batch = repository
            .list_for_review(listing_params, review_id)
            .await?;
        Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
    }

    pub async fn create(
        Path((title_id, review_id)): Path<(i64, i64)>,
        reviews: ReviewRepository,
        repository: CommentRepository,
        claim: ApiClaim,
        Garde(Json(payload)): Garde<Json<CreateComment>>,
    ) -> ApiResult<impl IntoResponse> {
        reviews.get(title_id, review_id).await?;

        let author_id = claim.user_id().ok_or(ApiError::Unauthorized)?;
        let record = repository.create(review_id, author_id, payload).await?;

        Ok((StatusCode::CREATED, Json(record)))
    }

    pub async fn get(
        Path((title_id, review_id, id)): Path<(i64, i64, i64)>,
        reviews: ReviewRepository,
        repository: CommentRepository,
    ) -> ApiResult<impl IntoResponse> {
        reviews.get(title_id, review_id).await?;

        let record = repository.get(review_id, id).await?;

        Ok((StatusCode::OK, Json(record)))
    }

    pub async fn update(
        Path((title_id, review_id, id)): Path<(i64, i64, i64)>,
        reviews: ReviewRepository,
        repository: CommentRepository,
        claim: ApiClaim,
        Garde(Json(payload)): Garde<Json<UpdateComment>>,
    ) -> ApiResult<impl IntoResponse> {
        reviews.get(title_id, review_id).await?;

        let record = repository.get(review_id, id).await?;
        ensure_author_or_moderator(&claim, record.author_id)?;

        let record = repository.update(review_id, id, payload).await?;

        Ok((StatusCode::OK, Json(record)))
    }

    pub async fn delete(
        Path((title_id, review_id, id)): Path<(i64, i64, i64)>,
        reviews: ReviewRepository,
        repository: CommentRepository,
        claim: ApiClaim,
    ) -> ApiResult<impl IntoResponse> {
        reviews.get(title_id, review_id).await?;

        let record = repository.get(review_id, id).await?;
        ensure_author_or_moderator(&claim, record.author_id)?;

        repository.delete(review_id, id).await?;

        Ok((StatusCode::NO_CONTENT, ()))
    }
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(crud_api::list).post(crud_api::create))
        .route(
            "/{comment_id}",
            get(crud_api::get)
                .patch(crud_api::update)
                .delete(crud_api::delete),
        )
}
