use revu_dal::title::TitleRepository;

#[allow(unused_imports)]
use axum::routing::{delete, get, patch, post};
use revu_types::claim::Role;

use crate::{auth::token::RequiredRolesLayer, state::AppState};

crate::repository_from_request!(TitleRepository);

mod crud_api {
    use axum::{
        Json,
        extract::{Path, Query, State},
        response::IntoResponse,
    };
    use axum_valid::Garde;
    use http::StatusCode;
    use revu_dal::title::{CreateTitle, TitleFilter, TitleRepository, UpdateTitle};

    use crate::{
        error::ApiResult,
        rest_api::{Page, Paging},
        state::AppState,
    };

    pub async fn list(
        repository: TitleRepository,
        State(state): State<AppState>,
        Query(filter): Query<TitleFilter>,
        Garde(Query(paging)): Garde<Query<Paging>>,
    ) -> ApiResult<impl IntoResponse> {
        let default_page_size = state.config().default_page_size;
        let page_size = paging.page_size(default_page_size);
        let listing_params = paging.into_listing_params(default_page_size);
        let batch = repository.list(listing_params, &filter).await?;
        Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
    }

    pub async fn get(
        Path(id): Path<i64>,
        repository: TitleRepository,
    ) -> ApiResult<impl IntoResponse> {
        let record = repository.get(id).await?;

        Ok((StatusCode::OK, Json(record)))
    }

    pub async fn create(
        repository: TitleRepository,
        Garde(Json(payload)): Garde<Json<CreateTitle>>,
    ) -> ApiResult<impl IntoResponse> {
        let record = repository.create(payload).await?;

        Ok((StatusCode::CREATED, Json(record)))
    }

    pub async fn update(
        Path(id): Path<i64>,
        repository: TitleRepository,
        Garde(Json(payload)): Garde<Json<UpdateTitle>>,
    ) -> ApiResult<impl IntoResponse> {
        let record = repository.update(id, payload).await?;

        Ok((StatusCode::OK, Json(record)))
    }

    pub async fn delete(
        Path(id): Path<i64>,
        repository: TitleRepository,
    ) -> ApiResult<impl IntoResponse> {
        repository.delete(id).await?;

        Ok((StatusCode::NO_CONTENT, ()))
    }
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", post(crud_api::create))
        .route(
            "/{title_id}",
            patch(crud_api::update).delete(crud_api::delete),
        )
        .layer(RequiredRolesLayer::new([Role::Admin]))
        .route("/", get(crud_api::list))
        .route("/{title_id}", get(crud_api::get))
        .nest("/{title_id}/reviews", super::review::router())
}
