/// REST surface for a name+slug value entity: public paginated list,
/// admin-only create and delete-by-slug. Slugs are immutable, there is no
/// update route.
#[macro_export]
macro_rules! slug_value_api {
    ($create:ty, $repository:ty) => {
        $crate::repository_from_request!($repository);

        mod crud_api {
            use super::*;
            use axum::{
                Json,
                extract::{Path, Query, State},
                response::IntoResponse,
            };
            use axum_valid::Garde;
            use http::StatusCode;

            use $crate::{
                error::ApiResult,
                rest_api::{Page, Paging, SearchQuery},
                state::AppState,
            };

            pub async fn list(
                repository: $repository,
                State(state): State<AppState>,
                Query(search): Query<SearchQuery>,
                Garde(Query(paging)): Garde<Query<Paging>>,
            ) -> ApiResult<impl IntoResponse> {
                let default_page_size = state.config().default_page_size;
                let page_size = paging.page_size(default_page_size);
                let listing_params = paging.into_listing_params(default_page_size);
                let batch = repository
                    .list(listing_params, search.search.as_deref())
                    .await?;
                Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
            }

            pub async fn create(
                repository: $repository,
                Garde(Json(payload)): Garde<Json<$create>>,
            ) -> ApiResult<impl IntoResponse> {
                let record = repository.create(payload).await?;

                Ok((StatusCode::CREATED, Json(record)))
            }

            // the deleted representation travels in the body, hence 200
            // rather than a bodyless 204
            pub async fn delete(
                Path(slug): Path<String>,
                repository: $repository,
            ) -> ApiResult<impl IntoResponse> {
                let record = repository.delete_by_slug(&slug).await?;

                Ok((StatusCode::OK, Json(record)))
            }
        }

        pub fn router() -> axum::Router<$crate::state::AppState> {
            use axum::routing::{delete, get, post};
            use revu_types::claim::Role;

            use $crate::auth::token::RequiredRolesLayer;

            axum::Router::new()
                .route("/", post(crud_api::create))
                .route("/{slug}", delete(crud_api::delete))
                .layer(RequiredRolesLayer::new([Role::Admin]))
                .route("/", get(crud_api::list))
        }
    };
}
