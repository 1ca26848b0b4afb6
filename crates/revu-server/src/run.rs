use axum::{
    Router, ServiceExt, extract::Request, http::StatusCode, response::IntoResponse, routing::get,
};
use revu_app::{
    auth::{TokenLayer, auth_router},
    rest_api,
    state::AppState,
    user::users_router,
};
use tower::Layer as _;
use tower_http::normalize_path::NormalizePathLayer;
use tracing::debug;

use crate::{build_state, config::ServerConfig, error::Result};

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let mut app = main_router(state);

    if !args.no_cors {
        app = app.layer(tower_http::cors::CorsLayer::very_permissive());
    }

    // accept DRF-style trailing slashes as well
    let app = NormalizePathLayer::trim_trailing_slash().layer(app);

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    debug!("Listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

fn main_router(state: AppState) -> Router<()> {
    Router::new()
        .route("/healthz", get(health))
        .nest("/v1/users", users_router())
        .nest("/v1/categories", rest_api::category::router())
        .nest("/v1/genres", rest_api::genre::router())
        .nest("/v1/titles", rest_api::title::router())
        // all routes above see the validated claim
        .layer(TokenLayer::new(state.clone()))
        .nest("/v1/auth", auth_router())
        .with_state(state)
}
