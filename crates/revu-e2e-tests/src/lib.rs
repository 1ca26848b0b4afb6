use std::{path::Path, time::Duration};

use anyhow::{Result, anyhow};
use rand::Rng as _;
use revu_auth::ConfirmationCodes;
use revu_dal::user::{CreateUser, User, UserRepository};
use revu_server::config::{Parser, ServerConfig};
use revu_types::claim::Role;
use serde_json::json;
use tempfile::TempDir;
use url::Url;

pub mod rest;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str, base_dir: &Path) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix_in(format!("{}_", test_name), base_dir)?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?;
    let port = port.to_string();
    let args = &[
        "revu-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--no-cors",
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    test_config(test_name, &std::env::temp_dir())
}

pub fn base_url(args: &ServerConfig) -> Url {
    Url::parse(&format!("http://localhost:{}/", args.port)).expect("valid base url")
}

pub fn extend_url(url: &Url, segment: impl ToString) -> Url {
    let mut url = url.clone();
    url.path_segments_mut()
        .expect("base url")
        .push(&segment.to_string());
    url
}

/// Starts the server on its configured port and waits until it answers.
pub async fn spawn_server(args: &ServerConfig) -> Result<()> {
    let state = revu_server::build_state(args).await?;
    let config = args.clone();
    tokio::spawn(async move {
        if let Err(e) =
            revu_server::run::run_graceful_with_state(config, state, std::future::pending::<()>())
                .await
        {
            tracing::error!("Server failed: {e}");
        }
    });

    let health = base_url(args).join("healthz")?;
    let client = reqwest::Client::new();
    for _ in 0..50 {
        if let Ok(response) = client.get(health.clone()).send().await {
            if response.status().is_success() {
                return Ok(());
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Err(anyhow!("Server did not come up"))
}

#[derive(Debug, Clone, Copy)]
pub enum TestUser {
    Admin,
    Moderator,
    User,
}

impl TestUser {
    fn credentials(&self) -> (&'static str, &'static str, Role) {
        match self {
            TestUser::Admin => ("admin", "admin@localhost", Role::Admin),
            TestUser::Moderator => ("moderator", "moderator@localhost", Role::Moderator),
            TestUser::User => ("user", "user@localhost", Role::User),
        }
    }
}

/// Computes a valid confirmation code for the user the same way the server
/// does - from the shared secret file and the account state.
pub async fn confirmation_code(args: &ServerConfig, user: &User) -> Result<String> {
    let secret = tokio::fs::read(args.data_dir().join("secret")).await?;
    let codes = ConfirmationCodes::new(&secret, Duration::from_secs(3600));
    Ok(codes.make_code(&revu_app::auth::code_seed(user))?)
}

/// Creates an account with the given role directly in the database and runs
/// the regular code-for-token exchange against the live server.
pub async fn add_user_client(args: &ServerConfig, test_user: TestUser) -> Result<reqwest::Client> {
    let (username, email, role) = test_user.credentials();

    let pool = revu_dal::new_pool(&args.database_url()).await?;
    let user_registry = UserRepository::new(pool);
    let payload: CreateUser = serde_json::from_value(json!({
        "username": username,
        "email": email,
        "role": role,
    }))?;
    let user = user_registry.create(payload).await?;

    let code = confirmation_code(args, &user).await?;

    let token_url = base_url(args).join("v1/auth/token")?;
    let response = reqwest::Client::new()
        .post(token_url)
        .json(&json!({"username": username, "confirmation_code": code}))
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(anyhow!("Token exchange failed: {}", response.status()));
    }
    let body: serde_json::Value = response.json().await?;
    let token = body
        .get("token")
        .and_then(|t| t.as_str())
        .ok_or_else(|| anyhow!("No token in response"))?;

    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::AUTHORIZATION,
        format!("Bearer {token}").parse()?,
    );
    let client = reqwest::Client::builder()
        .default_headers(headers)
        .build()?;
    Ok(client)
}

/// Spawns the server and returns a client authenticated as `test_user`.
pub async fn launch_env(args: ServerConfig, test_user: TestUser) -> Result<reqwest::Client> {
    spawn_server(&args).await?;
    add_user_client(&args, test_user).await
}
