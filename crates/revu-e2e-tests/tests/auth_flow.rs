use revu_dal::user::UserRepository;
use revu_e2e_tests::{base_url, confirmation_code, prepare_env, spawn_server};
use reqwest::StatusCode;
use serde_json::json;
use tracing::info;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_signup_and_token_exchange() {
    let (args, _config_guard) = prepare_env("test_signup").await.unwrap();
    spawn_server(&args).await.unwrap();
    let base_url = base_url(&args);
    let client = reqwest::Client::new();

    let signup_url = base_url.join("v1/auth/signup").unwrap();
    let response = client
        .post(signup_url.clone())
        .json(&json!({"username": "jane", "email": "jane@example.com"}))
        .send()
        .await
        .unwrap();
    info!("Signup response: {:#?}", response);
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["username"], "jane");
    assert_eq!(body["email"], "jane@example.com");

    // re-requesting a code for the same pair is fine
    let response = client
        .post(signup_url.clone())
        .json(&json!({"username": "jane", "email": "jane@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // same username, different email
    let response = client
        .post(signup_url.clone())
        .json(&json!({"username": "jane", "email": "other@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // reserved username, in any case
    let response = client
        .post(signup_url.clone())
        .json(&json!({"username": "Me", "email": "me@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // the code is delivered out-of-band; recompute it from the account state
    let pool = revu_dal::new_pool(&args.database_url()).await.unwrap();
    let user_registry = UserRepository::new(pool);
    let user = user_registry.get_by_username("jane").await.unwrap();
    let code = confirmation_code(&args, &user).await.unwrap();

    let token_url = base_url.join("v1/auth/token").unwrap();

    // unknown username is a 404
    let response = client
        .post(token_url.clone())
        .json(&json!({"username": "nobody", "confirmation_code": &code}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // garbled code is a 400
    let response = client
        .post(token_url.clone())
        .json(&json!({"username": "jane", "confirmation_code": "bogus"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // the real one buys a bearer token
    let response = client
        .post(token_url.clone())
        .json(&json!({"username": "jane", "confirmation_code": &code}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let me_url = base_url.join("v1/users/me").unwrap();
    let response = client
        .get(me_url)
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let me: serde_json::Value = response.json().await.unwrap();
    assert_eq!(me["username"], "jane");
    assert_eq!(me["role"], "user");

    // issuing moved last_login, the old code is spent
    let response = client
        .post(token_url.clone())
        .json(&json!({"username": "jane", "confirmation_code": &code}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[traced_test]
async fn test_protected_routes_require_token() {
    let (args, _config_guard) = prepare_env("test_protected").await.unwrap();
    spawn_server(&args).await.unwrap();
    let base_url = base_url(&args);
    let client = reqwest::Client::new();

    let me_url = base_url.join("v1/users/me").unwrap();
    let response = client.get(me_url.clone()).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(me_url)
        .bearer_auth("garbage.token.here")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // public reads pass without a token
    let titles_url = base_url.join("v1/titles").unwrap();
    let response = client.get(titles_url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
