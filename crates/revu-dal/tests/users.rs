use std::str::FromStr as _;

use revu_dal::{
    Error, ListingParams,
    user::{CreateUser, Register, UpdateProfile, UpdateUser, UserRepositoryImpl},
};
use revu_types::{
    claim::Role,
    general::{Username, ValidEmail},
};
use sqlx::Executor;

async fn init_db() -> sqlx::Pool<sqlx::Sqlite> {
    const DB_URL: &str = "sqlite::memory:";
    let conn = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect(DB_URL)
        .await
        .unwrap();
    conn.execute("PRAGMA foreign_keys = ON").await.unwrap();
    sqlx::migrate!("../../migrations").run(&conn).await.unwrap();
    conn
}

fn register(username: &str, email: &str) -> Register {
    Register {
        username: Username::from_str(username).unwrap(),
        email: ValidEmail::from_str(email).unwrap(),
    }
}

#[tokio::test]
async fn test_register_get_or_create() {
    let conn = init_db().await;
    let repo = UserRepositoryImpl::new(conn);

    let user = repo
        .register(register("alice", "alice@example.com"))
        .await
        .unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(user.role, Role::User);
    assert!(user.last_login.is_none());

    // same pair fetches the same account
    let again = repo
        .register(register("alice", "alice@example.com"))
        .await
        .unwrap();
    assert_eq!(again.id, user.id);

    // username collision with a different email
    let taken = repo.register(register("alice", "other@example.com")).await;
    assert!(matches!(taken, Err(Error::UniqueViolation(ref m)) if m.contains("username")));

    // email collision with a different username
    let taken = repo.register(register("alicia", "alice@example.com")).await;
    assert!(matches!(taken, Err(Error::UniqueViolation(ref m)) if m.contains("email")));
}

#[tokio::test]
async fn test_admin_crud() {
    let conn = init_db().await;
    let repo = UserRepositoryImpl::new(conn);

    let moderator = repo
        .create(CreateUser {
            username: Username::from_str("mod").unwrap(),
            email: ValidEmail::from_str("mod@example.com").unwrap(),
            role: Some(Role::Moderator),
            bio: Some("keeps the peace".to_string()),
            first_name: None,
            last_name: None,
        })
        .await
        .unwrap();
    assert_eq!(moderator.role, Role::Moderator);

    let fetched = repo.get_by_username("mod").await.unwrap();
    assert_eq!(fetched.id, moderator.id);

    let updated = repo
        .update_by_username(
            "mod",
            UpdateUser {
                role: Some(Role::Admin),
                first_name: Some("Max".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.role, Role::Admin);
    assert_eq!(updated.first_name.as_deref(), Some("Max"));
    assert_eq!(updated.bio.as_deref(), Some("keeps the peace"));

    repo.delete_by_username("mod").await.unwrap();
    assert!(matches!(
        repo.get_by_username("mod").await,
        Err(Error::RecordNotFound(_))
    ));
    assert!(matches!(
        repo.delete_by_username("mod").await,
        Err(Error::RecordNotFound(_))
    ));
}

#[tokio::test]
async fn test_profile_update_has_no_role() {
    let conn = init_db().await;
    let repo = UserRepositoryImpl::new(conn);

    let user = repo
        .register(register("bob", "bob@example.com"))
        .await
        .unwrap();

    // a role key in the payload is simply not part of the type
    let payload: UpdateProfile =
        serde_json::from_value(serde_json::json!({"bio": "hi", "role": "admin"})).unwrap();
    let updated = repo.update_profile(user.id, payload).await.unwrap();
    assert_eq!(updated.bio.as_deref(), Some("hi"));
    assert_eq!(updated.role, Role::User);
}

#[tokio::test]
async fn test_list_and_search() {
    let conn = init_db().await;
    let repo = UserRepositoryImpl::new(conn);

    for name in ["alice", "alina", "bob"] {
        repo.register(register(name, &format!("{name}@example.com")))
            .await
            .unwrap();
    }

    let all = repo.list(ListingParams::default(), None).await.unwrap();
    assert_eq!(all.total, 3);

    let found = repo
        .list(ListingParams::default(), Some("ali"))
        .await
        .unwrap();
    assert_eq!(found.total, 2);

    let page = repo.list(ListingParams::new(1, 1), Some("ali")).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.rows[0].username, "alina");
}

#[tokio::test]
async fn test_touch_last_login() {
    let conn = init_db().await;
    let repo = UserRepositoryImpl::new(conn);

    let user = repo
        .register(register("carol", "carol@example.com"))
        .await
        .unwrap();
    assert!(user.last_login.is_none());

    repo.touch_last_login(user.id).await.unwrap();
    let user = repo.get(user.id).await.unwrap();
    assert!(user.last_login.is_some());
}
