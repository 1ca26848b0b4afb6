use futures::TryStreamExt as _;
use revu_dal::{
    Error, ListingParams,
    comment::{CommentRepositoryImpl, CreateComment, UpdateComment},
    review::{CreateReview, ReviewRepositoryImpl, UpdateReview},
    title::TitleRepositoryImpl,
};
use sqlx::Executor;

const TEST_DATA: &str = r#"
INSERT INTO category (id, name, slug) VALUES (1, 'Film', 'film');

INSERT INTO title (id, name, year, description, category_id)
VALUES (1, 'Brazil', 1985, NULL, 1);
INSERT INTO title (id, name, year, description, category_id)
VALUES (2, 'Solaris', 1972, NULL, 1);

INSERT INTO users (id, username, email) VALUES (1, 'alice', 'alice@example.com');
INSERT INTO users (id, username, email) VALUES (2, 'bob', 'bob@example.com');
INSERT INTO users (id, username, email) VALUES (3, 'carol', 'carol@example.com');

INSERT INTO review (id, title_id, author_id, text, score, pub_date)
VALUES (1, 1, 1, 'Classic', 8, '2024-01-05 10:00:00');
INSERT INTO review (id, title_id, author_id, text, score, pub_date)
VALUES (2, 1, 2, 'Good', 6, '2024-01-02 10:00:00');

INSERT INTO comment (id, review_id, author_id, text, pub_date)
VALUES (1, 1, 2, 'Agreed', '2024-02-02 10:00:00');
INSERT INTO comment (id, review_id, author_id, text, pub_date)
VALUES (2, 1, 3, 'Not sure', '2024-02-01 10:00:00');
"#;

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

    conn.execute_many(TEST_DATA)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();

    conn
}

#[tokio::test]
async fn test_review_listing_ordered_by_pub_date() {
    let conn = init_db().await;
    let repo = ReviewRepositoryImpl::new(conn);

    let batch = repo
        .list_for_title(ListingParams::default(), 1)
        .await
        .unwrap();
    assert_eq!(batch.total, 2);
    // oldest first, regardless of insert order
    assert_eq!(batch.rows[0].author, "bob");
    assert_eq!(batch.rows[1].author, "alice");
}

#[tokio::test]
async fn test_one_review_per_author() {
    let conn = init_db().await;
    let repo = ReviewRepositoryImpl::new(conn);

    let first = repo
        .create(
            2,
            1,
            CreateReview {
                text: "Slow but great".to_string(),
                score: 9,
            },
        )
        .await
        .unwrap();
    assert_eq!(first.author, "alice");
    assert_eq!(first.score, 9);

    let second = repo
        .create(
            2,
            1,
            CreateReview {
                text: "Changed my mind".to_string(),
                score: 3,
            },
        )
        .await;
    assert!(matches!(second, Err(Error::UniqueViolation(_))));

    // same author on another title is fine
    assert!(repo
        .create(
            1,
            3,
            CreateReview {
                text: "Fine".to_string(),
                score: 7,
            },
        )
        .await
        .is_ok());
}

#[tokio::test]
async fn test_review_update_and_scoping() {
    let conn = init_db().await;
    let repo = ReviewRepositoryImpl::new(conn);

    let updated = repo
        .update(
            1,
            2,
            UpdateReview {
                score: Some(7),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.score, 7);
    assert_eq!(updated.text, "Good");

    // review 1 belongs to title 1, not title 2
    assert!(matches!(
        repo.get(2, 1).await,
        Err(Error::RecordNotFound(_))
    ));
    assert!(matches!(
        repo.delete(2, 1).await,
        Err(Error::RecordNotFound(_))
    ));
}

#[tokio::test]
async fn test_comments() {
    let conn = init_db().await;
    let repo = CommentRepositoryImpl::new(conn);

    let batch = repo
        .list_for_review(ListingParams::default(), 1)
        .await
        .unwrap();
    assert_eq!(batch.total, 2);
    assert_eq!(batch.rows[0].author, "carol");
    assert_eq!(batch.rows[1].author, "bob");

    let created = repo
        .create(
            1,
            1,
            CreateComment {
                text: "Thanks all".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(created.author, "alice");

    let updated = repo
        .update(
            1,
            created.id,
            UpdateComment {
                text: Some("Thanks everyone".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.text, "Thanks everyone");

    repo.delete(1, created.id).await.unwrap();
    assert!(matches!(
        repo.get(1, created.id).await,
        Err(Error::RecordNotFound(_))
    ));
}

#[tokio::test]
async fn test_title_delete_cascades() {
    let conn = init_db().await;
    let titles = TitleRepositoryImpl::new(conn.clone());
    let reviews = ReviewRepositoryImpl::new(conn.clone());
    let comments = CommentRepositoryImpl::new(conn.clone());

    titles.delete(1).await.unwrap();

    let left = reviews
        .list_for_title(ListingParams::default(), 1)
        .await
        .unwrap();
    assert_eq!(left.total, 0);
    let left = comments
        .list_for_review(ListingParams::default(), 1)
        .await
        .unwrap();
    assert_eq!(left.total, 0);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comment")
        .fetch_one(&conn)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_review_serialized_shape() {
    let conn = init_db().await;
    let repo = ReviewRepositoryImpl::new(conn);

    let review = repo.get(1, 1).await.unwrap();
    let json = serde_json::to_value(&review).unwrap();
    assert_eq!(json["title"], 1);
    assert_eq!(json["author"], "alice");
    assert_eq!(json["score"], 8);
    // internal author id never leaks into the representation
    assert!(json.get("author_id").is_none());
}
