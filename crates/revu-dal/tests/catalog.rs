use futures::TryStreamExt as _;
use revu_dal::{
    Error, ListingParams,
    category::{CategoryRepositoryImpl, CreateCategory},
    genre::{CreateGenre, GenreRepositoryImpl},
    title::{CreateTitle, TitleFilter, TitleRepositoryImpl, UpdateTitle},
};
use sqlx::Executor;

const TEST_DATA: &str = r#"
INSERT INTO category (id, name, slug) VALUES (1, 'Film', 'film');
INSERT INTO category (id, name, slug) VALUES (2, 'Book', 'book');

INSERT INTO genre (id, name, slug) VALUES (1, 'Drama', 'drama');
INSERT INTO genre (id, name, slug) VALUES (2, 'Comedy', 'comedy');
INSERT INTO genre (id, name, slug) VALUES (3, 'Sci-Fi', 'sci-fi');

INSERT INTO title (id, name, year, description, category_id)
VALUES (1, 'Brazil', 1985, 'Bureaucracy gone wrong', 1);
INSERT INTO title (id, name, year, description, category_id)
VALUES (2, 'Solaris', 1972, NULL, 1);
INSERT INTO title (id, name, year, description, category_id)
VALUES (3, 'Roadside Picnic', 1972, NULL, 2);

INSERT INTO title_genres (title_id, genre_id) VALUES (1, 2);
INSERT INTO title_genres (title_id, genre_id) VALUES (1, 3);
INSERT INTO title_genres (title_id, genre_id) VALUES (2, 1);
INSERT INTO title_genres (title_id, genre_id) VALUES (2, 3);
INSERT INTO title_genres (title_id, genre_id) VALUES (3, 3);

INSERT INTO users (id, username, email) VALUES (1, 'alice', 'alice@example.com');
INSERT INTO users (id, username, email) VALUES (2, 'bob', 'bob@example.com');

INSERT INTO review (id, title_id, author_id, text, score, pub_date)
VALUES (1, 1, 1, 'Classic', 8, '2024-01-01 10:00:00');
INSERT INTO review (id, title_id, author_id, text, score, pub_date)
VALUES (2, 1, 2, 'Good', 6, '2024-01-02 10:00:00');
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
async fn test_category_crud() {
    let conn = init_db().await;
    let repo = CategoryRepositoryImpl::new(conn);

    let created = repo
        .create(CreateCategory {
            name: "Music".to_string(),
            slug: "music".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(created.name, "Music");

    let all = repo.list(ListingParams::default(), None).await.unwrap();
    assert_eq!(all.total, 3);
    // ordered by name
    assert_eq!(all.rows[0].name, "Book");

    let filtered = repo
        .list(ListingParams::default(), Some("Music"))
        .await
        .unwrap();
    assert_eq!(filtered.total, 1);
    assert_eq!(filtered.rows[0].slug, "music");

    // exact match only
    let filtered = repo
        .list(ListingParams::default(), Some("Musi"))
        .await
        .unwrap();
    assert_eq!(filtered.total, 0);

    let deleted = repo.delete_by_slug("music").await.unwrap();
    assert_eq!(deleted.name, "Music");
    assert!(matches!(
        repo.delete_by_slug("music").await,
        Err(Error::RecordNotFound(_))
    ));
}

#[tokio::test]
async fn test_duplicate_slug() {
    let conn = init_db().await;
    let repo = GenreRepositoryImpl::new(conn);

    let result = repo
        .create(CreateGenre {
            name: "Another drama".to_string(),
            slug: "drama".to_string(),
        })
        .await;
    assert!(matches!(result, Err(Error::UniqueViolation(_))));
}

#[tokio::test]
async fn test_title_get_with_rating() {
    let conn = init_db().await;
    let repo = TitleRepositoryImpl::new(conn);

    let title = repo.get(1).await.unwrap();
    assert_eq!(title.name, "Brazil");
    assert_eq!(title.category.as_ref().unwrap().slug, "film");
    let genres: Vec<&str> = title.genre.iter().map(|g| g.slug.as_str()).collect();
    assert_eq!(genres, ["comedy", "sci-fi"]);
    // reviews scored 8 and 6
    assert_eq!(title.rating, Some(7.0));

    let unreviewed = repo.get(2).await.unwrap();
    assert_eq!(unreviewed.rating, None);
}

#[tokio::test]
async fn test_title_filters() {
    let conn = init_db().await;
    let repo = TitleRepositoryImpl::new(conn);

    let by_year = repo
        .list(
            ListingParams::default(),
            &TitleFilter {
                year: Some(1972),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(by_year.total, 2);

    // AND semantics, substring name match is case-insensitive
    let combined = repo
        .list(
            ListingParams::default(),
            &TitleFilter {
                name: Some("sol".to_string()),
                category: Some("film".to_string()),
                year: Some(1972),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(combined.total, 1);
    assert_eq!(combined.rows[0].name, "Solaris");

    let by_genre = repo
        .list(
            ListingParams::default(),
            &TitleFilter {
                genre: Some("sci-fi".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(by_genre.total, 3);

    let nothing = repo
        .list(
            ListingParams::default(),
            &TitleFilter {
                name: Some("sol".to_string()),
                category: Some("book".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(nothing.total, 0);
}

#[tokio::test]
async fn test_title_create_update() {
    let conn = init_db().await;
    let repo = TitleRepositoryImpl::new(conn);

    let created = repo
        .create(CreateTitle {
            name: "Stalker".to_string(),
            year: 1979,
            description: None,
            category: Some("film".to_string()),
            genre: vec!["drama".to_string(), "sci-fi".to_string()],
        })
        .await
        .unwrap();
    assert_eq!(created.category.as_ref().unwrap().slug, "film");
    assert_eq!(created.genre.len(), 2);
    assert_eq!(created.rating, None);

    let updated = repo
        .update(
            created.id,
            UpdateTitle {
                name: Some("Stalker (1979)".to_string()),
                genre: Some(vec!["sci-fi".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Stalker (1979)");
    assert_eq!(updated.year, 1979);
    assert_eq!(updated.genre.len(), 1);

    let bad_ref = repo
        .create(CreateTitle {
            name: "Nowhere".to_string(),
            year: 2000,
            description: None,
            category: Some("no-such".to_string()),
            genre: vec![],
        })
        .await;
    assert!(matches!(bad_ref, Err(Error::InvalidReference(_))));
}

#[tokio::test]
async fn test_category_delete_nulls_title() {
    let conn = init_db().await;
    let categories = CategoryRepositoryImpl::new(conn.clone());
    let titles = TitleRepositoryImpl::new(conn);

    categories.delete_by_slug("film").await.unwrap();

    let title = titles.get(1).await.unwrap();
    assert!(title.category.is_none());
}
