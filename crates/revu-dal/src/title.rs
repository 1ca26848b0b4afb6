use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, QueryBuilder, Row as _};

use crate::{
    Batch, ChosenDB, ChosenRow, Error, ListingParams, category::Category, error::Result,
    genre::Genre,
};

pub fn valid_year(year: &i64, _ctx: &()) -> garde::Result {
    let current = time::OffsetDateTime::now_utc().year() as i64;
    if !(0..=current).contains(year) {
        return Err(garde::Error::new(format!(
            "year must be between 0 and {current}"
        )));
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateTitle {
    #[garde(length(min = 1, max = 200))]
    pub name: String,
    #[garde(custom(valid_year))]
    pub year: i64,
    #[garde(length(max = 200))]
    pub description: Option<String>,
    /// Category slug reference.
    #[garde(skip)]
    pub category: Option<String>,
    /// Genre slug references.
    #[garde(skip)]
    #[serde(default)]
    pub genre: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct UpdateTitle {
    #[garde(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[garde(inner(custom(valid_year)))]
    pub year: Option<i64>,
    #[garde(length(max = 200))]
    pub description: Option<String>,
    #[garde(skip)]
    pub category: Option<String>,
    /// When present, replaces the whole genre set.
    #[garde(skip)]
    pub genre: Option<Vec<String>>,
}

/// Query-string filters for the title listing; conditions AND together.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleFilter {
    pub name: Option<String>,
    pub category: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Title {
    pub id: i64,
    pub name: String,
    pub year: i64,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub genre: Vec<Genre>,
    /// Average review score, null while unreviewed. Computed, never stored.
    pub rating: Option<f64>,
}

impl sqlx::FromRow<'_, ChosenRow> for Title {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        let category = if let Some(id) = row.try_get::<Option<i64>, _>("category_id")? {
            Some(Category {
                id,
                name: row.try_get("category_name")?,
                slug: row.try_get("category_slug")?,
            })
        } else {
            None
        };
        Ok(Title {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            year: row.try_get("year")?,
            description: row.try_get("description")?,
            category,
            genre: Vec::new(),
            rating: row.try_get("rating")?,
        })
    }
}

const LIST_SQL: &str = r#"
SELECT t.id, t.name, t.year, t.description, t.category_id,
c.name AS category_name, c.slug AS category_slug,
(SELECT AVG(r.score) FROM review r WHERE r.title_id = t.id) AS rating
FROM title t
LEFT JOIN category c ON t.category_id = c.id
"#;

const COUNT_SQL: &str = r#"
SELECT COUNT(*)
FROM title t
LEFT JOIN category c ON t.category_id = c.id
"#;

fn push_filter(builder: &mut QueryBuilder<'_, ChosenDB>, filter: &TitleFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(name) = &filter.name {
        builder
            .push(" AND lower(t.name) LIKE ")
            .push_bind(format!("%{}%", name.to_lowercase()));
    }
    if let Some(category) = &filter.category {
        builder.push(" AND c.slug = ").push_bind(category.clone());
    }
    if let Some(genre) = &filter.genre {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM title_genres tg \
                 JOIN genre g ON tg.genre_id = g.id \
                 WHERE tg.title_id = t.id AND g.slug = ",
            )
            .push_bind(genre.clone())
            .push(")");
    }
    if let Some(year) = filter.year {
        builder.push(" AND t.year = ").push_bind(year);
    }
}

pub type TitleRepository = TitleRepositoryImpl<crate::Pool>;

pub struct TitleRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> TitleRepositoryImpl<E>
where
    for<'a> &'a E:
        sqlx::Executor<'c, Database = ChosenDB> + Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    async fn genres_of(&self, title_id: i64) -> Result<Vec<Genre>> {
        let genres = sqlx::query_as::<_, Genre>(
            "SELECT g.id, g.name, g.slug FROM genre g \
             JOIN title_genres tg ON tg.genre_id = g.id \
             WHERE tg.title_id = ? ORDER BY g.name",
        )
        .bind(title_id)
        .fetch_all(&self.executor)
        .await?;
        Ok(genres)
    }

    pub async fn get(&self, id: i64) -> Result<Title> {
        let mut builder = QueryBuilder::new(LIST_SQL);
        builder.push(" WHERE t.id = ").push_bind(id);
        let mut title: Title = builder
            .build_query_as()
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Title".to_string()))?;
        title.genre = self.genres_of(title.id).await?;
        Ok(title)
    }

    /// Cheap existence probe for the nested review routes.
    pub async fn exists(&self, id: i64) -> Result<()> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM title WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Title".to_string()))?;
        Ok(())
    }

    pub async fn list(&self, params: ListingParams, filter: &TitleFilter) -> Result<Batch<Title>> {
        let mut count = QueryBuilder::new(COUNT_SQL);
        push_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.executor)
            .await?;

        let mut builder = QueryBuilder::new(LIST_SQL);
        push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY t.name, t.id LIMIT ")
            .push_bind(params.limit)
            .push(" OFFSET ")
            .push_bind(params.offset);
        let mut rows: Vec<Title> = builder.build_query_as().fetch_all(&self.executor).await?;
        for title in rows.iter_mut() {
            title.genre = self.genres_of(title.id).await?;
        }

        Ok(Batch {
            rows,
            total: total as u64,
            offset: params.offset,
        })
    }

    pub async fn create(&self, payload: CreateTitle) -> Result<Title> {
        let mut tx = self.executor.begin().await?;

        let category_id = match &payload.category {
            Some(slug) => Some(resolve_slug(&mut tx, "category", slug).await?),
            None => None,
        };

        let result = sqlx::query(
            "INSERT INTO title (name, year, description, category_id) VALUES (?, ?, ?, ?)",
        )
        .bind(&payload.name)
        .bind(payload.year)
        .bind(&payload.description)
        .bind(category_id)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();

        for slug in &payload.genre {
            let genre_id = resolve_slug(&mut tx, "genre", slug).await?;
            sqlx::query("INSERT INTO title_genres (title_id, genre_id) VALUES (?, ?)")
                .bind(id)
                .bind(genre_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        self.get(id).await
    }

    pub async fn update(&self, id: i64, payload: UpdateTitle) -> Result<Title> {
        let mut tx = self.executor.begin().await?;

        let category_id = match &payload.category {
            Some(slug) => Some(resolve_slug(&mut tx, "category", slug).await?),
            None => None,
        };

        let result = sqlx::query(
            "UPDATE title SET \
             name = COALESCE(?, name), \
             year = COALESCE(?, year), \
             description = COALESCE(?, description), \
             category_id = COALESCE(?, category_id) \
             WHERE id = ?",
        )
        .bind(&payload.name)
        .bind(payload.year)
        .bind(&payload.description)
        .bind(category_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound("Title".to_string()));
        }

        if let Some(genres) = &payload.genre {
            sqlx::query("DELETE FROM title_genres WHERE title_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for slug in genres {
                let genre_id = resolve_slug(&mut tx, "genre", slug).await?;
                sqlx::query("INSERT INTO title_genres (title_id, genre_id) VALUES (?, ?)")
                    .bind(id)
                    .bind(genre_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM title WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound("Title".to_string()));
        }
        Ok(())
    }
}

/// Maps a category/genre slug reference to its id; unknown slugs are a
/// validation-grade error, not a 500.
async fn resolve_slug(
    tx: &mut sqlx::Transaction<'_, ChosenDB>,
    table: &str,
    slug: &str,
) -> Result<i64> {
    let sql = format!("SELECT id FROM {table} WHERE slug = ?");
    sqlx::query_scalar::<_, i64>(&sql)
        .bind(slug)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| Error::InvalidReference(format!("unknown {table} slug: {slug}")))
}
