use garde::Validate;
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::{Batch, Error, ListingParams, error::Result, error::unique_violation};

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateReview {
    #[garde(length(min = 1))]
    pub text: String,
    #[garde(range(min = 1, max = 10))]
    pub score: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct UpdateReview {
    #[garde(length(min = 1))]
    pub text: Option<String>,
    #[garde(inner(range(min = 1, max = 10)))]
    pub score: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    #[serde(rename = "title")]
    pub title_id: i64,
    /// Author's username in the API representation.
    pub author: String,
    #[serde(skip_serializing, default)]
    pub author_id: i64,
    pub text: String,
    pub score: i64,
    pub pub_date: PrimitiveDateTime,
}

const REVIEW_COLUMNS: &str = "r.id, r.title_id, r.author_id, u.username AS author, \
                              r.text, r.score, r.pub_date";

pub type ReviewRepository = ReviewRepositoryImpl<crate::Pool>;

pub struct ReviewRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> ReviewRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(
        &self,
        title_id: i64,
        author_id: i64,
        payload: CreateReview,
    ) -> Result<Review> {
        let result = sqlx::query(
            "INSERT INTO review (title_id, author_id, text, score) VALUES (?, ?, ?, ?)",
        )
        .bind(title_id)
        .bind(author_id)
        .bind(&payload.text)
        .bind(payload.score)
        .execute(&self.executor)
        .await
        .map_err(|e| unique_violation(e, "author has already reviewed this title"))?;

        self.get(title_id, result.last_insert_rowid()).await
    }

    pub async fn get(&self, title_id: i64, id: i64) -> Result<Review> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM review r \
             JOIN users u ON r.author_id = u.id \
             WHERE r.id = ? AND r.title_id = ?"
        ))
        .bind(id)
        .bind(title_id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("Review".to_string()))?;
        Ok(review)
    }

    /// Reviews of one title, oldest first.
    pub async fn list_for_title(
        &self,
        params: ListingParams,
        title_id: i64,
    ) -> Result<Batch<Review>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM review WHERE title_id = ?")
            .bind(title_id)
            .fetch_one(&self.executor)
            .await?;

        let rows = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM review r \
             JOIN users u ON r.author_id = u.id \
             WHERE r.title_id = ? \
             ORDER BY r.pub_date, r.id LIMIT ? OFFSET ?"
        ))
        .bind(title_id)
        .bind(params.limit)
        .bind(params.offset)
        .fetch_all(&self.executor)
        .await?;

        Ok(Batch {
            rows,
            total: total as u64,
            offset: params.offset,
        })
    }

    pub async fn update(&self, title_id: i64, id: i64, payload: UpdateReview) -> Result<Review> {
        let result = sqlx::query(
            "UPDATE review SET \
             text = COALESCE(?, text), \
             score = COALESCE(?, score) \
             WHERE id = ? AND title_id = ?",
        )
        .bind(&payload.text)
        .bind(payload.score)
        .bind(id)
        .bind(title_id)
        .execute(&self.executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound("Review".to_string()));
        }
        self.get(title_id, id).await
    }

    pub async fn delete(&self, title_id: i64, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM review WHERE id = ? AND title_id = ?")
            .bind(id)
            .bind(title_id)
            .execute(&self.executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound("Review".to_string()));
        }
        Ok(())
    }
}
