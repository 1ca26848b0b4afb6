use garde::Validate;
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::{Batch, Error, ListingParams, error::Result};

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateComment {
    #[garde(length(min = 1))]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct UpdateComment {
    #[garde(length(min = 1))]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    #[serde(rename = "review")]
    pub review_id: i64,
    pub author: String,
    #[serde(skip_serializing, default)]
    pub author_id: i64,
    pub text: String,
    pub pub_date: PrimitiveDateTime,
}

const COMMENT_COLUMNS: &str =
    "c.id, c.review_id, c.author_id, u.username AS author, c.text, c.pub_date";

pub type CommentRepository = CommentRepositoryImpl<crate::Pool>;

pub struct CommentRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> CommentRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(
        &self,
        review_id: i64,
        author_id: i64,
        payload: CreateComment,
    ) -> Result<Comment> {
        let result =
            sqlx::query("INSERT INTO comment (review_id, author_id, text) VALUES (?, ?, ?)")
                .bind(review_id)
                .bind(author_id)
                .bind(&payload.text)
                .execute(&self.executor)
                .await?;

        self.get(review_id, result.last_insert_rowid()).await
    }

    pub async fn get(&self, review_id: i64, id: i64) -> Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comment c \
             JOIN users u ON c.author_id = u.id \
             WHERE c.id = ? AND c.review_id = ?"
        ))
        .bind(id)
        .bind(review_id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("Comment".to_string()))?;
        Ok(comment)
    }

    /// Comments of one review, oldest first.
    pub async fn list_for_review(
        &self,
        params: ListingParams,
        review_id: i64,
    ) -> Result<Batch<Comment>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comment WHERE review_id = ?")
            .bind(review_id)
            .fetch_one(&self.executor)
            .await?;

        let rows = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comment c \
             JOIN users u ON c.author_id = u.id \
             WHERE c.review_id = ? \
             ORDER BY c.pub_date, c.id LIMIT ? OFFSET ?"
        ))
        .bind(review_id)
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

    pub async fn update(&self, review_id: i64, id: i64, payload: UpdateComment) -> Result<Comment> {
        let result = sqlx::query(
            "UPDATE comment SET text = COALESCE(?, text) WHERE id = ? AND review_id = ?",
        )
        .bind(&payload.text)
        .bind(id)
        .bind(review_id)
        .execute(&self.executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound("Comment".to_string()));
        }
        self.get(review_id, id).await
    }

    pub async fn delete(&self, review_id: i64, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM comment WHERE id = ? AND review_id = ?")
            .bind(id)
            .bind(review_id)
            .execute(&self.executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound("Comment".to_string()));
        }
        Ok(())
    }
}
