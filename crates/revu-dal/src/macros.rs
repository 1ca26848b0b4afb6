/// Repository for a name+slug value entity (Category, Genre). The two are
/// structurally identical, only the table differs.
#[macro_export]
macro_rules! slug_value_repository {
    ($entity:ident, $create:ident, $repo:ident, $repo_impl:ident, $table:literal) => {
        #[derive(
            Debug, Clone, ::serde::Serialize, ::serde::Deserialize, ::sqlx::FromRow, PartialEq, Eq,
        )]
        pub struct $entity {
            #[serde(skip_serializing, default)]
            pub id: i64,
            pub name: String,
            pub slug: String,
        }

        #[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize, ::garde::Validate)]
        pub struct $create {
            #[garde(length(min = 1, max = 256))]
            pub name: String,
            #[garde(length(min = 1, max = 50), custom($crate::valid_slug))]
            pub slug: String,
        }

        pub type $repo = $repo_impl<$crate::Pool>;

        pub struct $repo_impl<E> {
            executor: E,
        }

        impl<'c, E> $repo_impl<E>
        where
            for<'a> &'a E: ::sqlx::Executor<'c, Database = $crate::ChosenDB>,
        {
            pub fn new(executor: E) -> Self {
                Self { executor }
            }

            pub async fn create(&self, payload: $create) -> $crate::error::Result<$entity> {
                let result = ::sqlx::query(concat!(
                    "INSERT INTO ",
                    $table,
                    " (name, slug) VALUES (?, ?)"
                ))
                .bind(&payload.name)
                .bind(&payload.slug)
                .execute(&self.executor)
                .await
                .map_err(|e| {
                    $crate::error::unique_violation(
                        e,
                        concat!(stringify!($entity), " with this slug already exists"),
                    )
                })?;

                self.get(result.last_insert_rowid()).await
            }

            pub async fn get(&self, id: i64) -> $crate::error::Result<$entity> {
                let record = ::sqlx::query_as::<_, $entity>(concat!(
                    "SELECT id, name, slug FROM ",
                    $table,
                    " WHERE id = ?"
                ))
                .bind(id)
                .fetch_optional(&self.executor)
                .await?
                .ok_or_else(|| {
                    $crate::Error::RecordNotFound(stringify!($entity).to_string())
                })?;
                Ok(record)
            }

            pub async fn get_by_slug(&self, slug: &str) -> $crate::error::Result<$entity> {
                let record = ::sqlx::query_as::<_, $entity>(concat!(
                    "SELECT id, name, slug FROM ",
                    $table,
                    " WHERE slug = ?"
                ))
                .bind(slug)
                .fetch_optional(&self.executor)
                .await?
                .ok_or_else(|| {
                    $crate::Error::RecordNotFound(stringify!($entity).to_string())
                })?;
                Ok(record)
            }

            /// List ordered by name; `search` filters on exact name.
            pub async fn list(
                &self,
                params: $crate::ListingParams,
                search: Option<&str>,
            ) -> $crate::error::Result<$crate::Batch<$entity>> {
                let total: i64 = match search {
                    Some(name) => {
                        ::sqlx::query_scalar(concat!(
                            "SELECT COUNT(*) FROM ",
                            $table,
                            " WHERE name = ?"
                        ))
                        .bind(name)
                        .fetch_one(&self.executor)
                        .await?
                    }
                    None => {
                        ::sqlx::query_scalar(concat!("SELECT COUNT(*) FROM ", $table))
                            .fetch_one(&self.executor)
                            .await?
                    }
                };

                let rows = match search {
                    Some(name) => {
                        ::sqlx::query_as::<_, $entity>(concat!(
                            "SELECT id, name, slug FROM ",
                            $table,
                            " WHERE name = ? ORDER BY name LIMIT ? OFFSET ?"
                        ))
                        .bind(name)
                        .bind(params.limit)
                        .bind(params.offset)
                        .fetch_all(&self.executor)
                        .await?
                    }
                    None => {
                        ::sqlx::query_as::<_, $entity>(concat!(
                            "SELECT id, name, slug FROM ",
                            $table,
                            " ORDER BY name LIMIT ? OFFSET ?"
                        ))
                        .bind(params.limit)
                        .bind(params.offset)
                        .fetch_all(&self.executor)
                        .await?
                    }
                };

                Ok($crate::Batch {
                    rows,
                    total: total as u64,
                    offset: params.offset,
                })
            }

            /// Deletes by slug and returns the removed record.
            pub async fn delete_by_slug(&self, slug: &str) -> $crate::error::Result<$entity> {
                let record = self.get_by_slug(slug).await?;
                ::sqlx::query(concat!("DELETE FROM ", $table, " WHERE slug = ?"))
                    .bind(slug)
                    .execute(&self.executor)
                    .await?;
                Ok(record)
            }
        }
    };
}
