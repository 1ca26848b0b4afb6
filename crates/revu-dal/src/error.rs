pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("{0}")]
    UniqueViolation(String),

    #[error("{0}")]
    InvalidReference(String),
}

/// Turns a unique-constraint failure into a validation-grade error; the
/// concurrent-insert race on e.g. (title, author) lands here too.
pub(crate) fn unique_violation(e: sqlx::Error, what: &str) -> Error {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::UniqueViolation(what.to_string())
        }
        _ => Error::DatabaseError(e),
    }
}
