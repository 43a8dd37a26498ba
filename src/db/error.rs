use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Record not found")]
    NotFound,

    #[error("Duplicate record")]
    Duplicate,
}

impl DatabaseError {
    /// Classify a sqlx failure, folding unique violations into `Duplicate`.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => DatabaseError::Duplicate,
            _ => DatabaseError::Sqlx(err),
        }
    }
}
