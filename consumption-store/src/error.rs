#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("invalid table name '{0}': only ASCII letters, digits and '_' are allowed")]
    InvalidIdentifier(String),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Table names are spliced into SQL text, so they are restricted to plain identifiers.
pub fn validate_identifier(name: &str) -> StoreResult<&str> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);

    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(name)
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}
