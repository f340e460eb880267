#[derive(Debug, thiserror::Error)]
pub enum UtilError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Timestamp out of range: {0}")]
    TimestampOutOfRange(i64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cookie store error: {0}")]
    CookieStore(String),
}
