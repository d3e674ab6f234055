use thiserror::Error;

/// Failure reported by a transport or a chain handler.
#[derive(Error, Debug)]
pub enum DbotError {
    #[error("Bot error: {0}")]
    Bot(String),
}

pub type Result<T> = std::result::Result<T, DbotError>;
