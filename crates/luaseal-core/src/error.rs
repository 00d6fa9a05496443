use thiserror::Error;

pub type LuasealResult<T> = Result<T, LuasealError>;

#[derive(Debug, Error)]
pub enum LuasealError {
    #[error("master key error: {0}")]
    Key(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
