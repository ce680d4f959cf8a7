use thiserror::Error;

/// Everything a turn can fail with, one variant per category the shell
/// knows how to render.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{0}")]
    Syntax(String),
    #[error("{0}")]
    Name(String),
    #[error("{0}")]
    Runtime(String),
    #[error("{0}")]
    Unknown(String),
}

impl Error {
    pub fn syntax(msg: impl Into<String>) -> Self {
        Error::Syntax(msg.into())
    }

    pub fn name(msg: impl Into<String>) -> Self {
        Error::Name(msg.into())
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Error::Runtime(msg.into())
    }

    /// The prefix the shell prints in front of the message.
    pub fn label(&self) -> &'static str {
        match self {
            Error::Syntax(_) => "Syntax Error",
            Error::Name(_) => "Name Error",
            Error::Runtime(_) => "Runtime Error",
            Error::Unknown(_) => "Unknown error",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
