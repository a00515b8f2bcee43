/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the dispatcher
/// can handle failures consistently (user-facing reply vs logged detail).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    /// Bad or missing command arguments. The message is shown to the user
    /// verbatim and is never logged as an error.
    #[error("{0}")]
    Validation(String),

    /// The engine has no container with this name.
    #[error("container '{name}' not found")]
    NotFound { name: String },

    #[error("engine error: {0}")]
    Engine(String),

    #[error("compose error: {0}")]
    Compose(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
