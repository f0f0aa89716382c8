use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinehuntError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to start {what}: {source}")]
    ResourceInit {
        what: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Line source error: {0}")]
    SourceRead(#[source] std::io::Error),
}

impl LinehuntError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn resource_init(what: impl Into<String>, source: std::io::Error) -> Self {
        Self::ResourceInit {
            what: what.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, LinehuntError>;
