use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArcadeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not serialise config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// `--game` or `start_game` named a cabinet the registry does not have.
    #[error("unknown game '{0}' (try --list)")]
    UnknownGame(String),
}

pub type Result<T> = std::result::Result<T, ArcadeError>;
