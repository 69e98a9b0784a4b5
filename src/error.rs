use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A catalog document could not be read from disk.
    #[error("failed to read {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A catalog document is not valid JSON or has an unexpected shape.
    #[error("failed to parse {}: {source}", path.display())]
    SourceParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// A single entry inside an otherwise valid document was rejected.
    #[error("rejected entry in {}: {reason}", path.display())]
    InvalidEntry { path: PathBuf, reason: String },
    #[error("unknown key {key:?} in combo {combo:?}")]
    InvalidKey { combo: String, key: String },
    #[error("empty combo {0:?}")]
    EmptyCombo(String),
    #[error("failed to inject {combo:?}: {source}")]
    Injection {
        combo: String,
        #[source]
        source: io::Error,
    },
    #[error("window query failed: {0}")]
    Window(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
