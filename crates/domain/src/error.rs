/// Shared error type used across the resource node crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("reading {path}: {source}")]
    ConfigRead {
        path: String,
        source: std::io::Error,
    },

    #[error("parsing {path}: {source}")]
    ConfigParse {
        path: String,
        source: toml::de::Error,
    },

    #[error("missing or empty [{0}] section")]
    MissingSection(&'static str),

    #[error("no authentication token given in configuration file")]
    MissingAuthToken,

    #[error("invalid port {0:?}: must be a number between 1 and 65535")]
    InvalidPort(String),

    #[error("config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
