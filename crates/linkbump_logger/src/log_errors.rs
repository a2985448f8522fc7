use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("logger \"{0}\" is already initialized")]
    AlreadyInitialized(String),
    #[error("unknown log level \"{0}\"")]
    UnknownLevel(String),
    #[error("could not open file '{path}': {source}")]
    CouldNotOpenFile {
        path: String,
        source: std::io::Error,
    },
    #[error("could not write to file '{path}': {source}")]
    CouldNotWriteToFile {
        path: String,
        source: std::io::Error,
    },
}
