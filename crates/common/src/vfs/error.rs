/// Errors raised by the virtual file store and the sync protocol.
///
/// Tree mutations fail synchronously with one of the first four variants;
/// sync operations surface a single aggregated `RemoteFailure` or a
/// `ValidationFailure` for a manifest that does not pass recovery checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FsError {
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("remote failure: {0}")]
    RemoteFailure(String),
    #[error("validation failure: {0}")]
    ValidationFailure(String),
    #[error("archive error: {0}")]
    Archive(String),
}

impl From<zip::result::ZipError> for FsError {
    fn from(err: zip::result::ZipError) -> Self {
        FsError::Archive(err.to_string())
    }
}

impl From<std::io::Error> for FsError {
    fn from(err: std::io::Error) -> Self {
        FsError::Archive(err.to_string())
    }
}
