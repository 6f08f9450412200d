/// Errors raised while encoding an archive.
#[derive(Debug, thiserror::Error)]
pub enum ZipError {
    #[error("entry path must not be empty")]
    EmptyPath,

    #[error("entry path is {0} bytes, the limit is 65535")]
    PathTooLong(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
