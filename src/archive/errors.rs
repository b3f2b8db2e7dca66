//! Archive assembly error types
//!
//! Volume failures never reach this type; they are isolated per volume and
//! reported inside the archive. An `ArchiveError` means the sink itself
//! failed and the archive cannot be completed.

use std::fmt;
use std::io;

use zip::result::ZipError;

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The request failed; the service is healthy
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Archive error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveErrorCode {
    /// Writing to the output sink failed
    DataapiArchiveIo,
    /// The zip encoder rejected an entry or the directory
    DataapiArchiveEncoding,
}

impl ArchiveErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveErrorCode::DataapiArchiveIo => "DATAAPI_ARCHIVE_IO",
            ArchiveErrorCode::DataapiArchiveEncoding => "DATAAPI_ARCHIVE_ENCODING",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for ArchiveErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Archive error with context
#[derive(Debug)]
pub struct ArchiveError {
    code: ArchiveErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl ArchiveError {
    fn new(code: ArchiveErrorCode, message: impl Into<String>, source: Option<io::Error>) -> Self {
        Self {
            code,
            message: message.into(),
            source,
        }
    }

    /// Failure reported by the zip writer.
    ///
    /// I/O errors come from the sink; anything else means the encoder
    /// refused the archive, for example an entry over its size limit.
    pub fn zip_error(message: impl Into<String>, error: ZipError) -> Self {
        match error {
            ZipError::Io(source) => Self::new(ArchiveErrorCode::DataapiArchiveIo, message, Some(source)),
            other => Self::new(
                ArchiveErrorCode::DataapiArchiveEncoding,
                message,
                Some(io::Error::new(io::ErrorKind::InvalidData, other)),
            ),
        }
    }

    pub fn code(&self) -> ArchiveErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Underlying I/O error kind, if any
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        self.source.as_ref().map(|e| e.kind())
    }
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code,
            self.message
        )?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ArchiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;
