use thiserror::Error;

pub type Result<T> = std::result::Result<T, FingerprintError>;

/// Errors raised by the analysis core and its audio collaborators.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// Malformed or zero-length analysis input, or an invalid configuration.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Wrong container, sample rate, channel count or bit depth.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// All-zero data that cannot be normalized.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// Capture device failure.
    #[cfg(feature = "capture")]
    #[error("audio device error: {0}")]
    Device(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FingerprintError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedFormat(message.into())
    }

    #[cfg(feature = "capture")]
    pub fn device(message: impl Into<String>) -> Self {
        Self::Device(message.into())
    }
}

#[cfg(feature = "capture")]
impl From<hound::Error> for FingerprintError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => FingerprintError::Io(e),
            other => FingerprintError::UnsupportedFormat(other.to_string()),
        }
    }
}

impl From<symphonia::core::errors::Error> for FingerprintError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        match err {
            symphonia::core::errors::Error::IoError(e) => FingerprintError::Io(e),
            other => FingerprintError::UnsupportedFormat(other.to_string()),
        }
    }
}

impl From<image::ImageError> for FingerprintError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => FingerprintError::Io(e),
            other => FingerprintError::Io(std::io::Error::other(other)),
        }
    }
}
