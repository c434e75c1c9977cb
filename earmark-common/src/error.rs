//! Common error types for Earmark

use thiserror::Error;

/// Common result type for Earmark operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds shared across the recognition service
///
/// The streaming recognizer is the only component that maps these onto
/// terminal protocol states; lower layers just report the kind.
#[derive(Error, Debug)]
pub enum Error {
    /// Input PCM or audio file could not be interpreted
    #[error("Decode error: {0}")]
    Decode(String),

    /// Sample rate conversion failed
    #[error("Resample error: {0}")]
    Resample(String),

    /// The query produced zero spectral peaks (e.g. silence)
    ///
    /// Surfaced to clients as a "no match" outcome, never as an error.
    #[error("Fingerprint is empty: no spectral peaks above the noise floor")]
    EmptyFingerprint,

    /// Catalog read or write failed
    #[error("Catalog error: {0}")]
    Catalog(#[from] sqlx::Error),

    /// The client disappeared or the connection broke
    #[error("Transport error: {0}")]
    Transport(String),

    /// Idle or analysis-attempt timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a recognition session must terminate on this error.
    ///
    /// Decode/resample failures poison the sample stream; catalog and
    /// timeout errors inside a single analysis attempt only skip that
    /// attempt.
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(self, Error::Decode(_) | Error::Resample(_) | Error::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(Error::Decode("bad frame".into()).is_fatal_to_session());
        assert!(Error::Resample("ratio".into()).is_fatal_to_session());
        assert!(!Error::EmptyFingerprint.is_fatal_to_session());
        assert!(!Error::Timeout("attempt".into()).is_fatal_to_session());
    }
}
