/// Convenience result type used across the crate.
pub type MixdownResult<T> = Result<T, MixdownError>;

/// Top-level error taxonomy used by the export APIs.
///
/// Cancellation is not represented here; see `ExportOutcome`.
#[derive(thiserror::Error, Debug)]
pub enum MixdownError {
    /// Invalid user-provided settings or timeline data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors raised by signal processing (resampling, render graph execution).
    #[error("processing error: {0}")]
    Processing(String),

    /// Failure decoding a single source into PCM.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Failure while encoding the final mix.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// None of the requested codecs is available to the encoder.
    #[error("no supported audio codec (tried {0})")]
    CodecUnavailable(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MixdownError {
    /// Build a [`MixdownError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`MixdownError::Processing`] value.
    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing(msg.into())
    }

    /// Build a [`MixdownError::Extraction`] value.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    /// Build a [`MixdownError::Encoding`] value.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Build a [`MixdownError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for the expected per-source decode failure.
    ///
    /// The pipeline substitutes silence for any extractor error; other variants are logged
    /// as errors rather than warnings.
    pub fn is_recoverable_per_clip(&self) -> bool {
        matches!(self, Self::Extraction(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
