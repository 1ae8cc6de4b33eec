//! Error types for the sequence encoders.

/// Result type alias using [`EncoderError`].
pub type Result<T> = std::result::Result<T, EncoderError>;

/// Caller contract violations raised by the encoders and packing helpers.
///
/// None of these are transient: the call is abandoned and nothing is
/// returned. Out-of-range lengths are never clamped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncoderError {
    /// Arguments disagree on a dimension they must share.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A declared sequence length lies outside `[1, max_len]`.
    #[error("invalid length {length} for sequence {index}: expected a value in [1, {max_len}]")]
    InvalidLength {
        index: usize,
        length: usize,
        max_len: usize,
    },

    /// The encoder cannot be built with the requested configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl EncoderError {
    pub(crate) fn shape(message: impl Into<String>) -> Self {
        Self::ShapeMismatch(message.into())
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}
