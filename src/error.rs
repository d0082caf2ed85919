use thiserror::Error;

/// Failures of the signature transform itself.
///
/// File and parsing problems are reported through `anyhow` with context;
/// this enum only covers conditions the caller may want to match on.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SignatureError {
    /// Every aligned intensity is zero, so there is nothing to normalize by.
    #[error("sample '{sample_id}' has no signal: maximum intensity is {max}")]
    ZeroSignal { sample_id: String, max: f64 },

    /// The reduced sample and the canonical grid were rounded differently.
    #[error("sample '{sample_id}' uses {sample_digits} mass digits but the grid uses {grid_digits}")]
    PrecisionMismatch {
        sample_id: String,
        sample_digits: u32,
        grid_digits: u32,
    },

    /// A NaN or infinite intensity was recorded.
    #[error("sample '{sample_id}' has a non-finite intensity at mass {mass}")]
    NonFiniteIntensity { sample_id: String, mass: f64 },

    /// A mass that cannot be rounded to an integer tick at this precision.
    #[error("sample '{sample_id}' has mass {mass} which cannot be rounded to {digits} digits")]
    MassOutOfRange {
        sample_id: String,
        mass: f64,
        digits: u32,
    },

    #[error("invalid mass grid: {0}")]
    InvalidGrid(String),
}
