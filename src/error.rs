//! Error types for network construction and simulation setup.
//!
//! Every variant is a configuration problem detected before the first time
//! step; the step loop itself never fails.

/// Errors reported while building a network, an input schedule or a
/// learning task, or while loading their configuration files.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("weight matrix must be square, got {rows}x{cols}")]
    NonSquareWeights { rows: usize, cols: usize },

    #[error("{what}: expected length {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("cell index {index} out of range for a network of {n_cells} cells")]
    CellIndexOutOfRange { index: usize, n_cells: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("failed to read or write configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;

/// Returns an `InvalidParameter` error unless `value` is finite and strictly
/// positive.
pub(crate) fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidParameter(format!(
            "{name} must be finite and > 0, got {value}"
        )))
    }
}
