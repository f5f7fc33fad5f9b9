use thiserror::Error;

use crate::domain::ModelKind;

/// Crate-wide error type.
///
/// Each variant maps to a process exit code so the binary can stay a thin
/// wrapper around [`crate::app::run`].
#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// Invalid arguments or parameters.
    #[error("{0}")]
    Config(String),

    /// File read/write failure.
    #[error("{0}")]
    Io(String),

    /// The provider returned no rows (or a gapped series) for the request.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// Network, HTTP or decoding failure while talking to the provider.
    #[error("provider error: {0}")]
    Provider(String),

    /// A single model could not be fitted. Never fatal inside the model bank.
    #[error("{} fit failed: {reason}", model.display_name())]
    ModelFit { model: ModelKind, reason: String },

    #[error("split invariant violated: train={train} + test={test} != n={total}")]
    SplitInvariant { train: usize, test: usize, total: usize },

    /// A statistical test or decomposition could not be computed.
    #[error("statistics error: {0}")]
    Stats(String),
}

impl AppError {
    pub fn model_fit(model: ModelKind, reason: impl Into<String>) -> Self {
        AppError::ModelFit {
            model,
            reason: reason.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) | AppError::Io(_) => 2,
            AppError::DataUnavailable(_) => 3,
            AppError::Provider(_) | AppError::ModelFit { .. } | AppError::Stats(_) => 4,
            AppError::SplitInvariant { .. } => 5,
        }
    }
}
