/// Failures while turning a configuration into a model.
///
/// These are returned inside `anyhow::Error`; use `downcast_ref` to
/// tell them apart from IO errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SetupError {
    /// an option that is not (or not yet) supported
    #[error("not implemented: {0}")]
    NotImplemented(String),
    /// a size that does not fit the chosen model, prior or data
    #[error("dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        found: usize,
    },
}

impl SetupError {
    pub fn not_implemented(what: impl Into<String>) -> Self {
        SetupError::NotImplemented(what.into())
    }

    pub fn dimension_mismatch(what: impl Into<String>, expected: usize, found: usize) -> Self {
        SetupError::DimensionMismatch {
            what: what.into(),
            expected,
            found,
        }
    }
}

/// Did `err` come from an unsupported option?
pub fn is_not_implemented(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<SetupError>(),
        Some(SetupError::NotImplemented(_))
    )
}
