use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use eyre::Report;

/// Failure conditions callers react to individually. Everything else in this crate is an
/// untyped [`eyre::Report`] that simply propagates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The request contradicts the cohort configuration: an unregistered variant kind, a
    /// merge kind that does not match the number of sources, an out-of-range sample
    /// index, or neoantigen derivation without HLA typing.
    InvalidArgument(String),
    /// A source file required for one sample is absent on disk. Fatal for the sample;
    /// cohort-level loads may downgrade it to a skip via [`OnMissing::Skip`].
    MissingData { sample: String, path: PathBuf },
}

impl LoadError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        LoadError::InvalidArgument(message.into())
    }

    pub fn missing_data(sample: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        LoadError::MissingData {
            sample: sample.into(),
            path: path.into(),
        }
    }
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::InvalidArgument(message) => write!(f, "Invalid argument: {message}"),
            LoadError::MissingData { sample, path } => write!(
                f,
                "Missing data for sample '{sample}': {}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for LoadError {}

pub(crate) fn is_missing_data(report: &Report) -> bool {
    matches!(
        report.downcast_ref::<LoadError>(),
        Some(LoadError::MissingData { .. })
    )
}

/// What a cohort-level bulk load does when one sample's source data is missing.
///
/// Historically, variant loading skipped such samples with a warning while neoantigen
/// derivation aborted the whole load; both loaders now take the policy explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnMissing {
    /// Warn, drop the sample from the result, and continue with the rest.
    Skip,
    /// Abort the whole load on the first missing sample.
    Fail,
}
