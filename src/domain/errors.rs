//! Error taxonomy of a cleanup run.

use super::attribute::Attribute;
use super::correction::CorrectionError;
use super::record_source::AccessError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CleanupError {
    /// Element lookup failures, timeouts and rejected UI actions.
    #[error("record source unavailable: {0}")]
    CollaboratorUnavailable(#[source] AccessError),

    #[error("could not parse {subject}: {detail}")]
    ParseFailure { subject: String, detail: String },

    #[error("corrected {attribute} would exceed the {limit}-character field")]
    LimitExceeded { attribute: Attribute, limit: usize },

    #[error("cancellation requested")]
    CancellationRequested,
}

pub type CleanupResult<T> = Result<T, CleanupError>;

impl CleanupError {
    /// Failures that abandon the current record and count towards the hiccup limit.
    #[must_use]
    pub const fn is_hiccup(&self) -> bool {
        matches!(
            self,
            Self::CollaboratorUnavailable(_) | Self::ParseFailure { .. }
        )
    }

    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::CancellationRequested)
    }

    /// Maps a corrector error for `attribute` into the run taxonomy.
    #[must_use]
    pub fn from_correction(attribute: Attribute, error: CorrectionError) -> Self {
        match error {
            CorrectionError::NotNumeric(value) => Self::ParseFailure {
                subject: attribute.label().to_string(),
                detail: format!("'{value}' is not numeric"),
            },
            CorrectionError::ExceedsLimit { limit, .. } => Self::LimitExceeded { attribute, limit },
        }
    }
}

impl From<AccessError> for CleanupError {
    fn from(error: AccessError) -> Self {
        match error {
            AccessError::Cancelled => Self::CancellationRequested,
            AccessError::Malformed { what, detail } => Self::ParseFailure {
                subject: what,
                detail,
            },
            other => Self::CollaboratorUnavailable(other),
        }
    }
}
