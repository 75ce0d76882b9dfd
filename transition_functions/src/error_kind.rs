use anyhow::Error as AnyhowError;
use helper_functions::error::Error as HelperError;
use parse_display::Display;

use crate::unphased::Error;

/// How far a failure should propagate.
///
/// Errors raised while processing an epoch abort the whole transition regardless of kind.
/// Block operations that fail with [`ErrorKind::Validation`] only invalidate the containing block.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
#[display(style = "snake_case")]
pub enum ErrorKind {
    /// The transition was aborted through [`crate::Cancellation`].
    Cancellation,
    /// The state accessor or committee resolver failed.
    StateAccess,
    /// An operation or attestation was rejected.
    Validation,
    /// The state or the code processing it is broken. These must never be ignored.
    InvariantViolation,
}

impl ErrorKind {
    /// Classifies an error by the type it was raised with.
    ///
    /// Errors from outside this crate and `helper_functions` come from accessor implementations.
    #[must_use]
    pub fn of(error: &AnyhowError) -> Self {
        if let Some(error) = error.downcast_ref::<Error>() {
            return error.kind();
        }

        if let Some(error) = error.downcast_ref::<HelperError>() {
            if error.is_invariant_violation() {
                return Self::InvariantViolation;
            }

            if matches!(error, HelperError::SlotOutOfRange { .. }) {
                return Self::StateAccess;
            }

            return Self::Validation;
        }

        Self::StateAccess
    }

    #[must_use]
    pub const fn is_fatal_to_transition(self) -> bool {
        !matches!(self, Self::Validation)
    }
}
