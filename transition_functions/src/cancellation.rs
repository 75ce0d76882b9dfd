use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::info;

use crate::unphased::Error;

/// A cooperative cancellation signal for long-running transitions.
///
/// Clones share the same flag. Transitions poll it at fixed points and never block on it.
#[derive(Clone, Default, Debug)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    /// A signal that is never raised unless [`Self::cancel`] is called on it.
    #[must_use]
    pub fn never() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            info!("state transition cancelled");
            bail!(Error::Cancelled);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() -> Result<()> {
        let cancellation = Cancellation::never();
        let clone = cancellation.clone();

        assert!(!clone.is_cancelled());
        cancellation.check()?;

        cancellation.cancel();

        assert!(clone.is_cancelled());

        let error = clone.check().expect_err("flag was raised");

        assert!(matches!(error.downcast_ref(), Some(Error::Cancelled)));

        Ok(())
    }
}
