//! Scoped signal blocking.

use nix::sys::signal::{SigSet, SigmaskHow, sigprocmask};
use tracing::warn;

use crate::error::SignalError;

/// Signals blocked for the lifetime of this value.
///
/// On drop the mask in effect before [`block`](Self::block) is restored with
/// `SIG_SETMASK`, so signals that were already blocked stay blocked.
#[derive(Debug)]
pub struct BlockedSignals {
    previous: SigSet,
}

impl BlockedSignals {
    /// Add `set` to the calling thread's signal mask.
    ///
    /// # Errors
    /// Returns [`SignalError::Block`] if `sigprocmask` fails.
    pub fn block(set: &SigSet) -> Result<Self, SignalError> {
        let mut previous = SigSet::empty();
        sigprocmask(SigmaskHow::SIG_BLOCK, Some(set), Some(&mut previous))
            .map_err(SignalError::Block)?;
        Ok(Self { previous })
    }

    /// Mask that will be restored on drop.
    #[must_use]
    pub const fn previous(&self) -> &SigSet {
        &self.previous
    }
}

impl Drop for BlockedSignals {
    fn drop(&mut self) {
        if let Err(errno) = sigprocmask(SigmaskHow::SIG_SETMASK, Some(&self.previous), None) {
            warn!(%errno, "failed to restore signal mask");
        }
    }
}
