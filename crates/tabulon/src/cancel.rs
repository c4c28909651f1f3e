//! Cooperative cancellation for populate passes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Token for cancelling a populate pass between keys.
///
/// Backed by an `AtomicBool`; clones are cheap and share state. The
/// materializer checks the token before each production callback, so
/// cancellation never interrupts a key mid-flight - and because a pass only
/// commits at the end, a cancelled pass leaves no staged rows behind.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A fresh, not-yet-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Has cancellation been requested?
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
