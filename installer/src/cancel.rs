//! Cooperative cancellation for install runs.
//!
//! The binary wires a Ctrl-C handler to a [`CancelFlag`]; the pipeline
//! checks it between stages and the fetcher checks it between chunks.
//! Cancellation takes the same cleanup path as a failure.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared, clonable cancellation flag.
///
/// # Examples
///
/// ```
/// use pour::cancel::CancelFlag;
///
/// let flag = CancelFlag::new();
/// let handle = flag.clone();
/// handle.cancel();
/// assert!(flag.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a flag in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Create a flag that is set when the process receives Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns the `ctrlc` error if a handler is already installed or the
    /// signal cannot be hooked.
    pub fn from_ctrlc() -> Result<Self, ctrlc::Error> {
        let flag = Self::new();
        let handle = flag.clone();
        ctrlc::set_handler(move || handle.cancel())?;
        Ok(flag)
    }
}
