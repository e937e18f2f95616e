//! The unit of work the harness measures.

use opprof_core::Result;

/// A repeatable, side-effecting unit of work.
///
/// The harness invokes an operation exactly once per trial and never looks at
/// what it computes. Implementations must tolerate being invoked many times.
///
/// Closures returning `Result<()>` implement this trait directly:
///
/// ```
/// # use opprof_profiler::{Operation, Result};
/// let mut count = 0;
/// let mut op = || -> Result<()> {
///     count += 1;
///     Ok(())
/// };
/// assert!(op.invoke().is_ok());
/// ```
pub trait Operation {
    /// Run the operation once.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying work fails. The harness propagates
    /// it without retrying.
    fn invoke(&mut self) -> Result<()>;
}

impl<F> Operation for F
where
    F: FnMut() -> Result<()>,
{
    #[inline]
    fn invoke(&mut self) -> Result<()> {
        self()
    }
}
