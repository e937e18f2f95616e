//! Result type definition and extension traits.
//!
//! Provides combinators for Result types so call sites can handle errors
//! without unwrap/expect/panic.

use crate::error::Error;

/// The standard Result type for profiler operations.
///
/// All fallible operations in the workspace return this type.
///
/// # Examples
///
/// ```ignore
/// fn measure() -> Result<SampledRun> {
///     let config = ProfilerConfig::new(interval, trials)?;
///     Profiler::new(config).sample_resource_usage(&mut op)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait providing logging combinators for Results.
pub trait ResultExt<T> {
    /// Convert a Result to an Option, logging the error at debug level.
    ///
    /// Used where a failure is an expected end condition rather than a fault.
    fn into_option_traced(self, what: &str) -> Option<T>;

    /// Inspect the error without consuming the Result.
    fn inspect_error<F: FnOnce(&Error)>(self, f: F) -> Self;
}

impl<T> ResultExt<T> for Result<T> {
    fn into_option_traced(self, what: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("{what} stopped: {e}");
                None
            }
        }
    }

    fn inspect_error<F: FnOnce(&Error)>(self, f: F) -> Self {
        if let Err(ref e) = self {
            f(e);
        }
        self
    }
}
