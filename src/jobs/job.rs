//! # Job identity.
//!
//! The runtime treats a job as an opaque value handed to the executor.
//! The only thing it needs is a textual id for events and logs.

use std::borrow::Cow;

/// # Opaque unit of work.
///
/// ```
/// use std::borrow::Cow;
/// use daemonvisor::Job;
///
/// struct Invoice { number: u32 }
///
/// impl Job for Invoice {
///     fn id(&self) -> Cow<'_, str> {
///         Cow::Owned(format!("invoice-{}", self.number))
///     }
/// }
///
/// assert_eq!(Invoice { number: 7 }.id(), "invoice-7");
/// ```
pub trait Job: Send + 'static {
    /// Returns a human-readable id for this job.
    fn id(&self) -> Cow<'_, str>;
}

impl Job for String {
    fn id(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl Job for &'static str {
    fn id(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

macro_rules! impl_job_for_int {
    ($($t:ty),*) => {
        $(
            impl Job for $t {
                fn id(&self) -> Cow<'_, str> {
                    Cow::Owned(self.to_string())
                }
            }
        )*
    };
}

impl_job_for_int!(u32, u64, usize, i32, i64);
