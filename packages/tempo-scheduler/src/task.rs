use crate::error::TaskError;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// A queued unit of work. Plain closures are wrapped to always succeed.
pub(crate) type Job = Box<dyn FnOnce() -> Result<(), TaskError>>;

/// Runs `f`, turning a panic into [`TaskError::Panicked`].
pub(crate) fn guarded<F>(f: F) -> Result<(), TaskError>
where
    F: FnOnce() -> Result<(), TaskError>,
{
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
