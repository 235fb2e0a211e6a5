//! Error Types
//!
//! Nothing that fails inside an effect, a resource fetcher or a lifecycle
//! callback is ever returned to the code that wrote the signal or disposed
//! the owner. Failures stop at the runtime boundary and are reported through
//! `tracing`. This module defines what gets reported.

use std::error::Error as StdError;
use std::fmt;
use std::rc::Rc;

/// Boxed user error carried out of effect callbacks and fetchers.
///
/// Not `Send`: the runtime never moves work across threads.
pub type BoxError = Box<dyn StdError + 'static>;

/// Errors raised by the reactive runtime itself.
#[derive(Debug, thiserror::Error)]
pub enum ReactiveError {
    /// An effect callback returned an error.
    #[error("effect {effect} failed: {source}")]
    EffectFailed {
        effect: String,
        #[source]
        source: BoxError,
    },

    /// An effect callback panicked.
    #[error("effect {effect} panicked: {message}")]
    EffectPanicked { effect: String, message: String },

    /// A mount or cleanup callback failed or panicked.
    #[error("{phase} callback failed: {message}")]
    CallbackFailed { phase: &'static str, message: String },

    /// Effects kept scheduling further effects past the configured limit.
    #[error("flush did not settle after {rounds} chained rounds; pending effects dropped")]
    FlushLimitExceeded { rounds: usize },

    /// A lifecycle hook was registered without an ambient owner.
    #[error("{hook} called outside of an owner scope")]
    NoOwner { hook: &'static str },

    /// A signal was written while its value was borrowed.
    #[error("signal {signal} written while its value is borrowed")]
    SignalBusy { signal: String },

    /// Runtime configuration could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for the runtime's fallible entry points.
pub type Result<T> = std::result::Result<T, ReactiveError>;

/// Return values accepted from effect callbacks and lifecycle callbacks.
///
/// Implemented for `()` and for `Result<(), E>` so that callbacks can use `?`.
pub trait EffectResult {
    /// Normalize into a `Result`.
    fn into_result(self) -> std::result::Result<(), BoxError>;
}

impl EffectResult for () {
    fn into_result(self) -> std::result::Result<(), BoxError> {
        Ok(())
    }
}

impl<E> EffectResult for std::result::Result<(), E>
where
    E: Into<BoxError>,
{
    fn into_result(self) -> std::result::Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

/// Cloneable error stored in a resource's state.
#[derive(Clone)]
pub struct FetchError(Rc<dyn StdError + 'static>);

impl FetchError {
    pub fn new(error: impl Into<BoxError>) -> Self {
        Self(Rc::from(error.into()))
    }

    /// Borrow the underlying error.
    pub fn inner(&self) -> &(dyn StdError + 'static) {
        &*self.0
    }
}

impl From<BoxError> for FetchError {
    fn from(error: BoxError) -> Self {
        Self(Rc::from(error))
    }
}

impl fmt::Debug for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FetchError").field(&self.0.to_string()).finish()
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Extract a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_is_ok() {
        assert!(().into_result().is_ok());
    }

    #[test]
    fn result_errors_are_boxed() {
        let failed: std::result::Result<(), String> = Err("boom".to_string());
        let err = failed.into_result().unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn fetch_error_clones_share_source() {
        let err = FetchError::new("timeout");
        let copy = err.clone();
        assert_eq!(copy.to_string(), "timeout");
        assert_eq!(format!("{err:?}"), "FetchError(\"timeout\")");
    }

    #[test]
    fn panic_messages_are_extracted() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static message");
        assert_eq!(panic_message(&*payload), "static message");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*payload), "owned");

        let payload: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(&*payload), "non-string panic payload");
    }
}
