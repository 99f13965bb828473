#![forbid(unsafe_code)]

use thiserror::Error;

/// Error raised by a state-changed callback. Returned to the `set_state`
/// caller as-is.
pub type CallbackError = Box<dyn std::error::Error>;

pub type Result<T> = std::result::Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("cannot apply state mixin: target is {found}, not a class")]
    NotConstructible { found: &'static str },

    #[error("class `{class}` has no method `{method}`")]
    MethodNotFound { class: String, method: String },

    #[error(transparent)]
    Callback(CallbackError),
}

impl StateError {
    /// Wrap a callback's own error without altering its message or source.
    #[must_use]
    pub fn callback(error: impl Into<CallbackError>) -> Self {
        Self::Callback(error.into())
    }

    /// The callback error, if this is one.
    #[must_use]
    pub fn as_callback(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Callback(error) => Some(error.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("listener rejected {0}")]
    struct Rejected(&'static str);

    #[test]
    fn callback_errors_display_transparently() {
        let err = StateError::callback(Rejected("x"));
        assert_eq!(err.to_string(), "listener rejected x");
        let inner = err.as_callback().expect("callback variant");
        assert!(inner.downcast_ref::<Rejected>().is_some());
    }

    #[test]
    fn string_callbacks_convert() {
        let err = StateError::callback("plain message");
        assert_eq!(err.to_string(), "plain message");
    }

    #[test]
    fn mixin_errors_name_the_target() {
        let err = StateError::NotConstructible { found: "number" };
        assert_eq!(
            err.to_string(),
            "cannot apply state mixin: target is number, not a class"
        );
        assert!(err.as_callback().is_none());

        let err = StateError::MethodNotFound {
            class: "Widget".into(),
            method: "getState".into(),
        };
        assert_eq!(err.to_string(), "class `Widget` has no method `getState`");
    }
}
