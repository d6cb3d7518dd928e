use thiserror::Error;

/// Class name the host runtime gives to reflective invocation wrappers.
pub const INVOCATION_WRAPPER: &str = "InvocationTargetException";

/// An exception raised by an external SDK call.
///
/// Only the class name, message and one level of cause are kept; that is all
/// the bridge ever reports.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{}", self.reason())]
pub struct SdkFault {
    class: String,
    message: Option<String>,
    cause: Option<Box<SdkFault>>,
}

impl SdkFault {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: None,
            cause: None,
        }
    }

    pub fn with_message(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: Some(message.into()),
            cause: None,
        }
    }

    pub fn caused_by(mut self, cause: SdkFault) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Reflective-call wrapper around `cause`.
    pub fn invocation_wrapper(cause: SdkFault) -> Self {
        Self::new(INVOCATION_WRAPPER).caused_by(cause)
    }

    /// Raised when every candidate signature for `operation` is exhausted.
    pub fn no_such_method(operation: &str) -> Self {
        Self::with_message(
            "NoSuchMethodException",
            format!("No compatible {operation} signature"),
        )
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn cause(&self) -> Option<&SdkFault> {
        self.cause.as_deref()
    }

    /// Unwrap one level: a wrapper's cause wins, then any cause, then self.
    pub fn root_cause(&self) -> &SdkFault {
        match self.cause.as_deref() {
            Some(cause) => cause,
            None => self,
        }
    }

    /// Owned variant of [`SdkFault::root_cause`].
    pub fn into_root_cause(self) -> SdkFault {
        match self.cause {
            Some(cause) => *cause,
            None => self,
        }
    }

    /// `ClassName:message`; a missing message renders as `null`.
    pub fn reason(&self) -> String {
        format!("{}:{}", self.class, self.message.as_deref().unwrap_or("null"))
    }
}
