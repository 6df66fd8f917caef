use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authentication,
    Transport,
    ResponseShape,
    UnsupportedMethod,
    Configuration,
    /// The operation is not allowed in the connector's current state.
    InvalidState,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Transport => "transport",
            ErrorKind::ResponseShape => "response_shape",
            ErrorKind::UnsupportedMethod => "unsupported_method",
            ErrorKind::Configuration => "configuration",
            ErrorKind::InvalidState => "invalid_state",
        };
        f.write_str(name)
    }
}

/// The single error type surfaced by connectors and the launcher.
///
/// The message is what callers display; the kind is what they branch on.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct GatewayError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

impl GatewayError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    pub fn response_shape(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResponseShape, message)
    }

    pub fn unsupported_method(identifier: &str) -> Self {
        Self::new(
            ErrorKind::UnsupportedMethod,
            format!("Unsupported payment method: {identifier}"),
        )
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidState, message)
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Prefixes the message with stage context. The kind is preserved and
    /// the original error becomes the source.
    pub fn wrap(self, prefix: &str) -> Self {
        Self {
            kind: self.kind,
            message: format!("{prefix}: {}", self.message),
            source: Some(Box::new(self)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Messages of every error in the source chain, outermost first.
    pub fn chain(&self) -> Vec<String> {
        let mut messages = vec![self.message.clone()];
        let mut current = StdError::source(self);
        while let Some(err) = current {
            messages.push(err.to_string());
            current = err.source();
        }
        messages
    }
}
