use crate::ServiceKey;

/// Type alias for boxed errors that can be sent across threads.
///
/// This is the error type of user-supplied fallible code: plugins, services,
/// factories and activation hooks.
pub type StdError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while building an [`App`](crate::App).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A circular dependency was detected between plugins or services.
    #[error("Circular dependency detected")]
    CircularDependency,
    /// A required dependency is missing from the application.
    #[error("Missing dependency")]
    MissingDependency,
    /// An error occurred within a plugin during initialization.
    #[error("Plugin error: {0}")]
    PluginError(#[source] StdError),
}

impl From<StdError> for AppError {
    fn from(value: StdError) -> Self {
        Self::PluginError(value)
    }
}

/// Errors returned when a service cannot be resolved.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("No binding registered for {0}")]
    NotBound(ServiceKey),
    #[error("{count} bindings match {key}")]
    Ambiguous { key: ServiceKey, count: usize },
    #[error("Circular dependency: {}", format_path(.0))]
    Circular(Vec<ServiceKey>),
    #[error("{0} is scoped and no scope is active")]
    NoActiveScope(ServiceKey),
    #[error("Resolution of {key} exceeds the maximum depth of {max_depth}")]
    DepthExceeded { key: ServiceKey, max_depth: usize },
    #[error("Cannot activate {key}: {source}")]
    Activation {
        key: ServiceKey,
        #[source]
        source: StdError,
    },
}

impl ResolveError {
    /// Wraps an error raised while activating `key`.
    ///
    /// Errors that already are resolution errors are passed through, so the
    /// innermost failure reaches the caller unchanged.
    pub(crate) fn activation(key: &ServiceKey, err: StdError) -> Self {
        match err.downcast::<ResolveError>() {
            Ok(err) => *err,
            Err(source) => Self::Activation {
                key: key.clone(),
                source,
            },
        }
    }
}

fn format_path(path: &[ServiceKey]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Errors raised by an intercepted call.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error("Argument {index} is not set")]
    MissingArgument { index: usize },
    #[error("Argument {index} is not of type {expected}")]
    ArgumentType { index: usize, expected: &'static str },
    #[error("Argument index {index} is out of range")]
    ArgumentOutOfRange { index: usize },
    #[error("No return value was produced for {member}")]
    MissingReturnValue { member: String },
    #[error("Return value of {member} is not of type {expected}")]
    ReturnType {
        member: String,
        expected: &'static str,
    },
    #[error("Interceptor failed: {0}")]
    Interceptor(#[source] StdError),
}

impl From<StdError> for InvocationError {
    fn from(value: StdError) -> Self {
        Self::Interceptor(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_passes_resolve_errors_through() {
        let inner: StdError = Box::new(ResolveError::NotBound(ServiceKey::of::<u8>()));
        let err = ResolveError::activation(&ServiceKey::of::<u16>(), inner);
        assert!(matches!(err, ResolveError::NotBound(key) if key.is::<u8>()));

        let err = ResolveError::activation(&ServiceKey::of::<u16>(), "boom".into());
        assert!(matches!(err, ResolveError::Activation { key, .. } if key.is::<u16>()));
    }

    #[test]
    fn test_circular_display() {
        let err = ResolveError::Circular(vec![
            ServiceKey::of::<u8>(),
            ServiceKey::named::<u16>("x"),
            ServiceKey::of::<u8>(),
        ]);
        assert_eq!(
            err.to_string(),
            "Circular dependency: u8 -> u16(\"x\") -> u8"
        );
    }
}
