use std::fmt;
use std::str::FromStr;

/// Policy governing how long a resolved instance is reused.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// A new instance for every request. Never cached, never deactivated.
    #[default]
    Transient,
    /// One instance per [`App`](crate::App), deactivated when the app is dropped.
    Singleton,
    /// One instance per [`Scope`](crate::Scope), deactivated when the scope is dropped.
    Scoped,
    /// One instance per app and OS thread, deactivated when the app is dropped.
    Thread,
}

impl Lifetime {
    pub fn is_cached(self) -> bool {
        !matches!(self, Lifetime::Transient)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Lifetime::Transient => "transient",
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
            Lifetime::Thread => "thread",
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lifetime {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "transient" => Ok(Lifetime::Transient),
            "singleton" => Ok(Lifetime::Singleton),
            "scoped" => Ok(Lifetime::Scoped),
            "thread" => Ok(Lifetime::Thread),
            _ => Err(ParseSettingError {
                kind: "lifetime",
                value: s.to_owned(),
            }),
        }
    }
}

/// What to do when a [`Lifetime::Scoped`] binding is requested outside a scope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScopedFallback {
    /// Fail with [`ResolveError::NoActiveScope`](crate::ResolveError::NoActiveScope).
    #[default]
    Error,
    /// Create a fresh instance as if the binding were transient.
    Transient,
}

impl ScopedFallback {
    pub fn as_str(self) -> &'static str {
        match self {
            ScopedFallback::Error => "error",
            ScopedFallback::Transient => "transient",
        }
    }
}

impl fmt::Display for ScopedFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScopedFallback {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(ScopedFallback::Error),
            "transient" => Ok(ScopedFallback::Transient),
            _ => Err(ParseSettingError {
                kind: "scoped fallback",
                value: s.to_owned(),
            }),
        }
    }
}

/// Unknown [`Lifetime`] or [`ScopedFallback`] name.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown {kind}: {value:?}")]
pub struct ParseSettingError {
    kind: &'static str,
    value: String,
}

/// Container-wide settings applied by [`AppBuilder::with_settings`](crate::AppBuilder::with_settings).
#[derive(Clone, Debug)]
pub struct Settings {
    /// Lifetime of bindings that do not pick one explicitly.
    pub default_lifetime: Lifetime,
    pub scoped_fallback: ScopedFallback,
    /// Maximum nesting of dependency requests.
    pub max_depth: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_lifetime: Lifetime::Transient,
            scoped_fallback: ScopedFallback::Error,
            max_depth: 64,
        }
    }
}
