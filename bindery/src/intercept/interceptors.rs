use std::time::Instant;

use tracing::Level;

use crate::{Interceptor, Invocation, InvocationError};

macro_rules! event_at {
    ($level:expr, $($arg:tt)+) => {{
        let level: Level = $level;
        if level == Level::TRACE {
            tracing::trace!($($arg)+)
        } else if level == Level::DEBUG {
            tracing::debug!($($arg)+)
        } else if level == Level::INFO {
            tracing::info!($($arg)+)
        } else if level == Level::WARN {
            tracing::warn!($($arg)+)
        } else {
            tracing::error!($($arg)+)
        }
    }};
}

/// Emits a tracing event before and after every intercepted call.
///
/// Failures of the rest of the chain are logged at `WARN` and returned
/// unchanged.
#[derive(Clone, Debug)]
pub struct LoggingInterceptor {
    level: Level,
}

impl LoggingInterceptor {
    pub fn new() -> Self {
        Self {
            level: Level::DEBUG,
        }
    }

    pub fn with_level(level: Level) -> Self {
        Self { level }
    }
}

impl Default for LoggingInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl Interceptor for LoggingInterceptor {
    fn intercept(&self, invocation: &mut Invocation<'_>) -> Result<(), InvocationError> {
        let member = invocation.member();
        let started = Instant::now();
        event_at!(
            self.level,
            member = %member,
            kind = ?member.kind(),
            arguments = invocation.arguments().len(),
            "Calling"
        );
        let result = invocation.proceed();
        let elapsed = started.elapsed();
        match &result {
            Ok(()) => {
                event_at!(self.level, member = %member, ?elapsed, "Returned");
            }
            Err(err) => tracing::warn!(member = %member, ?elapsed, "Call failed: {err}"),
        }
        result
    }
}

/// Interceptor built from a closure, see [`interceptor_fn`].
#[derive(Clone)]
pub struct FnInterceptor<F>(F);

impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(&mut Invocation<'_>) -> Result<(), InvocationError> + Send + Sync + 'static,
{
    fn intercept(&self, invocation: &mut Invocation<'_>) -> Result<(), InvocationError> {
        (self.0)(invocation)
    }
}

/// Creates an interceptor from a closure that decides whether to proceed.
pub fn interceptor_fn<F>(f: F) -> FnInterceptor<F>
where
    F: Fn(&mut Invocation<'_>) -> Result<(), InvocationError> + Send + Sync + 'static,
{
    FnInterceptor(f)
}

/// Interceptor running an action before proceeding, see [`intercept_before`].
#[derive(Clone)]
pub struct BeforeInterceptor<F>(F);

impl<F> Interceptor for BeforeInterceptor<F>
where
    F: Fn(&mut Invocation<'_>) + Send + Sync + 'static,
{
    fn intercept(&self, invocation: &mut Invocation<'_>) -> Result<(), InvocationError> {
        (self.0)(invocation);
        invocation.proceed()
    }
}

/// Runs `f` before every call; `f` may inspect or rewrite the arguments.
pub fn intercept_before<F>(f: F) -> BeforeInterceptor<F>
where
    F: Fn(&mut Invocation<'_>) + Send + Sync + 'static,
{
    BeforeInterceptor(f)
}

/// Interceptor running an action after a successful call, see [`intercept_after`].
#[derive(Clone)]
pub struct AfterInterceptor<F>(F);

impl<F> Interceptor for AfterInterceptor<F>
where
    F: Fn(&mut Invocation<'_>) + Send + Sync + 'static,
{
    fn intercept(&self, invocation: &mut Invocation<'_>) -> Result<(), InvocationError> {
        invocation.proceed()?;
        (self.0)(invocation);
        Ok(())
    }
}

/// Runs `f` after every successful call; `f` may inspect or replace the
/// return value and output arguments.
pub fn intercept_after<F>(f: F) -> AfterInterceptor<F>
where
    F: Fn(&mut Invocation<'_>) + Send + Sync + 'static,
{
    AfterInterceptor(f)
}

/// Interceptor answering calls without proceeding, see [`intercept_replace`].
#[derive(Clone)]
pub struct ReplaceInterceptor<F>(F);

impl<F, R> Interceptor for ReplaceInterceptor<F>
where
    F: Fn(&mut Invocation<'_>) -> Result<R, InvocationError> + Send + Sync + 'static,
    R: 'static,
{
    fn intercept(&self, invocation: &mut Invocation<'_>) -> Result<(), InvocationError> {
        let value = (self.0)(invocation)?;
        invocation.set_return_value(value);
        Ok(())
    }
}

/// Replaces the call: the rest of the chain and the target are skipped and
/// the value produced by `f` is returned.
///
/// Combine with [`Advice::only`](crate::Advice::only) so `R` matches the
/// return type of the selected members.
pub fn intercept_replace<F, R>(f: F) -> ReplaceInterceptor<F>
where
    F: Fn(&mut Invocation<'_>) -> Result<R, InvocationError> + Send + Sync + 'static,
    R: 'static,
{
    ReplaceInterceptor(f)
}
