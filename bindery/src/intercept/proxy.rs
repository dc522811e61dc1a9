use std::marker::PhantomData;
use std::sync::Arc;

use crate::{Advice, InterceptorChain, InvocationError, Member};

/// A contract whose implementations can be wrapped in an intercepting proxy.
///
/// Implemented for `dyn Trait` by the `#[interceptable]` attribute, or by hand
/// for contracts whose proxy is written explicitly.
///
/// # Examples
///
/// A hand-written proxy:
///
/// ```rust
/// use std::sync::Arc;
/// use bindery::{
///     Advice, Arguments, Direction, Interceptable, InterceptorChain, Member, MemberKind,
///     Parameter, interceptor_fn, proxy,
/// };
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
///
/// struct FixedClock;
///
/// impl Clock for FixedClock {
///     fn now(&self) -> u64 {
///         42
///     }
/// }
///
/// static NOW: Member = Member::new("Clock", "now", MemberKind::Method, &[], Some("u64"));
///
/// struct ClockProxy {
///     target: Arc<dyn Clock>,
///     chain: Arc<InterceptorChain>,
/// }
///
/// impl Clock for ClockProxy {
///     fn now(&self) -> u64 {
///         let target = &self.target;
///         self.chain
///             .invoke(&NOW, Arguments::new(), &|_| Ok(Box::new(target.now())))
///             .and_then(|mut v| v.take_return_value())
///             .unwrap_or_else(|err| panic!("{}: {err}", NOW))
///     }
/// }
///
/// impl Interceptable for dyn Clock {
///     fn members() -> &'static [Member] {
///         std::slice::from_ref(&NOW)
///     }
///
///     fn proxy(target: Arc<Self>, chain: Arc<InterceptorChain>) -> Arc<Self> {
///         Arc::new(ClockProxy { target, chain })
///     }
/// }
///
/// let clock: Arc<dyn Clock> = proxy(
///     Arc::new(FixedClock) as Arc<dyn Clock>,
///     [Advice::new(interceptor_fn(|inv| {
///         inv.proceed()?;
///         let now = inv.take_return_value::<u64>()?;
///         inv.set_return_value(now + 1);
///         Ok(())
///     }))],
/// );
/// assert_eq!(clock.now(), 43);
/// ```
pub trait Interceptable: Send + Sync + 'static {
    /// Every member the proxy routes through the chain.
    fn members() -> &'static [Member];

    /// Wraps `target` so that every member call passes through `chain`.
    fn proxy(target: Arc<Self>, chain: Arc<InterceptorChain>) -> Arc<Self>;
}

/// Wraps `target` in a proxy applying `advice`.
///
/// Returns `target` unchanged when `advice` is empty.
pub fn proxy<T>(target: Arc<T>, advice: impl IntoIterator<Item = Advice>) -> Arc<T>
where
    T: Interceptable + ?Sized,
{
    let chain = InterceptorChain::new(advice);
    if chain.is_empty() {
        return target;
    }
    T::proxy(target, Arc::new(chain))
}

/// Turns a failed chain into the return value of a generated proxy method.
///
/// `(&ProxyFailure::<R>::new()).fail(..)` resolves to [`ReturnFailure`] when
/// `R` is a `Result` whose error converts from [`InvocationError`], and to
/// [`PanicFailure`] otherwise.
#[doc(hidden)]
pub struct ProxyFailure<R>(PhantomData<fn() -> R>);

impl<R> ProxyFailure<R> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<R> Default for ProxyFailure<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[doc(hidden)]
pub trait ReturnFailure {
    type Output;

    fn fail(&self, member: &Member, err: InvocationError) -> Self::Output;
}

impl<T, E> ReturnFailure for ProxyFailure<Result<T, E>>
where
    E: From<InvocationError>,
{
    type Output = Result<T, E>;

    fn fail(&self, _member: &Member, err: InvocationError) -> Self::Output {
        Err(E::from(err))
    }
}

#[doc(hidden)]
pub trait PanicFailure {
    type Output;

    fn fail(&self, member: &Member, err: InvocationError) -> Self::Output;
}

impl<R> PanicFailure for &ProxyFailure<R> {
    type Output = R;

    fn fail(&self, member: &Member, err: InvocationError) -> Self::Output {
        panic!("{member}: {err}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemberKind;

    static PARSE: Member = Member::new("Parser", "parse", MemberKind::Method, &[], Some("u32"));

    #[derive(Debug)]
    struct ParseError(String);

    impl From<InvocationError> for ParseError {
        fn from(err: InvocationError) -> Self {
            Self(err.to_string())
        }
    }

    fn denied() -> InvocationError {
        InvocationError::Interceptor("denied".into())
    }

    #[test]
    fn test_failure_converts_into_error() {
        let result = (&ProxyFailure::<Result<u32, ParseError>>::new()).fail(&PARSE, denied());
        assert_eq!(result.unwrap_err().0, "Interceptor failed: denied");
    }

    #[test]
    #[should_panic(expected = "Parser::parse: Interceptor failed: denied")]
    fn test_failure_panics_without_conversion() {
        let _: Result<u32, String> =
            (&ProxyFailure::<Result<u32, String>>::new()).fail(&PARSE, denied());
    }

    #[test]
    #[should_panic(expected = "Interceptor failed: denied")]
    fn test_failure_panics_for_plain_values() {
        let _: u32 = (&ProxyFailure::<u32>::new()).fail(&PARSE, denied());
    }
}
