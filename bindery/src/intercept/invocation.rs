use std::any::{Any, type_name};
use std::sync::Arc;

use crate::{Arguments, InvocationError, Member};

/// The real call at the end of an interceptor chain.
///
/// It consumes the argument slots it needs, writes back `Ref` and `Out`
/// slots, and returns the boxed return value.
pub type Target<'a> = dyn Fn(&mut Arguments) -> Result<Box<dyn Any>, InvocationError> + 'a;

/// A handler invoked around the calls of an intercepted contract.
///
/// An interceptor forwards the call with [`Invocation::proceed`]. Returning
/// without proceeding short-circuits the call; the interceptor must then set
/// a return value unless the member returns `()`.
///
/// # Examples
///
/// ```rust
/// use bindery::{Interceptor, Invocation, InvocationError};
///
/// struct Doubling;
///
/// impl Interceptor for Doubling {
///     fn intercept(&self, invocation: &mut Invocation<'_>) -> Result<(), InvocationError> {
///         invocation.proceed()?;
///         if let Some(value) = invocation.return_value_mut::<i32>() {
///             *value *= 2;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Interceptor: Send + Sync + 'static {
    fn intercept(&self, invocation: &mut Invocation<'_>) -> Result<(), InvocationError>;
}

impl<T> Interceptor for Arc<T>
where
    T: Interceptor + ?Sized,
{
    fn intercept(&self, invocation: &mut Invocation<'_>) -> Result<(), InvocationError> {
        T::intercept(self, invocation)
    }
}

/// One call travelling through an interceptor chain.
pub struct Invocation<'a> {
    member: &'static Member,
    arguments: Arguments,
    return_value: Option<Box<dyn Any>>,
    interceptors: &'a [Arc<dyn Interceptor>],
    index: usize,
    target: &'a Target<'a>,
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(
        member: &'static Member,
        arguments: Arguments,
        interceptors: &'a [Arc<dyn Interceptor>],
        target: &'a Target<'a>,
    ) -> Self {
        Self {
            member,
            arguments,
            return_value: None,
            interceptors,
            index: 0,
            target,
        }
    }

    pub fn member(&self) -> &'static Member {
        self.member
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    pub fn arguments_mut(&mut self) -> &mut Arguments {
        &mut self.arguments
    }

    /// Position of the current interceptor in the chain.
    pub fn depth(&self) -> usize {
        self.index
    }

    /// Calls the next interceptor, or the target once the chain is exhausted.
    ///
    /// May be called more than once; each call re-enters the rest of the
    /// chain. Targets consume their `In` slots, so repeating a call requires
    /// the interceptor to restore the arguments first.
    pub fn proceed(&mut self) -> Result<(), InvocationError> {
        let interceptors = self.interceptors;
        match interceptors.get(self.index) {
            Some(interceptor) => {
                self.index += 1;
                let result = interceptor.intercept(self);
                self.index -= 1;
                result
            }
            None => {
                let value = (self.target)(&mut self.arguments)?;
                self.return_value = Some(value);
                Ok(())
            }
        }
    }

    pub fn has_return_value(&self) -> bool {
        self.return_value.is_some()
    }

    pub fn return_value<T>(&self) -> Option<&T>
    where
        T: 'static,
    {
        self.return_value.as_ref()?.downcast_ref()
    }

    pub fn return_value_mut<T>(&mut self) -> Option<&mut T>
    where
        T: 'static,
    {
        self.return_value.as_mut()?.downcast_mut()
    }

    pub fn set_return_value<T>(&mut self, value: T)
    where
        T: 'static,
    {
        self.return_value = Some(Box::new(value));
    }

    /// Removes the return value so that a later `proceed` or
    /// `set_return_value` decides the result.
    pub fn take_return_value<T>(&mut self) -> Result<T, InvocationError>
    where
        T: 'static,
    {
        take_return(self.member, &mut self.return_value)
    }

    pub(crate) fn into_outcome(self, failure: Option<InvocationError>) -> Outcome {
        Outcome {
            member: self.member,
            arguments: self.arguments,
            return_value: self.return_value,
            failure,
        }
    }
}

/// Final state of an invocation.
///
/// The argument slots survive a failed chain, so proxies can restore the
/// caller's `Ref` arguments either way.
pub struct Outcome {
    member: &'static Member,
    arguments: Arguments,
    return_value: Option<Box<dyn Any>>,
    failure: Option<InvocationError>,
}

impl Outcome {
    pub fn member(&self) -> &'static Member {
        self.member
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Argument slots after the call, used to write back `Ref` and `Out` values.
    pub fn arguments_mut(&mut self) -> &mut Arguments {
        &mut self.arguments
    }

    /// The error that ended the chain, if any.
    pub fn failure(&self) -> Option<&InvocationError> {
        self.failure.as_ref()
    }

    pub fn take_failure(&mut self) -> Option<InvocationError> {
        self.failure.take()
    }

    pub fn take_return_value<T>(&mut self) -> Result<T, InvocationError>
    where
        T: 'static,
    {
        take_return(self.member, &mut self.return_value)
    }
}

fn take_return<T>(
    member: &Member,
    return_value: &mut Option<Box<dyn Any>>,
) -> Result<T, InvocationError>
where
    T: 'static,
{
    let value = return_value
        .take()
        .ok_or_else(|| InvocationError::MissingReturnValue {
            member: member.to_string(),
        })?;
    match value.downcast::<T>() {
        Ok(value) => Ok(*value),
        Err(value) => {
            *return_value = Some(value);
            Err(InvocationError::ReturnType {
                member: member.to_string(),
                expected: type_name::<T>(),
            })
        }
    }
}
