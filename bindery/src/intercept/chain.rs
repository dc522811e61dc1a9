use std::sync::Arc;

use dashmap::DashMap;

use crate::{
    Arguments, Interceptor, Invocation, InvocationError, Member, MemberKind, Outcome, Target,
};

type Selector = Arc<dyn Fn(&Member) -> bool + Send + Sync>;

/// An interceptor together with where and in which order it applies.
///
/// Advice with a lower `order` runs first (further from the target); advice
/// with equal order keeps registration order. Without a selector the advice
/// applies to every member.
#[derive(Clone)]
pub struct Advice {
    interceptor: Arc<dyn Interceptor>,
    order: i32,
    selector: Option<Selector>,
}

impl Advice {
    pub fn new<I>(interceptor: I) -> Self
    where
        I: Interceptor,
    {
        Self::from_arc(Arc::new(interceptor))
    }

    pub fn from_arc(interceptor: Arc<dyn Interceptor>) -> Self {
        Self {
            interceptor,
            order: 0,
            selector: None,
        }
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Restricts the advice to members accepted by `predicate`.
    ///
    /// Successive restrictions must all accept a member.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Member) -> bool + Send + Sync + 'static,
    {
        self.selector = Some(match self.selector.take() {
            Some(previous) => Arc::new(move |m: &Member| previous(m) && predicate(m)) as Selector,
            None => Arc::new(predicate) as Selector,
        });
        self
    }

    /// Restricts the advice to the members called `names`.
    pub fn only<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        self.when(move |m| names.iter().any(|n| n == m.name()))
    }

    /// Restricts the advice to members of the given kinds.
    pub fn kinds<I>(self, kinds: I) -> Self
    where
        I: IntoIterator<Item = MemberKind>,
    {
        let kinds: Vec<MemberKind> = kinds.into_iter().collect();
        self.when(move |m| kinds.contains(&m.kind()))
    }

    pub fn applies_to(&self, member: &Member) -> bool {
        self.selector.as_ref().is_none_or(|s| s(member))
    }
}

impl<I> From<I> for Advice
where
    I: Interceptor,
{
    fn from(value: I) -> Self {
        Self::new(value)
    }
}

/// Ordered advice shared by every call of one proxy.
pub struct InterceptorChain {
    advice: Vec<Advice>,
    resolved: DashMap<(&'static str, &'static str), Arc<[Arc<dyn Interceptor>]>>,
}

impl InterceptorChain {
    pub fn new<I>(advice: I) -> Self
    where
        I: IntoIterator<Item = Advice>,
    {
        let mut advice: Vec<Advice> = advice.into_iter().collect();
        advice.sort_by_key(|v| v.order);
        Self {
            advice,
            resolved: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.advice.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advice.is_empty()
    }

    /// Interceptors applying to `member`, outermost first.
    pub fn interceptors(&self, member: &Member) -> Arc<[Arc<dyn Interceptor>]> {
        if let Some(v) = self.resolved.get(&member.id()) {
            return v.clone();
        }
        let interceptors: Arc<[Arc<dyn Interceptor>]> = self
            .advice
            .iter()
            .filter(|v| v.applies_to(member))
            .map(|v| v.interceptor.clone())
            .collect();
        self.resolved
            .entry(member.id())
            .or_insert(interceptors)
            .clone()
    }

    /// Runs `member` through the chain, ending in `target`.
    pub fn invoke(
        &self,
        member: &'static Member,
        arguments: Arguments,
        target: &Target<'_>,
    ) -> Result<Outcome, InvocationError> {
        let mut outcome = self.execute(member, arguments, target);
        match outcome.take_failure() {
            Some(err) => Err(err),
            None => Ok(outcome),
        }
    }

    /// Runs `member` through the chain and returns the outcome even when the
    /// chain fails.
    pub fn execute(
        &self,
        member: &'static Member,
        arguments: Arguments,
        target: &Target<'_>,
    ) -> Outcome {
        let interceptors = self.interceptors(member);
        tracing::trace!(
            member = %member,
            interceptors = interceptors.len(),
            "Invoking intercepted member"
        );
        let mut invocation = Invocation::new(member, arguments, &interceptors, target);
        let failure = invocation.proceed().err();
        if let Some(err) = &failure {
            tracing::debug!(member = %member, error = %err, "Intercepted call failed");
        }
        invocation.into_outcome(failure)
    }
}
