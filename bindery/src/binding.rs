use std::any::Any;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    Advice, Context, Injectable, Interceptable, InterceptorChain, Lifetime, Request, ServiceKey,
    StdError,
};

/// Type-erased resolved instance: an `Arc<T>` behind `dyn Any`.
pub type Instance = Arc<dyn Any + Send + Sync>;

type Factory<T> = Arc<dyn Fn(&Context<'_>) -> Result<Arc<T>, StdError> + Send + Sync>;
type ActivationHook<T> = Box<dyn Fn(&Context<'_>, &Arc<T>) -> Result<(), StdError> + Send + Sync>;
type DeactivationHook<T> = Box<dyn Fn(&Arc<T>) + Send + Sync>;
type ProxyFn<T> = fn(Arc<T>, Arc<InterceptorChain>) -> Arc<T>;
type Condition = Box<dyn Fn(&Request<'_>) -> bool + Send + Sync>;
type Activator = Box<dyn Fn(&Context<'_>) -> Result<Instance, StdError> + Send + Sync>;
type Deactivator = Box<dyn Fn(&Instance) + Send + Sync>;

static NEXT_BINDING_ID: AtomicUsize = AtomicUsize::new(0);

/// Free-form key/value pairs attached to a binding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    values: BTreeMap<String, String>,
}

impl Metadata {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert(&mut self, key: String, value: String) {
        self.values.insert(key, value);
    }
}

/// A registration being declared.
///
/// A `Bind` names where instances of `T` come from, how long they live and
/// which advice wraps them. It is handed to
/// [`AppBuilder::add_binding`](crate::AppBuilder::add_binding).
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use bindery::{App, Bind, Resolver};
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
///
/// impl Greeter for English {
///     fn greet(&self) -> String {
///         "Hello".into()
///     }
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// let app = App::builder()
///     .add_binding(
///         Bind::<dyn Greeter>::to_factory(|_| Ok(Arc::new(English) as Arc<dyn Greeter>))
///             .singleton(),
///     )
///     .build()
///     .await?;
///
/// assert_eq!(app.get::<dyn Greeter>()?.greet(), "Hello");
/// # Ok(())
/// # }
/// ```
pub struct Bind<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    name: Option<Cow<'static, str>>,
    lifetime: Option<Lifetime>,
    factory: Factory<T>,
    condition: Option<Condition>,
    metadata: Metadata,
    activation: Vec<ActivationHook<T>>,
    deactivation: Vec<DeactivationHook<T>>,
    advice: Vec<Advice>,
    proxy: Option<ProxyFn<T>>,
}

impl<T> Bind<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    /// Binds `T` to instances produced by `factory`.
    pub fn to_factory<F>(factory: F) -> Self
    where
        F: Fn(&Context<'_>) -> Result<Arc<T>, StdError> + Send + Sync + 'static,
    {
        Self {
            name: None,
            lifetime: None,
            factory: Arc::new(factory),
            condition: None,
            metadata: Metadata::default(),
            activation: Vec::new(),
            deactivation: Vec::new(),
            advice: Vec::new(),
            proxy: None,
        }
    }

    /// Binds `T` to an existing instance. Constants are singletons.
    pub fn to_constant(value: Arc<T>) -> Self {
        Self::to_factory(move |_| Ok(value.clone())).singleton()
    }

    /// Binds `T` to the injectable implementation `U`, converted by `cast`.
    ///
    /// `cast` is usually an unsizing coercion such as
    /// `|v| v as Arc<dyn Greeter>`.
    pub fn to<U, C>(cast: C) -> Self
    where
        U: Injectable,
        C: Fn(Arc<U>) -> Arc<T> + Send + Sync + 'static,
    {
        Self::to_factory(move |ctx| Ok(cast(Arc::new(U::inject(ctx)?))))
    }

    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    pub fn transient(self) -> Self {
        self.with_lifetime(Lifetime::Transient)
    }

    pub fn singleton(self) -> Self {
        self.with_lifetime(Lifetime::Singleton)
    }

    pub fn scoped(self) -> Self {
        self.with_lifetime(Lifetime::Scoped)
    }

    pub fn per_thread(self) -> Self {
        self.with_lifetime(Lifetime::Thread)
    }

    /// Makes the binding apply only to requests accepted by `condition`.
    ///
    /// A matching conditional binding takes precedence over unconditional
    /// bindings of the same key.
    pub fn when<F>(mut self, condition: F) -> Self
    where
        F: Fn(&Request<'_>) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Box::new(condition));
        self
    }

    /// Applies only when `T` is requested while activating a `P`.
    pub fn when_injected_into<P>(self) -> Self
    where
        P: ?Sized + 'static,
    {
        self.when(|request| request.parent().is_some_and(|p| p.is::<P>()))
    }

    /// Applies only to requests made directly on the app or a scope.
    pub fn when_root(self) -> Self {
        self.when(|request| request.is_root())
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Runs `hook` on every newly created instance, before it is cached or
    /// wrapped in a proxy.
    pub fn on_activation<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Context<'_>, &Arc<T>) -> Result<(), StdError> + Send + Sync + 'static,
    {
        self.activation.push(Box::new(hook));
        self
    }

    /// Runs `hook` when a cached instance is released: on app drop for
    /// singletons and per-thread instances, on scope drop for scoped ones.
    pub fn on_deactivation<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Arc<T>) + Send + Sync + 'static,
    {
        self.deactivation.push(Box::new(hook));
        self
    }

    pub fn key(&self) -> ServiceKey {
        ServiceKey::of::<T>().with_name(self.name.clone())
    }

    pub(crate) fn into_binding(self) -> Binding {
        let key = self.key();
        let factory = self.factory;
        let activation = self.activation;
        let deactivation = self.deactivation;
        let proxy = match self.proxy {
            Some(proxy) if !self.advice.is_empty() => {
                Some((proxy, Arc::new(InterceptorChain::new(self.advice))))
            }
            _ => None,
        };
        let activator: Activator = Box::new(move |ctx| {
            let mut instance = factory(ctx)?;
            for hook in &activation {
                hook(ctx, &instance)?;
            }
            if let Some((proxy, chain)) = &proxy {
                instance = proxy(instance, chain.clone());
            }
            Ok(Arc::new(instance) as Instance)
        });
        let deactivator: Option<Deactivator> = if deactivation.is_empty() {
            None
        } else {
            Some(Box::new(move |instance: &Instance| {
                if let Some(instance) = instance.downcast_ref::<Arc<T>>() {
                    for hook in &deactivation {
                        hook(instance);
                    }
                }
            }))
        };
        Binding {
            id: NEXT_BINDING_ID.fetch_add(1, Ordering::Relaxed),
            key,
            lifetime: self.lifetime,
            activator,
            condition: self.condition,
            metadata: self.metadata,
            deactivator,
        }
    }
}

impl<T> Bind<T>
where
    T: Injectable,
{
    /// Binds `T` to itself, built by its [`Injectable`] implementation.
    pub fn to_self() -> Self {
        Self::to_factory(|ctx| Ok(Arc::new(T::inject(ctx)?)))
    }
}

impl<T> Bind<T>
where
    T: Interceptable + ?Sized + Send + Sync + 'static,
{
    /// Wraps every instance in a proxy routing calls through `interceptor`.
    pub fn intercept_with<I>(self, interceptor: I) -> Self
    where
        I: crate::Interceptor,
    {
        self.intercept(Advice::new(interceptor))
    }

    /// Wraps every instance in a proxy applying `advice`.
    ///
    /// All advice of one binding shares a single chain.
    pub fn intercept(mut self, advice: Advice) -> Self {
        self.advice.push(advice);
        self.proxy = Some(T::proxy);
        self
    }
}

/// A registration with its type erased, as stored by the app.
pub(crate) struct Binding {
    pub(crate) id: usize,
    pub(crate) key: ServiceKey,
    pub(crate) lifetime: Option<Lifetime>,
    pub(crate) activator: Activator,
    pub(crate) condition: Option<Condition>,
    pub(crate) metadata: Metadata,
    deactivator: Option<Deactivator>,
}

impl Binding {
    pub(crate) fn lifetime(&self) -> Lifetime {
        self.lifetime.unwrap_or_default()
    }

    pub(crate) fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }

    pub(crate) fn accepts(&self, request: &Request<'_>) -> bool {
        self.condition.as_ref().is_none_or(|c| c(request))
    }

    pub(crate) fn deactivate(&self, instance: &Instance) {
        if let Some(deactivator) = &self.deactivator {
            tracing::trace!(service = %self.key, "Deactivating instance");
            deactivator(instance);
        }
    }
}
