//! Resolution of bindings into instances.

use std::cell::RefCell;
use std::mem::take;
use std::ptr;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::thread::{self, ThreadId};

use dashmap::DashMap;
use once_cell::sync::OnceCell;

use crate::binding::Binding;
use crate::{App, Instance, Lifetime, Metadata, ResolveError, ScopedFallback, ServiceKey};

/// Describes a request for a service, as seen by binding conditions.
#[derive(Clone, Copy, Debug)]
pub struct Request<'a> {
    service: &'a ServiceKey,
    parent: Option<&'a ServiceKey>,
    depth: usize,
}

impl<'a> Request<'a> {
    /// The requested service.
    pub fn service(&self) -> &'a ServiceKey {
        self.service
    }

    /// The service whose activation issued this request, if any.
    pub fn parent(&self) -> Option<&'a ServiceKey> {
        self.parent
    }

    /// Number of activations enclosing this request.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Activation context handed to factories and activation hooks.
///
/// Resolving through a context records the activation path, which enables
/// circular-dependency detection and [`Bind::when_injected_into`](crate::Bind::when_injected_into).
pub struct Context<'a> {
    app: &'a App,
    scope: Option<&'a InstanceCache>,
    parent: Option<&'a Context<'a>>,
    binding: &'a Binding,
    depth: usize,
}

impl<'a> Context<'a> {
    /// The request being served by this activation.
    pub fn request(&self) -> Request<'a> {
        Request {
            service: &self.binding.key,
            parent: self.parent.map(|p| &p.binding.key),
            depth: self.depth,
        }
    }

    /// Metadata of the binding being activated.
    pub fn metadata(&self) -> &'a Metadata {
        &self.binding.metadata
    }

    pub fn get_component<T>(&self) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.app.get_component()
    }

    pub fn get_component_ref<T>(&self) -> Option<&'a T>
    where
        T: Send + Sync + 'static,
    {
        self.app.get_component_ref()
    }

    /// Returns `true` when the activation happens inside a [`Scope`](crate::Scope).
    pub fn in_scope(&self) -> bool {
        self.scope.is_some()
    }
}

/// Where a resolution starts: the app, a scope or an enclosing activation.
#[doc(hidden)]
pub struct Origin<'a> {
    app: &'a App,
    scope: Option<&'a InstanceCache>,
    parent: Option<&'a Context<'a>>,
}

impl<'a> Origin<'a> {
    pub(crate) fn new(
        app: &'a App,
        scope: Option<&'a InstanceCache>,
        parent: Option<&'a Context<'a>>,
    ) -> Self {
        Self { app, scope, parent }
    }

    fn depth(&self) -> usize {
        self.parent.map_or(0, |p| p.depth + 1)
    }

    fn request<'k>(&'k self, service: &'k ServiceKey) -> Request<'k> {
        Request {
            service,
            parent: self.parent.map(|p| &p.binding.key),
            depth: self.depth(),
        }
    }

    fn bindings(&self, key: &ServiceKey) -> &'a [Arc<Binding>] {
        self.app
            .bindings
            .get(&key.type_id())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Bindings eligible for `key`; matching conditional bindings shadow
    /// unconditional ones.
    fn candidates(&self, key: &ServiceKey) -> Vec<&'a Arc<Binding>> {
        let request = self.request(key);
        let mut candidates = Vec::new();
        let mut conditional = false;
        for binding in self.bindings(key) {
            if binding.key.name() != key.name() || !binding.accepts(&request) {
                continue;
            }
            if binding.is_conditional() {
                if !conditional {
                    candidates.clear();
                    conditional = true;
                }
                candidates.push(binding);
            } else if !conditional {
                candidates.push(binding);
            }
        }
        candidates
    }

    pub(crate) fn can_resolve(&self, key: &ServiceKey) -> bool {
        self.candidates(key).len() == 1
    }

    pub(crate) fn resolve(
        &self,
        key: &ServiceKey,
        optional: bool,
    ) -> Result<Option<Instance>, ResolveError> {
        match self.candidates(key).as_slice() {
            [] if optional => Ok(None),
            [] => Err(ResolveError::NotBound(key.clone())),
            [binding] => self.activate(binding).map(Some),
            candidates => Err(ResolveError::Ambiguous {
                key: key.clone(),
                count: candidates.len(),
            }),
        }
    }

    /// Activates every binding of the type of `key` whatever its name, in
    /// registration order.
    pub(crate) fn resolve_all(
        &self,
        key: &ServiceKey,
        filter: &dyn Fn(&Metadata) -> bool,
    ) -> Result<Vec<Instance>, ResolveError> {
        let mut instances = Vec::new();
        for binding in self.bindings(key) {
            if !binding.accepts(&self.request(&binding.key)) || !filter(&binding.metadata) {
                continue;
            }
            instances.push(self.activate(binding)?);
        }
        Ok(instances)
    }

    fn activate(&self, binding: &Arc<Binding>) -> Result<Instance, ResolveError> {
        self.check_path(binding)?;
        let depth = self.depth();
        let max_depth = self.app.settings.max_depth;
        if depth > max_depth {
            return Err(ResolveError::DepthExceeded {
                key: binding.key.clone(),
                max_depth,
            });
        }
        // Root-owned instances never see the current scope.
        match binding.lifetime() {
            Lifetime::Transient => self.create(binding, self.scope),
            Lifetime::Singleton => self
                .app
                .instances
                .get_or_create(binding, None, || self.create(binding, None)),
            Lifetime::Thread => {
                let thread = thread::current().id();
                self.app.instances.get_or_create(binding, Some(thread), || {
                    let instance = self.create(binding, None)?;
                    // Instances created during thread teardown stay until the app drops.
                    let _ = THREAD_OWNERS.try_with(|owners| owners.register(&self.app.instances));
                    Ok(instance)
                })
            }
            Lifetime::Scoped => match (self.scope, self.app.settings.scoped_fallback) {
                (Some(scope), _) => {
                    scope.get_or_create(binding, None, || self.create(binding, Some(scope)))
                }
                (None, ScopedFallback::Transient) => self.create(binding, None),
                (None, ScopedFallback::Error) => {
                    Err(ResolveError::NoActiveScope(binding.key.clone()))
                }
            },
        }
    }

    fn check_path(&self, binding: &Binding) -> Result<(), ResolveError> {
        let mut path = Vec::new();
        let mut parent = self.parent;
        let mut found = false;
        while let Some(context) = parent {
            path.push(context.binding.key.clone());
            if context.binding.id == binding.id {
                found = true;
                break;
            }
            parent = context.parent;
        }
        if !found {
            return Ok(());
        }
        path.reverse();
        path.push(binding.key.clone());
        Err(ResolveError::Circular(path))
    }

    fn create(
        &self,
        binding: &Binding,
        scope: Option<&'a InstanceCache>,
    ) -> Result<Instance, ResolveError> {
        let context = Context {
            app: self.app,
            scope,
            parent: self.parent,
            binding,
            depth: self.depth(),
        };
        tracing::debug!(
            service = %binding.key,
            lifetime = ?binding.lifetime(),
            depth = context.depth,
            "Activating instance"
        );
        (binding.activator)(&context).map_err(|err| ResolveError::activation(&binding.key, err))
    }
}

type CacheKey = (usize, Option<ThreadId>);

/// Cache of activated instances for one lifetime owner (an app or a scope).
///
/// Every binding gets its own cell, so a factory runs at most once per owner
/// while factories of other bindings proceed in parallel.
#[doc(hidden)]
#[derive(Default)]
pub struct InstanceCache {
    instances: DashMap<CacheKey, Arc<OnceCell<Instance>>>,
    activated: Mutex<Vec<(CacheKey, Arc<Binding>, Instance)>>,
}

impl InstanceCache {
    /// Returns the cached instance of `binding`, creating it on first use.
    ///
    /// Concurrent callers wait for the first factory instead of running their
    /// own. A failed factory leaves the slot empty for the next caller.
    fn get_or_create<F>(
        &self,
        binding: &Arc<Binding>,
        thread: Option<ThreadId>,
        create: F,
    ) -> Result<Instance, ResolveError>
    where
        F: FnOnce() -> Result<Instance, ResolveError>,
    {
        let key = (binding.id, thread);
        let cell = self.instances.entry(key).or_default().clone();
        if let Some(instance) = cell.get() {
            tracing::trace!(service = %binding.key, "Reusing cached instance");
            return Ok(instance.clone());
        }
        cell.get_or_try_init(|| {
            let instance = create()?;
            self.activated
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((key, binding.clone(), instance.clone()));
            Ok(instance)
        })
        .cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.instances
            .iter()
            .filter(|cell| cell.get().is_some())
            .count()
    }

    /// Releases every cached instance, most recently activated first.
    pub(crate) fn deactivate(&self) {
        let activated = take(
            &mut *self
                .activated
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        if !activated.is_empty() {
            tracing::debug!(instances = activated.len(), "Deactivating instances");
        }
        for (_, binding, instance) in activated.into_iter().rev() {
            binding.deactivate(&instance);
        }
        self.instances.clear();
    }

    /// Releases the instances owned by `thread`, most recently activated first.
    fn release_thread(&self, thread: ThreadId) {
        let released: Vec<_> = {
            let mut activated = self
                .activated
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let (released, kept): (Vec<_>, Vec<_>) = take(&mut *activated)
                .into_iter()
                .partition(|((_, owner), _, _)| *owner == Some(thread));
            *activated = kept;
            released
        };
        if released.is_empty() {
            return;
        }
        tracing::debug!(
            instances = released.len(),
            thread = ?thread,
            "Deactivating per-thread instances"
        );
        for (key, binding, instance) in released.into_iter().rev() {
            self.instances.remove(&key);
            binding.deactivate(&instance);
        }
    }
}

/// App caches holding instances of the current thread, released when the
/// thread exits.
struct ThreadOwners {
    thread: ThreadId,
    caches: RefCell<Vec<Weak<InstanceCache>>>,
}

impl ThreadOwners {
    fn register(&self, cache: &Arc<InstanceCache>) {
        let mut caches = self.caches.borrow_mut();
        caches.retain(|v| v.strong_count() > 0);
        if !caches.iter().any(|v| ptr::eq(v.as_ptr(), Arc::as_ptr(cache))) {
            caches.push(Arc::downgrade(cache));
        }
    }
}

impl Drop for ThreadOwners {
    fn drop(&mut self) {
        for cache in self.caches.get_mut().drain(..) {
            if let Some(cache) = cache.upgrade() {
                cache.release_thread(self.thread);
            }
        }
    }
}

thread_local! {
    static THREAD_OWNERS: ThreadOwners = ThreadOwners {
        thread: thread::current().id(),
        caches: RefCell::new(Vec::new()),
    };
}

/// Resolution operations shared by [`App`], [`Scope`](crate::Scope) and
/// [`Context`].
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use bindery::{App, Bind, Resolver};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// let app = App::builder()
///     .add_binding(Bind::<u16>::to_constant(Arc::new(8080)).named("port"))
///     .add_binding(Bind::<String>::to_factory(|ctx| {
///         let port = ctx.get_named::<u16>("port")?;
///         Ok(Arc::new(format!("0.0.0.0:{port}")))
///     }))
///     .build()
///     .await?;
///
/// assert_eq!(app.get::<String>()?.as_str(), "0.0.0.0:8080");
/// assert!(app.try_get::<u32>()?.is_none());
/// # Ok(())
/// # }
/// ```
pub trait Resolver {
    #[doc(hidden)]
    fn origin(&self) -> Origin<'_>;

    /// Resolves the single unnamed binding of `T`.
    fn get<T>(&self) -> Result<Arc<T>, ResolveError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = ServiceKey::of::<T>();
        match self.origin().resolve(&key, false)? {
            Some(instance) => downcast(&key, instance),
            None => Err(ResolveError::NotBound(key)),
        }
    }

    /// Resolves the binding of `T` called `name`.
    fn get_named<T>(&self, name: &str) -> Result<Arc<T>, ResolveError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = ServiceKey::named::<T>(name.to_owned());
        match self.origin().resolve(&key, false)? {
            Some(instance) => downcast(&key, instance),
            None => Err(ResolveError::NotBound(key)),
        }
    }

    /// Like [`get`](Resolver::get), but returns `None` when nothing is bound.
    ///
    /// Failures of an existing binding are still reported.
    fn try_get<T>(&self) -> Result<Option<Arc<T>>, ResolveError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = ServiceKey::of::<T>();
        self.origin()
            .resolve(&key, true)?
            .map(|instance| downcast(&key, instance))
            .transpose()
    }

    /// Resolves every binding of `T`, named or not, in registration order.
    fn get_all<T>(&self) -> Result<Vec<Arc<T>>, ResolveError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_all_where::<T, _>(|_| true)
    }

    /// Resolves every binding of `T` whose metadata satisfies `filter`.
    fn get_all_where<T, F>(&self, filter: F) -> Result<Vec<Arc<T>>, ResolveError>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Metadata) -> bool,
    {
        let key = ServiceKey::of::<T>();
        self.origin()
            .resolve_all(&key, &filter)?
            .into_iter()
            .map(|instance| downcast(&key, instance))
            .collect()
    }

    /// Returns `true` if exactly one unnamed binding of `T` applies.
    fn can_resolve<T>(&self) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.origin().can_resolve(&ServiceKey::of::<T>())
    }
}

fn downcast<T>(key: &ServiceKey, instance: Instance) -> Result<Arc<T>, ResolveError>
where
    T: ?Sized + Send + Sync + 'static,
{
    instance
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| ResolveError::Activation {
            key: key.clone(),
            source: format!("instance is not an Arc<{}>", key.type_name()).into(),
        })
}

impl Resolver for App {
    fn origin(&self) -> Origin<'_> {
        Origin::new(self, None, None)
    }
}

impl Resolver for Context<'_> {
    fn origin(&self) -> Origin<'_> {
        Origin::new(self.app, self.scope, Some(self))
    }
}
