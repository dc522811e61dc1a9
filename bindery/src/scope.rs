use crate::resolve::{InstanceCache, Origin};
use crate::{App, Resolver};

/// A unit of work owning its [`Lifetime::Scoped`](crate::Lifetime::Scoped)
/// instances.
///
/// Scoped bindings resolve to one instance per scope. Singleton and
/// per-thread bindings are shared with the app. Dropping the scope runs the
/// deactivation hooks of its instances, most recent first.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use bindery::{App, Bind, Resolver};
///
/// struct Connection(usize);
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// let opened = Arc::new(AtomicUsize::new(0));
/// let app = App::builder()
///     .add_binding(Bind::<Connection>::to_factory({
///         let opened = opened.clone();
///         move |_| Ok(Arc::new(Connection(opened.fetch_add(1, Ordering::SeqCst))))
///     }).scoped())
///     .build()
///     .await?;
///
/// let scope = app.scope();
/// let a = scope.get::<Connection>()?;
/// let b = scope.get::<Connection>()?;
/// assert!(Arc::ptr_eq(&a, &b));
/// assert_ne!(app.scope().get::<Connection>()?.0, a.0);
/// # Ok(())
/// # }
/// ```
pub struct Scope<'a> {
    app: &'a App,
    instances: InstanceCache,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(app: &'a App) -> Self {
        tracing::trace!("Scope opened");
        Self {
            app,
            instances: InstanceCache::default(),
        }
    }

    pub fn app(&self) -> &'a App {
        self.app
    }

    /// Number of instances cached by this scope.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Resolver for Scope<'_> {
    fn origin(&self) -> Origin<'_> {
        Origin::new(self.app, Some(&self.instances), None)
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        self.instances.deactivate();
        tracing::trace!("Scope closed");
    }
}
