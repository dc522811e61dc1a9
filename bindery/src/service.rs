use std::marker::PhantomData;

use crate::{AppBuilder, Dependencies, Plugin, StdError};

/// A component built asynchronously, once, while the app is built.
///
/// Services cover initialization that must happen up front, such as opening
/// a pool or loading a file. Their handle is stored as a component, which
/// bindings can read through
/// [`Context::get_component`](crate::Context::get_component).
///
/// # Examples
///
/// ```rust
/// use bindery::{Service, AppBuilder, StdError, Dependencies, ServiceDependencyExt};
/// use std::sync::Arc;
///
/// struct Settings;
/// struct Pool {
///     settings: Arc<Settings>,
/// }
///
/// impl Service for Settings {
///     type Handle = Arc<Self>;
///
///     async fn build(_app: &AppBuilder) -> Result<Self::Handle, StdError> {
///         Ok(Arc::new(Self))
///     }
/// }
///
/// impl Service for Pool {
///     type Handle = Arc<Self>;
///
///     async fn build(app: &AppBuilder) -> Result<Self::Handle, StdError> {
///         let settings = app.get_component::<Arc<Settings>>()
///             .ok_or("Settings not found")?;
///         Ok(Arc::new(Self { settings }))
///     }
///
///     fn dependencies() -> Dependencies {
///         Dependencies::new().service::<Settings>()
///     }
/// }
/// ```
pub trait Service: Send + Sync {
    /// The component stored for this service, typically `Arc<Self>`.
    type Handle: Send + Sync + 'static;

    fn build(
        app: &AppBuilder,
    ) -> impl std::future::Future<Output = Result<Self::Handle, StdError>> + Send;

    /// Services and plugins that must be built before this service.
    fn dependencies() -> Dependencies {
        Dependencies::new()
    }
}

struct ServiceProvider<T>(PhantomData<T>)
where
    T: Service;

impl<T> Plugin for ServiceProvider<T>
where
    T: Service,
{
    async fn build(&self, app: &mut AppBuilder) -> Result<(), StdError> {
        app.add_component(T::build(app).await?);
        Ok(())
    }

    fn dependencies(&self) -> Dependencies {
        T::dependencies()
    }
}

/// Service registration methods for [`AppBuilder`].
pub trait AddServiceExt {
    fn add_service<T>(&mut self) -> &mut Self
    where
        T: Service + 'static;

    fn has_service<T>(&self) -> bool
    where
        T: Service + 'static;
}

impl AddServiceExt for AppBuilder {
    fn add_service<T>(&mut self) -> &mut Self
    where
        T: Service + 'static,
    {
        self.add_plugin(ServiceProvider::<T>(PhantomData));
        self
    }

    fn has_service<T>(&self) -> bool
    where
        T: Service + 'static,
    {
        self.has_plugin::<ServiceProvider<T>>()
    }
}

/// Service dependency declarations for [`Dependencies`].
pub trait ServiceDependencyExt {
    fn service<T>(self) -> Self
    where
        T: Service + 'static;
}

impl ServiceDependencyExt for Dependencies {
    fn service<T>(self) -> Self
    where
        T: Service + 'static,
    {
        self.plugin::<ServiceProvider<T>>()
    }
}
